//! Order API endpoints
//!
//! Dealer orders: dealer restocking from the distributor, admin-approved.
//! Customer orders: direct purchase from a dealership.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{OrderRepository, OrderScope, ProductRepository},
    middleware::AuthUser,
    models::{
        ApproveOrderRequest, CreateCustomerOrderRequest, CreateDealerOrderRequest, CustomerOrder,
        CustomerOrderStatus, DealerOrder, DealerOrderStatus, OrderItem, OrderItemRequest,
        OrderQuery, PaymentProgress, RecordPaymentRequest, RejectOrderRequest, Role,
        ShipOrderRequest, UpdateOrderStatusRequest,
    },
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

/// Create order routes
pub fn routes() -> Router<AppState> {
    Router::new()
        // Dealer orders
        .route("/dealer", get(list_dealer_orders).post(create_dealer_order))
        .route("/dealer/{id}", get(get_dealer_order))
        .route("/dealer/{id}/approve", post(approve_dealer_order))
        .route("/dealer/{id}/reject", post(reject_dealer_order))
        .route("/dealer/{id}/ship", post(ship_dealer_order))
        .route("/dealer/{id}/deliver", post(deliver_dealer_order))
        // Customer orders
        .route(
            "/customer",
            get(list_customer_orders).post(create_customer_order),
        )
        .route("/customer/{id}", get(get_customer_order))
        .route("/customer/{id}/status", patch(update_customer_order_status))
        .route("/customer/{id}/payment", patch(record_customer_order_payment))
}

/// Price the requested lines against the catalog. `dealer_pricing` selects
/// the wholesale price; availability is always checked, master stock only
/// for dealer orders.
async fn build_order_items(
    state: &AppState,
    items: &[OrderItemRequest],
    dealer_pricing: bool,
) -> AppResult<(Vec<OrderItem>, f64)> {
    let repo = ProductRepository::new(&state.db);
    let mut order_items = Vec::with_capacity(items.len());
    let mut total_amount = 0.0;

    for item in items {
        let product = repo
            .get_by_id(item.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", item.product_id)))?;

        if !product.is_available {
            return Err(AppError::BadRequest(format!(
                "Product '{}' is not available",
                product.name
            )));
        }

        if dealer_pricing && product.total_stock < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for '{}'. Available: {}",
                product.name, product.total_stock
            )));
        }

        let unit_price = if dealer_pricing {
            product.dealer_price
        } else {
            product.base_price
        };
        let subtotal = unit_price * item.quantity as f64;
        total_amount += subtotal;

        order_items.push(OrderItem {
            product_id: product.id,
            product_name: product.name,
            product_model: Some(product.model),
            quantity: item.quantity,
            unit_price,
            subtotal,
        });
    }

    Ok((order_items, total_amount))
}

// ---- Dealer orders -----------------------------------------------------

/// POST /api/v1/orders/dealer
async fn create_dealer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateDealerOrderRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if auth_user.role != Role::Dealer {
        return Err(AppError::Forbidden(
            "Only Dealers can order products from the distributor".to_string(),
        ));
    }
    payload.validate()?;

    let auth_service = AuthService::new(state.db.clone());
    let dealer = auth_service
        .get_user_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Dealer account not found".to_string()))?;

    let (items, total_amount) = build_order_items(&state, &payload.items, true).await?;
    let tax_amount = total_amount * (state.config.sales.tax_rate_percent / 100.0);

    let shipping_address = payload.shipping_address.clone().or_else(|| {
        dealer.address.as_ref().map(|address| {
            format!(
                "{}, {}, {} - {}",
                address,
                dealer.city.as_deref().unwrap_or(""),
                dealer.state.as_deref().unwrap_or(""),
                dealer.pincode.as_deref().unwrap_or("")
            )
        })
    });

    let now = Utc::now();
    let order = DealerOrder {
        id: Uuid::new_v4(),
        order_number: DealerOrder::generate_order_number(),
        dealer_id: dealer.id,
        dealer_name: dealer.display_name(),
        dealer_email: Some(dealer.email.clone()),
        dealer_phone: Some(dealer.phone.clone()),
        items,
        total_amount,
        tax_amount,
        grand_total: total_amount + tax_amount,
        status: DealerOrderStatus::Pending,
        approved_by: None,
        approved_by_name: None,
        approval_date: None,
        rejection_reason: None,
        expected_delivery: None,
        actual_delivery: None,
        tracking_number: None,
        shipping_address,
        dealer_notes: payload.dealer_notes,
        admin_notes: None,
        created_at: now,
        updated_at: now,
    };

    let repo = OrderRepository::new(&state.db);
    let order = repo.insert_dealer_order(&order).await?;

    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

/// GET /api/v1/orders/dealer
async fn list_dealer_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_filter = match auth_user.role {
        Role::Admin => None,
        Role::Dealer => Some(auth_user.id),
        _ => {
            return Err(AppError::Forbidden(
                "Only Admins and Dealers can view dealer orders".to_string(),
            ))
        }
    };

    let repo = OrderRepository::new(&state.db);
    let orders = repo.list_dealer_orders(dealer_filter, &query).await?;

    Ok(Json(json!({ "count": orders.len(), "orders": orders })))
}

/// GET /api/v1/orders/dealer/{id}
async fn get_dealer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = OrderRepository::new(&state.db);
    let order = repo
        .get_dealer_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Dealer if order.dealer_id == auth_user.id => {}
        Role::Dealer => {
            return Err(AppError::Forbidden(
                "You can only view your own orders".to_string(),
            ))
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    Ok(Json(json!({ "order": order })))
}

/// POST /api/v1/orders/dealer/{id}/approve
async fn approve_dealer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveOrderRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only Admins can approve dealer orders".to_string(),
        ));
    }

    let repo = OrderRepository::new(&state.db);
    let order = repo
        .get_dealer_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.status != DealerOrderStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Order is already {}",
            order.status.as_str()
        )));
    }

    let order = repo
        .approve_dealer_order(
            &order,
            auth_user.id,
            &auth_user.full_name,
            payload.admin_notes.as_deref(),
            state.config.sales.dealer_order_lead_days,
        )
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("Insufficient stock") || message.contains("no longer pending") {
                AppError::Conflict(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!({
        "message": "Dealer order approved successfully",
        "order": order
    })))
}

/// POST /api/v1/orders/dealer/{id}/reject
async fn reject_dealer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectOrderRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only Admins can reject dealer orders".to_string(),
        ));
    }
    if payload.rejection_reason.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Rejection reason is required".to_string(),
        ));
    }

    let repo = OrderRepository::new(&state.db);
    let order = repo
        .get_dealer_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if !repo
        .reject_dealer_order(id, &payload.rejection_reason, payload.admin_notes.as_deref())
        .await?
    {
        return Err(AppError::BadRequest(format!(
            "Order is already {}",
            order.status.as_str()
        )));
    }

    let order = repo.get_dealer_order(id).await?;
    Ok(Json(json!({ "message": "Dealer order rejected", "order": order })))
}

/// POST /api/v1/orders/dealer/{id}/ship
async fn ship_dealer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipOrderRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only Admins can mark orders as shipped".to_string(),
        ));
    }

    let repo = OrderRepository::new(&state.db);
    if !repo
        .mark_dealer_order_shipped(id, payload.tracking_number.as_deref())
        .await?
    {
        return Err(AppError::BadRequest(
            "Only approved orders can be marked as shipped".to_string(),
        ));
    }

    let order = repo.get_dealer_order(id).await?;
    Ok(Json(json!({ "message": "Order marked as shipped", "order": order })))
}

/// POST /api/v1/orders/dealer/{id}/deliver
async fn deliver_dealer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only Admins can mark orders as delivered".to_string(),
        ));
    }

    let repo = OrderRepository::new(&state.db);
    if !repo.mark_dealer_order_delivered(id).await? {
        return Err(AppError::BadRequest(
            "Only shipped orders can be marked as delivered".to_string(),
        ));
    }

    let order = repo.get_dealer_order(id).await?;
    Ok(Json(json!({ "message": "Order marked as delivered", "order": order })))
}

// ---- Customer orders ---------------------------------------------------

/// POST /api/v1/orders/customer
async fn create_customer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCustomerOrderRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if auth_user.role != Role::Customer {
        return Err(AppError::Forbidden(
            "Only Customers can place orders".to_string(),
        ));
    }
    payload.validate()?;

    let auth_service = AuthService::new(state.db.clone());
    let dealer = auth_service
        .get_user_by_id(payload.dealer_id)
        .await?
        .filter(|u| u.role == Role::Dealer)
        .ok_or_else(|| AppError::NotFound("Dealer not found".to_string()))?;

    let customer = auth_service
        .get_user_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer account not found".to_string()))?;

    let (items, total_amount) = build_order_items(&state, &payload.items, false).await?;
    let tax_amount = total_amount * (state.config.sales.tax_rate_percent / 100.0);
    let grand_total = total_amount + tax_amount - payload.discount_amount;
    let amount_paid = payload.amount_paid.max(0.0);

    let now = Utc::now();
    let order = CustomerOrder {
        id: Uuid::new_v4(),
        order_number: CustomerOrder::generate_order_number(),
        customer_id: customer.id,
        customer_name: customer.full_name(),
        customer_email: Some(customer.email.clone()),
        customer_phone: customer.phone.clone(),
        dealer_id: dealer.id,
        dealer_name: dealer.full_name(),
        dealership_name: dealer.dealership_name.clone(),
        items,
        total_amount,
        tax_amount,
        discount_amount: payload.discount_amount,
        grand_total,
        payment_status: PaymentProgress::derive(amount_paid, grand_total),
        amount_paid,
        amount_remaining: grand_total - amount_paid,
        status: CustomerOrderStatus::Pending,
        delivery_address: payload.delivery_address,
        delivery_city: payload.delivery_city,
        delivery_state: payload.delivery_state,
        delivery_pincode: payload.delivery_pincode,
        delivery_date: None,
        is_home_delivery: payload.is_home_delivery,
        customer_notes: payload.customer_notes,
        dealer_notes: None,
        cancellation_reason: None,
        processed_by: None,
        processed_by_name: None,
        created_at: now,
        updated_at: now,
    };

    let repo = OrderRepository::new(&state.db);
    let order = repo.insert_customer_order(&order).await?;

    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

/// GET /api/v1/orders/customer
async fn list_customer_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let scope = match auth_user.role {
        Role::Admin => OrderScope::All,
        Role::Customer => OrderScope::Customer(auth_user.id),
        Role::Dealer | Role::Employee => {
            let dealership = auth_user.dealership_id().ok_or_else(|| {
                AppError::BadRequest("No dealer associated with your account".to_string())
            })?;
            OrderScope::Dealer(dealership)
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    };

    let repo = OrderRepository::new(&state.db);
    let orders = repo.list_customer_orders(scope, &query).await?;

    Ok(Json(json!({ "count": orders.len(), "orders": orders })))
}

/// GET /api/v1/orders/customer/{id}
async fn get_customer_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = OrderRepository::new(&state.db);
    let order = repo
        .get_customer_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Customer if order.customer_id == auth_user.id => {}
        Role::Customer => {
            return Err(AppError::Forbidden(
                "You can only view your own orders".to_string(),
            ))
        }
        Role::Dealer | Role::Employee
            if auth_user.dealership_id() == Some(order.dealer_id) => {}
        Role::Dealer | Role::Employee => {
            return Err(AppError::Forbidden(
                "You can only view orders from your dealership".to_string(),
            ))
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    Ok(Json(json!({ "order": order })))
}

/// Verify the caller is dealership staff over the given order
fn require_dealership_staff(auth_user: &AuthUser, order: &CustomerOrder) -> AppResult<()> {
    if !matches!(auth_user.role, Role::Dealer | Role::Employee) {
        return Err(AppError::Forbidden(
            "Only Dealers and Employees can update orders".to_string(),
        ));
    }
    if auth_user.dealership_id() != Some(order.dealer_id) {
        return Err(AppError::Forbidden(
            "You can only update orders from your dealership".to_string(),
        ));
    }
    Ok(())
}

/// PATCH /api/v1/orders/customer/{id}/status
async fn update_customer_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = OrderRepository::new(&state.db);
    let order = repo
        .get_customer_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    require_dealership_staff(&auth_user, &order)?;

    if payload.status == CustomerOrderStatus::Cancelled
        && payload.cancellation_reason.as_deref().unwrap_or("").is_empty()
    {
        return Err(AppError::BadRequest(
            "Cancellation reason is required".to_string(),
        ));
    }

    let order = repo
        .update_customer_order_status(
            id,
            payload.status,
            payload.dealer_notes.as_deref(),
            payload.cancellation_reason.as_deref(),
            auth_user.id,
            &auth_user.full_name,
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(Json(json!({
        "message": "Order status updated successfully",
        "order": order
    })))
}

/// PATCH /api/v1/orders/customer/{id}/payment
async fn record_customer_order_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = OrderRepository::new(&state.db);
    let order = repo
        .get_customer_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    require_dealership_staff(&auth_user, &order)?;

    if payload.additional_payment <= 0.0 {
        return Err(AppError::BadRequest(
            "additional_payment must be positive".to_string(),
        ));
    }

    let order = repo
        .record_customer_order_payment(id, payload.additional_payment)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(Json(json!({
        "message": "Payment updated successfully",
        "order": order
    })))
}
