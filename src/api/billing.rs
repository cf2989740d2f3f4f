//! Billing API endpoints
//!
//! Point-of-sale invoices: dealership staff ring up sales, customers view
//! their purchases, admins get oversight.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{ProductRepository, SaleRepository, SaleScope},
    middleware::AuthUser,
    models::{
        CreateSaleRequest, PaymentMethod, Role, Sale, SaleItem, SalePaymentStatus, SaleQuery,
        UpdateDeliveryStatusRequest, WalkInCustomer, WarrantyInfo,
    },
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

/// Create billing routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(create_sale))
        .route("/sales/dashboard", get(sales_dashboard))
        .route("/sales/{id}", get(get_sale))
        .route("/sales/{id}/delivery", patch(update_delivery_status))
        .route("/purchases", get(customer_purchases))
}

/// POST /api/v1/billing/sales
async fn create_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateSaleRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if !matches!(auth_user.role, Role::Dealer | Role::Employee) {
        return Err(AppError::Forbidden(
            "Only Dealers and Employees can create sales".to_string(),
        ));
    }
    payload.validate()?;

    let dealer_id = auth_user.dealership_id().ok_or_else(|| {
        AppError::BadRequest("No dealer associated with your account".to_string())
    })?;

    let auth_service = AuthService::new(state.db.clone());

    // Resolve customer details: a registered customer, or embedded walk-in
    // details from the request
    let mut customer_details = payload.customer.clone();
    if let Some(customer_id) = payload.customer_id {
        let customer = auth_service
            .get_user_by_id(customer_id)
            .await?
            .filter(|u| u.role == Role::Customer)
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
        customer_details.get_or_insert_with(|| WalkInCustomer {
            name: Some(customer.full_name()),
            phone: Some(customer.phone.clone()),
            email: Some(customer.email.clone()),
            address: customer.address.clone(),
        });
    }

    // Price the lines against the catalog; the warranty activated by the
    // sale follows the policy of the first (primary) line
    let product_repo = ProductRepository::new(&state.db);
    let mut items = Vec::with_capacity(payload.items.len());
    let mut subtotal = 0.0;
    let mut tax_amount = 0.0;
    let mut warranty_policy: Option<crate::models::WarrantyPolicy> = None;

    for line in &payload.items {
        let product = product_repo
            .get_by_id(line.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", line.product_id)))?;

        if !product.is_available {
            return Err(AppError::BadRequest(format!(
                "Product '{}' is not available",
                product.name
            )));
        }

        if warranty_policy.is_none() {
            warranty_policy = Some(product.warranty.clone());
        }

        let unit_price = product.base_price;
        let discounted = unit_price - line.discount;
        let line_subtotal = discounted * line.quantity as f64;
        let tax_rate = line.tax_rate.unwrap_or(product.tax_rate);
        let line_tax = line_subtotal * (tax_rate / 100.0);

        subtotal += line_subtotal;
        tax_amount += line_tax;

        items.push(SaleItem {
            product_id: product.id,
            product_name: product.name,
            quantity: line.quantity,
            unit_price,
            discount: line.discount,
            tax_rate,
            subtotal: line_subtotal + line_tax,
        });
    }

    let grand_total = subtotal + tax_amount - payload.discount;

    // EMI sales start partially paid; everything else is settled up front
    let payment_status = if payload.payment_method == PaymentMethod::Emi {
        SalePaymentStatus::Partial
    } else {
        SalePaymentStatus::Paid
    };

    let now = Utc::now();
    let warranty_months = warranty_policy
        .as_ref()
        .map(|p| p.warranty_period_months)
        .unwrap_or(state.config.sales.warranty_period_months);
    let free_services = warranty_policy
        .as_ref()
        .map(|p| p.free_services)
        .unwrap_or(state.config.sales.free_services);
    let warranty = WarrantyInfo {
        is_activated: true,
        activation_date: now,
        expiry_date: now + Duration::days(30 * warranty_months as i64),
        free_services_total: free_services,
        free_services_used: 0,
        free_services_remaining: free_services,
    };

    let sale = Sale {
        id: Uuid::new_v4(),
        invoice_number: Sale::generate_invoice_number(),
        dealer_id,
        employee_id: auth_user.id,
        customer_id: payload.customer_id,
        customer: customer_details,
        items,
        subtotal,
        discount: payload.discount,
        tax_amount,
        grand_total,
        payment_method: payload.payment_method,
        payment_status,
        payment_details: payload.payment_details,
        warranty,
        delivery_status: Default::default(),
        sale_date: now,
        created_at: now,
    };

    let repo = SaleRepository::new(&state.db);
    let sale = repo
        .create_sale(&sale, &auth_user.full_name)
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("Insufficient stock") || message.contains("not in inventory") {
                AppError::BadRequest(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "sale": sale }))))
}

/// GET /api/v1/billing/sales
async fn list_sales(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<SaleQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let scope = match auth_user.role {
        Role::Admin => SaleScope::All,
        Role::Dealer => SaleScope::Dealer(auth_user.id),
        Role::Employee => {
            // Employees see their own sales, or the dealership's on request
            if query.view_all == Some(true) {
                let dealership = auth_user.dealership_id().ok_or_else(|| {
                    AppError::BadRequest("No dealer associated with your account".to_string())
                })?;
                SaleScope::Dealer(dealership)
            } else {
                SaleScope::Employee(auth_user.id)
            }
        }
        Role::Customer => SaleScope::Customer(auth_user.id),
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    };

    let repo = SaleRepository::new(&state.db);
    let sales = repo.list(scope, &query).await?;

    Ok(Json(json!({ "count": sales.len(), "sales": sales })))
}

/// GET /api/v1/billing/sales/{id}
async fn get_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = SaleRepository::new(&state.db);
    let sale = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Dealer | Role::Employee
            if auth_user.dealership_id() == Some(sale.dealer_id) => {}
        Role::Dealer | Role::Employee => {
            return Err(AppError::Forbidden(
                "You can only view sales at your dealership".to_string(),
            ))
        }
        Role::Customer if sale.customer_id == Some(auth_user.id) => {}
        Role::Customer => {
            return Err(AppError::Forbidden(
                "You can only view your own purchases".to_string(),
            ))
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    Ok(Json(json!({ "sale": sale })))
}

/// PATCH /api/v1/billing/sales/{id}/delivery
async fn update_delivery_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if !matches!(auth_user.role, Role::Dealer | Role::Employee) {
        return Err(AppError::Forbidden(
            "Only Dealers and Employees can update delivery status".to_string(),
        ));
    }

    let repo = SaleRepository::new(&state.db);
    let sale = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale not found".to_string()))?;

    if auth_user.dealership_id() != Some(sale.dealer_id) {
        return Err(AppError::Forbidden(
            "You can only update sales at your dealership".to_string(),
        ));
    }

    let sale = repo
        .update_delivery_status(id, payload.delivery_status)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale not found".to_string()))?;

    Ok(Json(json!({
        "message": "Delivery status updated successfully",
        "sale": sale
    })))
}

/// GET /api/v1/billing/purchases
async fn customer_purchases(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Customer {
        return Err(AppError::Forbidden(
            "Only Customers can view purchases".to_string(),
        ));
    }

    let repo = SaleRepository::new(&state.db);
    let purchases = repo
        .list(SaleScope::Customer(auth_user.id), &SaleQuery::default())
        .await?;

    Ok(Json(json!({ "count": purchases.len(), "purchases": purchases })))
}

/// GET /api/v1/billing/sales/dashboard
async fn sales_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_filter = match auth_user.role {
        Role::Admin => None,
        Role::Dealer => Some(auth_user.id),
        _ => {
            return Err(AppError::Forbidden(
                "Only Admins and Dealers can view the sales dashboard".to_string(),
            ))
        }
    };

    let repo = SaleRepository::new(&state.db);
    let dashboard = repo.dashboard(dealer_filter).await?;

    Ok(Json(json!({ "dashboard": dashboard })))
}
