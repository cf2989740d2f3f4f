//! Service ticket API endpoints
//!
//! Customers book services against their invoices, dealers assign them to
//! servicemen, servicemen work them to completion.

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
    db::{ProductRepository, SaleRepository, ServiceRepository, ServiceScope},
    middleware::AuthUser,
    models::{
        AssignServiceRequest, CreateServiceRequestRequest, IssueType, Role, ServiceCustomerInfo,
        ServicePaymentStatus, ServicePriority, ServiceQuery, ServiceRequest, ServiceStatus,
        StatusHistoryEntry, UpdateServiceStatusRequest,
    },
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

/// Create service routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_service_requests).post(create_service_request))
        .route("/requests/{id}", get(get_service_request))
        .route("/requests/{id}/assign", post(assign_service))
        .route("/requests/{id}/status", patch(update_service_status))
        .route("/warranty/{invoice_id}", get(warranty_status))
}

/// POST /api/v1/service/requests
///
/// Books a service against one of the customer's own invoices. The service
/// number is derived from the warranty tracker; within the free allowance
/// the service is free, after it the charge comes from the product's
/// service-charge table.
async fn create_service_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateServiceRequestRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if auth_user.role != Role::Customer {
        return Err(AppError::Forbidden(
            "Only Customers can book services".to_string(),
        ));
    }
    payload.validate()?;

    let sale_repo = SaleRepository::new(&state.db);
    let sale = sale_repo
        .get_by_id(payload.invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;

    if sale.customer_id != Some(auth_user.id) {
        return Err(AppError::Forbidden(
            "You can only book services for your own purchases".to_string(),
        ));
    }

    let product_id = sale
        .items
        .first()
        .map(|item| item.product_id)
        .ok_or_else(|| AppError::BadRequest("Invoice has no items".to_string()))?;

    let service_repo = ServiceRepository::new(&state.db);
    let tracker = service_repo
        .get_or_create_tracker(
            sale.id,
            auth_user.id,
            product_id,
            sale.warranty.free_services_total as i64,
            Some(sale.warranty.expiry_date),
        )
        .await?;

    let service_number = tracker.services_completed + 1;
    let is_free_service = service_number <= tracker.total_free_services;

    let product_repo = ProductRepository::new(&state.db);
    let product = product_repo
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let (service_charge, display_label, payment_status) = if is_free_service {
        (
            0.0,
            format!("Service {} - Free", service_number),
            ServicePaymentStatus::Free,
        )
    } else {
        let charge = match payload.issue_type {
            IssueType::Repair => product.service_charges.repair,
            IssueType::Inspection => product.service_charges.inspection,
            _ => product.service_charges.standard_service,
        };
        (
            charge,
            format!("Service {} - \u{20B9}{:.0}", service_number, charge),
            ServicePaymentStatus::Pending,
        )
    };

    let auth_service = AuthService::new(state.db.clone());
    let customer = auth_service
        .get_user_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer account not found".to_string()))?;

    let now = Utc::now();
    let request = ServiceRequest {
        id: Uuid::new_v4(),
        request_number: ServiceRequest::generate_request_number(),
        customer_id: auth_user.id,
        customer: Some(ServiceCustomerInfo {
            name: Some(customer.full_name()),
            phone: Some(customer.phone.clone()),
            email: Some(customer.email.clone()),
            address: customer.address.clone(),
        }),
        product_id,
        invoice_id: sale.id,
        service_number,
        is_free_service,
        service_charge,
        display_label: Some(display_label),
        issue_type: payload.issue_type,
        issue_description: Some(payload.issue_description),
        priority: ServicePriority::Medium,
        dealer_id: sale.dealer_id,
        assigned_to: None,
        assigned_date: None,
        status: ServiceStatus::Pending,
        status_history: vec![StatusHistoryEntry {
            status: ServiceStatus::Pending,
            timestamp: now,
            updated_by: None,
            notes: Some("Service request created by customer".to_string()),
        }],
        parts_used: vec![],
        service_notes: None,
        service_time_minutes: 0,
        parts_cost: 0.0,
        total_cost: service_charge,
        payment_status,
        scheduled_date: payload.scheduled_date,
        started_at: None,
        completed_at: None,
        rating: None,
        feedback: None,
        created_at: now,
        updated_at: now,
    };

    let request = service_repo.insert_request(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "service_request": request })),
    ))
}

/// GET /api/v1/service/requests
async fn list_service_requests(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ServiceQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let scope = match auth_user.role {
        Role::Admin => ServiceScope::All,
        Role::Dealer => ServiceScope::Dealer(auth_user.id),
        Role::Serviceman => ServiceScope::Serviceman(auth_user.id),
        Role::Customer => ServiceScope::Customer(auth_user.id),
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    };

    let repo = ServiceRepository::new(&state.db);
    let requests = repo.list(scope, &query).await?;

    Ok(Json(json!({
        "count": requests.len(),
        "service_requests": requests
    })))
}

/// GET /api/v1/service/requests/{id}
async fn get_service_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = ServiceRepository::new(&state.db);
    let request = repo
        .get_request(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Service request not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Dealer if request.dealer_id == auth_user.id => {}
        Role::Dealer => {
            return Err(AppError::Forbidden(
                "You can only view services at your dealership".to_string(),
            ))
        }
        Role::Serviceman if request.assigned_to == Some(auth_user.id) => {}
        Role::Serviceman => {
            return Err(AppError::Forbidden(
                "You can only view services assigned to you".to_string(),
            ))
        }
        Role::Customer if request.customer_id == auth_user.id => {}
        Role::Customer => {
            return Err(AppError::Forbidden(
                "You can only view your own service requests".to_string(),
            ))
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    Ok(Json(json!({ "service_request": request })))
}

/// POST /api/v1/service/requests/{id}/assign
async fn assign_service(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignServiceRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Dealer {
        return Err(AppError::Forbidden(
            "Only Dealers can assign services".to_string(),
        ));
    }

    let repo = ServiceRepository::new(&state.db);
    let request = repo
        .get_request(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Service request not found".to_string()))?;

    if request.dealer_id != auth_user.id {
        return Err(AppError::Forbidden(
            "You can only assign services at your dealership".to_string(),
        ));
    }
    if request.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Cannot assign a {} service",
            request.status.as_str()
        )));
    }

    let auth_service = AuthService::new(state.db.clone());
    let serviceman = auth_service
        .get_user_by_id(payload.serviceman_id)
        .await?
        .filter(|u| u.role == Role::Serviceman)
        .ok_or_else(|| AppError::NotFound("Serviceman not found".to_string()))?;

    if serviceman.dealer_id != Some(auth_user.id) {
        return Err(AppError::BadRequest(
            "Serviceman does not belong to your dealership".to_string(),
        ));
    }

    let request = repo
        .assign(&request, serviceman.id, &serviceman.full_name(), auth_user.id)
        .await?;

    Ok(Json(json!({
        "message": "Service assigned successfully",
        "service_request": request
    })))
}

/// PATCH /api/v1/service/requests/{id}/status
async fn update_service_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServiceStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Serviceman {
        return Err(AppError::Forbidden(
            "Only Servicemen can update service status".to_string(),
        ));
    }

    let repo = ServiceRepository::new(&state.db);
    let request = repo
        .get_request(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Service request not found".to_string()))?;

    if request.assigned_to != Some(auth_user.id) {
        return Err(AppError::Forbidden(
            "You can only update services assigned to you".to_string(),
        ));
    }
    if request.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Service is already {}",
            request.status.as_str()
        )));
    }

    let request = repo.update_status(&request, &payload, auth_user.id).await?;

    Ok(Json(json!({
        "message": "Service status updated successfully",
        "service_request": request
    })))
}

/// GET /api/v1/service/warranty/{invoice_id}
async fn warranty_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = ServiceRepository::new(&state.db);
    let tracker = repo
        .get_tracker_by_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Warranty tracker not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Customer if tracker.customer_id == auth_user.id => {}
        Role::Customer => {
            return Err(AppError::Forbidden(
                "You can only view your own warranty information".to_string(),
            ))
        }
        Role::Dealer | Role::Employee | Role::Serviceman => {}
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    Ok(Json(json!({ "warranty": tracker })))
}
