//! Inventory API endpoints
//!
//! Dealers manage their stock, employees can view it, admins see all
//! dealerships.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::InventoryRepository,
    middleware::AuthUser,
    models::{AdjustInventoryRequest, InventoryQuery, Role},
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

/// Create inventory routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory))
        .route("/low-stock", get(low_stock_items))
        .route("/all", get(list_all_inventories))
        .route("/dealer/{dealer_id}", get(dealer_inventory_by_admin))
        .route("/{id}", get(get_inventory_item))
        .route("/{id}/adjust", patch(adjust_inventory))
        .route("/{id}/transactions", get(inventory_transactions))
}

/// Dealership whose inventory the caller may view
fn viewing_dealership(auth_user: &AuthUser) -> AppResult<Uuid> {
    match auth_user.role {
        Role::Dealer => Ok(auth_user.id),
        Role::Employee => auth_user.dealer_id.ok_or_else(|| {
            AppError::BadRequest("No dealer associated with your account".to_string())
        }),
        _ => Err(AppError::Forbidden(
            "Only Dealers and Employees can view inventory".to_string(),
        )),
    }
}

/// GET /api/v1/inventory
async fn list_inventory(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<InventoryQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_id = viewing_dealership(&auth_user)?;

    let repo = InventoryRepository::new(&state.db);
    let inventory = repo.list_for_dealer(dealer_id, &query).await?;

    Ok(Json(json!({ "count": inventory.len(), "inventory": inventory })))
}

/// GET /api/v1/inventory/low-stock
async fn low_stock_items(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_id = viewing_dealership(&auth_user)?;

    let repo = InventoryRepository::new(&state.db);
    let items = repo
        .list_for_dealer(
            dealer_id,
            &InventoryQuery {
                low_stock: Some(true),
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(json!({ "count": items.len(), "low_stock_items": items })))
}

/// GET /api/v1/inventory/{id}
async fn get_inventory_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = InventoryRepository::new(&state.db);
    let item = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Dealer | Role::Employee
            if auth_user.dealership_id() == Some(item.dealer_id) => {}
        Role::Dealer | Role::Employee => {
            return Err(AppError::Forbidden(
                "You can only view your own inventory".to_string(),
            ))
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    Ok(Json(json!({ "inventory": item })))
}

/// PATCH /api/v1/inventory/{id}/adjust
async fn adjust_inventory(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Dealer {
        return Err(AppError::Forbidden(
            "Only Dealers can adjust inventory".to_string(),
        ));
    }

    let repo = InventoryRepository::new(&state.db);
    let item = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item not found".to_string()))?;

    if item.dealer_id != auth_user.id {
        return Err(AppError::Forbidden(
            "You can only adjust your own inventory".to_string(),
        ));
    }

    let item = repo
        .adjust(&item, &payload, auth_user.id, &auth_user.full_name)
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("Insufficient stock") {
                AppError::BadRequest(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!({
        "message": "Inventory adjusted successfully",
        "inventory": item
    })))
}

/// GET /api/v1/inventory/{id}/transactions
async fn inventory_transactions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = InventoryRepository::new(&state.db);
    let item = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item not found".to_string()))?;

    match auth_user.role {
        Role::Admin => {}
        Role::Dealer | Role::Employee
            if auth_user.dealership_id() == Some(item.dealer_id) => {}
        Role::Dealer | Role::Employee => {
            return Err(AppError::Forbidden(
                "You can only view your own inventory transactions".to_string(),
            ))
        }
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    }

    let transactions = repo
        .transactions_for_item(item.dealer_id, item.product_id)
        .await?;

    Ok(Json(json!({
        "count": transactions.len(),
        "transactions": transactions
    })))
}

/// GET /api/v1/inventory/all
async fn list_all_inventories(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<InventoryQuery>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only Admins can view all inventories".to_string(),
        ));
    }

    let repo = InventoryRepository::new(&state.db);
    let inventories = repo.list_all(&query).await?;

    Ok(Json(json!({
        "count": inventories.len(),
        "inventories": inventories
    })))
}

/// GET /api/v1/inventory/dealer/{dealer_id}
async fn dealer_inventory_by_admin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(dealer_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only Admins can view dealer inventories".to_string(),
        ));
    }

    let auth_service = AuthService::new(state.db.clone());
    let dealer = auth_service
        .get_user_by_id(dealer_id)
        .await?
        .filter(|u| u.role == Role::Dealer)
        .ok_or_else(|| AppError::NotFound("Dealer not found".to_string()))?;

    let repo = InventoryRepository::new(&state.db);
    let inventories = repo
        .list_for_dealer(dealer_id, &InventoryQuery::default())
        .await?;

    Ok(Json(json!({
        "dealer": {
            "id": dealer.id,
            "name": dealer.full_name(),
            "dealership_name": dealer.dealership_name,
        },
        "count": inventories.len(),
        "inventories": inventories
    })))
}
