//! Analytics API endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::{
    middleware::AuthUser,
    models::{Role, SalesAnalyticsQuery},
    services::AnalyticsService,
    utils::{AppError, AppResult},
    AppState,
};

/// Create analytics routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/dealer/dashboard", get(dealer_dashboard))
        .route("/sales", get(sales_analytics))
        .route("/inventory", get(inventory_analytics))
}

/// GET /api/v1/analytics/admin/dashboard
async fn admin_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let service = AnalyticsService::new(state.db.clone());
    let dashboard = service.admin_dashboard().await?;

    Ok(Json(json!({ "dashboard": dashboard })))
}

/// GET /api/v1/analytics/dealer/dashboard
async fn dealer_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Dealer {
        return Err(AppError::Forbidden("Dealer access required".to_string()));
    }

    let service = AnalyticsService::new(state.db.clone());
    let dashboard = service.dealer_dashboard(auth_user.id).await?;

    Ok(Json(json!({ "dashboard": dashboard })))
}

/// GET /api/v1/analytics/sales
///
/// Admins may filter to a single dealer; dealers always see their own.
async fn sales_analytics(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<SalesAnalyticsQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_filter = match auth_user.role {
        Role::Admin => query.dealer_id,
        Role::Dealer => Some(auth_user.id),
        _ => return Err(AppError::Forbidden("Access denied".to_string())),
    };

    let service = AnalyticsService::new(state.db.clone());
    let analytics = service.sales_analytics(dealer_filter, &query).await?;

    Ok(Json(json!({ "analytics": analytics })))
}

/// GET /api/v1/analytics/inventory
async fn inventory_analytics(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Dealer {
        return Err(AppError::Forbidden("Dealer access required".to_string()));
    }

    let service = AnalyticsService::new(state.db.clone());
    let analytics = service.inventory_analytics(auth_user.id).await?;

    Ok(Json(json!({ "analytics": analytics })))
}
