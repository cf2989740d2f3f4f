//! Product catalog API endpoints
//!
//! Browsing is public; catalog administration is admin-only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::ProductRepository,
    middleware::AuthUser,
    models::{CreateProductRequest, ProductQuery, Role, UpdateProductRequest},
    utils::validation::validate_slug,
    utils::{AppError, AppResult},
    AppState,
};

/// Public catalog routes
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
        .route("/slug/{slug}", get(get_product_by_slug))
}

/// Protected catalog administration routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/{id}", axum::routing::put(update_product).delete(delete_product))
        .route("/stock-overview", get(stock_overview))
        .route("/{id}/stock-movements", get(stock_movements))
}

fn require_admin(auth_user: &AuthUser, action: &str) -> AppResult<()> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden(format!("Only admins can {}", action)));
    }
    Ok(())
}

/// GET /api/v1/products
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = ProductRepository::new(&state.db);
    let products = repo.list(&query).await?;

    Ok(Json(json!({ "count": products.len(), "products": products })))
}

/// GET /api/v1/products/{id}
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = ProductRepository::new(&state.db);
    let product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({ "product": product })))
}

/// GET /api/v1/products/slug/{slug}
async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = ProductRepository::new(&state.db);
    let product = repo
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({ "product": product })))
}

/// POST /api/v1/products
async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    require_admin(&auth_user, "create products")?;
    payload.validate()?;

    if !validate_slug(&payload.slug) {
        return Err(AppError::ValidationError(
            "Slug must be lowercase alphanumeric with hyphens".to_string(),
        ));
    }

    let repo = ProductRepository::new(&state.db);
    if repo.slug_exists(&payload.slug).await? {
        return Err(AppError::Conflict("Slug already in use".to_string()));
    }

    let product = repo.create(&payload, auth_user.id).await?;

    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

/// PUT /api/v1/products/{id}
async fn update_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&auth_user, "update products")?;

    let repo = ProductRepository::new(&state.db);
    let product = repo
        .update(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({ "product": product })))
}

/// DELETE /api/v1/products/{id}
async fn delete_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&auth_user, "delete products")?;

    let repo = ProductRepository::new(&state.db);
    if !repo.delete(id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    Ok(Json(json!({ "success": true, "message": "Product deleted" })))
}

/// GET /api/v1/products/stock-overview
async fn stock_overview(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&auth_user, "view stock overview")?;

    let repo = ProductRepository::new(&state.db);
    let overview = repo.stock_overview().await?;

    Ok(Json(json!({ "overview": overview })))
}

/// GET /api/v1/products/{id}/stock-movements
async fn stock_movements(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&auth_user, "view stock movements")?;

    let repo = ProductRepository::new(&state.db);
    if repo.get_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let movements = repo.stock_movements(id).await?;

    Ok(Json(json!({
        "count": movements.len(),
        "movements": movements
    })))
}
