//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{routing::get, Router};

use crate::AppState;

mod analytics;
mod attendance;
mod auth;
mod billing;
mod health;
mod inventory;
mod notifications;
mod orders;
mod products;
mod service;
mod users;

pub use health::*;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Authentication endpoints (no auth required)
        .nest("/auth", auth::public_routes())
        // Catalog browsing is public
        .nest("/products", products::public_routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Protected auth endpoints (me, change-password, profile)
        .nest("/auth", auth::protected_routes())
        // Account management (role-gated registration chain)
        .nest("/users", users::routes())
        // Catalog administration
        .nest("/products", products::routes())
        // Orders (dealer restocking and customer purchases)
        .nest("/orders", orders::routes())
        // Billing / invoices
        .nest("/billing", billing::routes())
        // Dealer inventory
        .nest("/inventory", inventory::routes())
        // Service tickets and warranty tracking
        .nest("/service", service::routes())
        // Staff attendance
        .nest("/attendance", attendance::routes())
        // Notifications
        .nest("/notifications", notifications::routes())
        // Analytics rollups
        .nest("/analytics", analytics::routes())
}

/// Create the full API router (public + protected; useful for tests)
pub fn routes() -> Router<AppState> {
    public_routes().merge(protected_routes())
}
