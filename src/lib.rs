//! VoltRide ERP Library
//!
//! Core functionality for the VoltRide dealership ERP backend: role-gated
//! APIs over products, orders, billing, inventory, service tickets,
//! attendance, notifications and analytics.

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, AuthUser, Claims};

use services::NotificationService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Notification service (DB access plus live fan-out)
    pub notifications: NotificationService,
}
