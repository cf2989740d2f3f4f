//! Business logic services

pub mod analytics;
pub mod auth;
pub mod notification;
pub mod scheduler;

pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use notification::{NotificationEvent, NotificationService};
pub use scheduler::{start_background_scheduler, SchedulerState};
