//! Data models

mod analytics;
mod attendance;
mod inventory;
mod notification;
mod order;
mod product;
mod sale;
mod service;
mod user;

pub use analytics::*;
pub use attendance::*;
pub use inventory::*;
pub use notification::*;
pub use order::*;
pub use product::*;
pub use sale::*;
pub use service::*;
pub use user::*;
