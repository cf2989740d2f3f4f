//! Notification model and types
//!
//! Notifications are broadcast documents: one row can address all users, a
//! set of roles, explicit user ids, or a dealership's staff. Read receipts
//! are appended per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// Notification type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Warning,
    Success,
    Alert,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Warning => "warning",
            NotificationType::Success => "success",
            NotificationType::Alert => "alert",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(NotificationType::Info),
            "warning" => Ok(NotificationType::Warning),
            "success" => Ok(NotificationType::Success),
            "alert" => Ok(NotificationType::Alert),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

/// Notification priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
        }
    }
}

impl std::str::FromStr for NotificationPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(NotificationPriority::Low),
            "medium" => Ok(NotificationPriority::Medium),
            "high" => Ok(NotificationPriority::High),
            _ => Err(format!("Invalid notification priority: {}", s)),
        }
    }
}

/// Recipient targeting mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    All,
    Role,
    SpecificUsers,
    DealerEmployees,
}

impl RecipientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientType::All => "all",
            RecipientType::Role => "role",
            RecipientType::SpecificUsers => "specific_users",
            RecipientType::DealerEmployees => "dealer_employees",
        }
    }
}

impl std::str::FromStr for RecipientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RecipientType::All),
            "role" => Ok(RecipientType::Role),
            "specific_users" => Ok(RecipientType::SpecificUsers),
            "dealer_employees" => Ok(RecipientType::DealerEmployees),
            _ => Err(format!("Invalid recipient type: {}", s)),
        }
    }
}

/// Per-user read receipt, JSON array on the notification row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadReceipt {
    pub user_id: Uuid,
    pub read_at: DateTime<Utc>,
}

/// Notification entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub sent_by: Uuid,
    pub sender_role: Option<Role>,
    pub recipient_type: RecipientType,
    pub recipient_roles: Vec<Role>,
    pub recipient_ids: Vec<Uuid>,
    /// Dealership whose staff are addressed (dealer_employees mode)
    pub dealer_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub read_by: Vec<ReadReceipt>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp < Utc::now())
    }

    /// Resolve the recipient predicate for a user
    pub fn is_recipient(&self, user_id: Uuid, role: Role, dealer_id: Option<Uuid>) -> bool {
        match self.recipient_type {
            RecipientType::All => true,
            RecipientType::Role => self.recipient_roles.contains(&role),
            RecipientType::SpecificUsers => self.recipient_ids.contains(&user_id),
            RecipientType::DealerEmployees => {
                self.dealer_id.is_some() && dealer_id == self.dealer_id
            }
        }
    }

    pub fn is_read_by(&self, user_id: Uuid) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }
}

/// Create notification request (admin/dealer)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    pub recipient_type: RecipientType,
    #[serde(default)]
    pub recipient_roles: Vec<Role>,
    #[serde(default)]
    pub recipient_ids: Vec<Uuid>,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub priority: NotificationPriority,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Notification list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
