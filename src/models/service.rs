//! Service ticket and warranty tracking models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Service request status
///
/// pending -> assigned -> in_progress -> waiting_parts -> completed,
/// plus cancelled from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Pending,
    Assigned,
    InProgress,
    WaitingParts,
    Completed,
    Cancelled,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Pending => "pending",
            ServiceStatus::Assigned => "assigned",
            ServiceStatus::InProgress => "in_progress",
            ServiceStatus::WaitingParts => "waiting_parts",
            ServiceStatus::Completed => "completed",
            ServiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Completed | ServiceStatus::Cancelled)
    }
}

impl std::str::FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ServiceStatus::Pending),
            "assigned" => Ok(ServiceStatus::Assigned),
            "in_progress" => Ok(ServiceStatus::InProgress),
            "waiting_parts" => Ok(ServiceStatus::WaitingParts),
            "completed" => Ok(ServiceStatus::Completed),
            "cancelled" => Ok(ServiceStatus::Cancelled),
            _ => Err(format!("Invalid service status: {}", s)),
        }
    }
}

/// Issue type; keys into the product's service charge table for paid services
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Maintenance,
    Repair,
    Warranty,
    Inspection,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Maintenance => "maintenance",
            IssueType::Repair => "repair",
            IssueType::Warranty => "warranty",
            IssueType::Inspection => "inspection",
        }
    }
}

impl std::str::FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maintenance" => Ok(IssueType::Maintenance),
            "repair" => Ok(IssueType::Repair),
            "warranty" => Ok(IssueType::Warranty),
            "inspection" => Ok(IssueType::Inspection),
            _ => Err(format!("Invalid issue type: {}", s)),
        }
    }
}

/// Service priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServicePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl ServicePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServicePriority::Low => "low",
            ServicePriority::Medium => "medium",
            ServicePriority::High => "high",
            ServicePriority::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for ServicePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ServicePriority::Low),
            "medium" => Ok(ServicePriority::Medium),
            "high" => Ok(ServicePriority::High),
            "urgent" => Ok(ServicePriority::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Payment state of a service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServicePaymentStatus {
    #[default]
    Free,
    Pending,
    Paid,
}

impl ServicePaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServicePaymentStatus::Free => "free",
            ServicePaymentStatus::Pending => "pending",
            ServicePaymentStatus::Paid => "paid",
        }
    }
}

impl std::str::FromStr for ServicePaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(ServicePaymentStatus::Free),
            "pending" => Ok(ServicePaymentStatus::Pending),
            "paid" => Ok(ServicePaymentStatus::Paid),
            _ => Err(format!("Invalid service payment status: {}", s)),
        }
    }
}

/// Append-only status history entry, JSON array on the request row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: ServiceStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Part used during service, JSON array on the request row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartUsed {
    pub part_name: String,
    pub quantity: i64,
    pub cost: f64,
}

/// Customer snapshot embedded on the request
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceCustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Service request entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub request_number: String,
    pub customer_id: Uuid,
    pub customer: Option<ServiceCustomerInfo>,
    pub product_id: Uuid,
    pub invoice_id: Uuid,
    /// 1-based position in the warranty service sequence
    pub service_number: i64,
    pub is_free_service: bool,
    pub service_charge: f64,
    pub display_label: Option<String>,
    pub issue_type: IssueType,
    pub issue_description: Option<String>,
    pub priority: ServicePriority,
    pub dealer_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub assigned_date: Option<DateTime<Utc>>,
    pub status: ServiceStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub parts_used: Vec<PartUsed>,
    pub service_notes: Option<String>,
    pub service_time_minutes: i64,
    pub parts_cost: f64,
    pub total_cost: f64,
    pub payment_status: ServicePaymentStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn generate_request_number() -> String {
        super::order::reference_number("SRV")
    }
}

/// Warranty status on a tracker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarrantyStatus {
    #[default]
    Active,
    Expired,
    Completed,
}

impl WarrantyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantyStatus::Active => "active",
            WarrantyStatus::Expired => "expired",
            WarrantyStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for WarrantyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WarrantyStatus::Active),
            "expired" => Ok(WarrantyStatus::Expired),
            "completed" => Ok(WarrantyStatus::Completed),
            _ => Err(format!("Invalid warranty status: {}", s)),
        }
    }
}

/// Free-service counters per invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarrantyTracker {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub total_free_services: i64,
    pub services_completed: i64,
    pub services_remaining: i64,
    pub service_request_ids: Vec<Uuid>,
    pub warranty_status: WarrantyStatus,
    pub warranty_expiry_date: Option<DateTime<Utc>>,
    /// Set once the expiry reminder notification has gone out
    pub expiry_reminder_sent: bool,
    pub activated_at: DateTime<Utc>,
    pub last_service_date: Option<DateTime<Utc>>,
}

/// Book a service request (customer)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequestRequest {
    pub invoice_id: Uuid,
    pub issue_type: IssueType,
    #[validate(length(min = 1))]
    pub issue_description: String,
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Assign a serviceman (dealer)
#[derive(Debug, Clone, Deserialize)]
pub struct AssignServiceRequest {
    pub serviceman_id: Uuid,
}

/// Advance service status (assigned serviceman)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateServiceStatusRequest {
    pub status: ServiceStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub parts_used: Vec<PartUsed>,
    #[serde(default)]
    pub service_time_minutes: i64,
}

/// Service list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ServiceStatus::Pending,
            ServiceStatus::Assigned,
            ServiceStatus::InProgress,
            ServiceStatus::WaitingParts,
            ServiceStatus::Completed,
            ServiceStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ServiceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(ServiceStatus::Completed.is_terminal());
        assert!(ServiceStatus::Cancelled.is_terminal());
        assert!(!ServiceStatus::Pending.is_terminal());
        assert!(!ServiceStatus::WaitingParts.is_terminal());
    }

    #[test]
    fn test_status_history_json_round_trip() {
        let history = vec![StatusHistoryEntry {
            status: ServiceStatus::Assigned,
            timestamp: Utc::now(),
            updated_by: Some(Uuid::new_v4()),
            notes: Some("Assigned to Ravi".to_string()),
        }];

        let json = serde_json::to_string(&history).unwrap();
        let parsed: Vec<StatusHistoryEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, history);
    }
}
