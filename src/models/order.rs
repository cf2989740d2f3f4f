//! Order models: dealer restock orders and customer orders

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Human-facing reference number: prefix, date and six random digits
pub(crate) fn reference_number(prefix: &str) -> String {
    let date_part = Utc::now().format("%Y%m%d");
    let random_part: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}-{}-{:06}", prefix, date_part, random_part)
}

/// Denormalized order line, stored as a JSON array on the order row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_model: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Dealer order status
///
/// pending -> approved -> shipped -> delivered, or pending -> rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealerOrderStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Shipped,
    Delivered,
}

impl DealerOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealerOrderStatus::Pending => "pending",
            DealerOrderStatus::Approved => "approved",
            DealerOrderStatus::Rejected => "rejected",
            DealerOrderStatus::Shipped => "shipped",
            DealerOrderStatus::Delivered => "delivered",
        }
    }
}

impl std::str::FromStr for DealerOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DealerOrderStatus::Pending),
            "approved" => Ok(DealerOrderStatus::Approved),
            "rejected" => Ok(DealerOrderStatus::Rejected),
            "shipped" => Ok(DealerOrderStatus::Shipped),
            "delivered" => Ok(DealerOrderStatus::Delivered),
            _ => Err(format!("Invalid dealer order status: {}", s)),
        }
    }
}

/// Dealer ordering stock from the distributor. Requires admin approval
/// before stock is allocated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerOrder {
    pub id: Uuid,
    pub order_number: String,
    pub dealer_id: Uuid,
    pub dealer_name: String,
    pub dealer_email: Option<String>,
    pub dealer_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub tax_amount: f64,
    pub grand_total: f64,
    pub status: DealerOrderStatus,
    pub approved_by: Option<Uuid>,
    pub approved_by_name: Option<String>,
    pub approval_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub shipping_address: Option<String>,
    pub dealer_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DealerOrder {
    pub fn generate_order_number() -> String {
        reference_number("DO")
    }
}

/// Customer order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerOrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    ReadyForPickup,
    Delivered,
    Cancelled,
}

impl CustomerOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerOrderStatus::Pending => "pending",
            CustomerOrderStatus::Confirmed => "confirmed",
            CustomerOrderStatus::Processing => "processing",
            CustomerOrderStatus::ReadyForPickup => "ready_for_pickup",
            CustomerOrderStatus::Delivered => "delivered",
            CustomerOrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for CustomerOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CustomerOrderStatus::Pending),
            "confirmed" => Ok(CustomerOrderStatus::Confirmed),
            "processing" => Ok(CustomerOrderStatus::Processing),
            "ready_for_pickup" => Ok(CustomerOrderStatus::ReadyForPickup),
            "delivered" => Ok(CustomerOrderStatus::Delivered),
            "cancelled" => Ok(CustomerOrderStatus::Cancelled),
            _ => Err(format!("Invalid customer order status: {}", s)),
        }
    }
}

/// Payment progress on a customer order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProgress {
    #[default]
    Pending,
    Partial,
    Completed,
}

impl PaymentProgress {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProgress::Pending => "pending",
            PaymentProgress::Partial => "partial",
            PaymentProgress::Completed => "completed",
        }
    }

    /// Derive the payment state from amounts
    pub fn derive(amount_paid: f64, grand_total: f64) -> Self {
        if amount_paid >= grand_total {
            PaymentProgress::Completed
        } else if amount_paid > 0.0 {
            PaymentProgress::Partial
        } else {
            PaymentProgress::Pending
        }
    }
}

impl std::str::FromStr for PaymentProgress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentProgress::Pending),
            "partial" => Ok(PaymentProgress::Partial),
            "completed" => Ok(PaymentProgress::Completed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// Customer buying from a dealership. No approval step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrder {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub dealer_id: Uuid,
    pub dealer_name: String,
    pub dealership_name: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub grand_total: f64,
    pub payment_status: PaymentProgress,
    pub amount_paid: f64,
    pub amount_remaining: f64,
    pub status: CustomerOrderStatus,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub delivery_pincode: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub is_home_delivery: bool,
    pub customer_notes: Option<String>,
    pub dealer_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub processed_by: Option<Uuid>,
    pub processed_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerOrder {
    pub fn generate_order_number() -> String {
        reference_number("CO")
    }
}

/// Requested order line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

/// Create dealer order request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDealerOrderRequest {
    #[validate(length(min = 1), nested)]
    pub items: Vec<OrderItemRequest>,
    pub dealer_notes: Option<String>,
    pub shipping_address: Option<String>,
}

/// Approve dealer order request (admin)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveOrderRequest {
    pub admin_notes: Option<String>,
}

/// Reject dealer order request (admin)
#[derive(Debug, Clone, Deserialize)]
pub struct RejectOrderRequest {
    pub rejection_reason: String,
    pub admin_notes: Option<String>,
}

/// Mark dealer order shipped request (admin)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipOrderRequest {
    pub tracking_number: Option<String>,
}

/// Create customer order request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerOrderRequest {
    pub dealer_id: Uuid,
    #[validate(length(min = 1), nested)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub amount_paid: f64,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub delivery_pincode: Option<String>,
    #[serde(default)]
    pub is_home_delivery: bool,
    pub customer_notes: Option<String>,
}

/// Update customer order status request (dealership staff)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: CustomerOrderStatus,
    pub dealer_notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

/// Record an additional payment on a customer order
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentRequest {
    pub additional_payment: f64,
}

/// Order list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_progress_derivation() {
        assert_eq!(PaymentProgress::derive(0.0, 1000.0), PaymentProgress::Pending);
        assert_eq!(PaymentProgress::derive(500.0, 1000.0), PaymentProgress::Partial);
        assert_eq!(
            PaymentProgress::derive(1000.0, 1000.0),
            PaymentProgress::Completed
        );
        assert_eq!(
            PaymentProgress::derive(1200.0, 1000.0),
            PaymentProgress::Completed
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DealerOrderStatus::Pending,
            DealerOrderStatus::Approved,
            DealerOrderStatus::Rejected,
            DealerOrderStatus::Shipped,
            DealerOrderStatus::Delivered,
        ] {
            assert_eq!(
                status.as_str().parse::<DealerOrderStatus>().unwrap(),
                status
            );
        }

        assert_eq!(
            "ready_for_pickup".parse::<CustomerOrderStatus>().unwrap(),
            CustomerOrderStatus::ReadyForPickup
        );
        assert!("unknown".parse::<CustomerOrderStatus>().is_err());
    }

    #[test]
    fn test_reference_number_shape() {
        let number = DealerOrder::generate_order_number();
        assert!(number.starts_with("DO-"));
        // DO-YYYYMMDD-NNNNNN
        assert_eq!(number.len(), 18);

        assert!(CustomerOrder::generate_order_number().starts_with("CO-"));
    }

    #[test]
    fn test_order_items_json_round_trip() {
        let items = vec![OrderItem {
            product_id: Uuid::new_v4(),
            product_name: "Lightning Pro".to_string(),
            product_model: Some("LIGHTNING".to_string()),
            quantity: 3,
            unit_price: 48000.0,
            subtotal: 144000.0,
        }];

        let json = serde_json::to_string(&items).unwrap();
        let parsed: Vec<OrderItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, items);
    }
}
