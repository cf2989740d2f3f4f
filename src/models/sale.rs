//! Billing models: point-of-sale invoices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Invoice line, stored as a JSON array on the sale row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub discount: f64,
    pub tax_rate: f64,
    /// Line total including tax
    pub subtotal: f64,
}

/// Walk-in customer details embedded on the invoice
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WalkInCustomer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Payment details embedded on the invoice
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PaymentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_payment: Option<f64>,
}

/// Warranty activated by a sale, counters embedded on the invoice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarrantyInfo {
    pub is_activated: bool,
    pub activation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub free_services_total: u32,
    pub free_services_used: u32,
    pub free_services_remaining: u32,
}

/// Payment method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Emi,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Emi => "emi",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "emi" => Ok(PaymentMethod::Emi),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Invoice payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SalePaymentStatus {
    Paid,
    Pending,
    Partial,
}

impl SalePaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalePaymentStatus::Paid => "paid",
            SalePaymentStatus::Pending => "pending",
            SalePaymentStatus::Partial => "partial",
        }
    }
}

impl std::str::FromStr for SalePaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(SalePaymentStatus::Paid),
            "pending" => Ok(SalePaymentStatus::Pending),
            "partial" => Ok(SalePaymentStatus::Partial),
            _ => Err(format!("Invalid sale payment status: {}", s)),
        }
    }
}

/// Delivery status of a sold vehicle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Ready,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Ready => "ready",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "ready" => Ok(DeliveryStatus::Ready),
            "delivered" => Ok(DeliveryStatus::Delivered),
            _ => Err(format!("Invalid delivery status: {}", s)),
        }
    }
}

/// Sale / invoice entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub invoice_number: String,
    pub dealer_id: Uuid,
    /// Salesperson; the dealer themselves when they ring up the sale
    pub employee_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer: Option<WalkInCustomer>,
    pub items: Vec<SaleItem>,
    pub subtotal: f64,
    pub discount: f64,
    pub tax_amount: f64,
    pub grand_total: f64,
    pub payment_method: PaymentMethod,
    pub payment_status: SalePaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub warranty: WarrantyInfo,
    pub delivery_status: DeliveryStatus,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn generate_invoice_number() -> String {
        super::order::reference_number("INV")
    }
}

/// Requested invoice line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[serde(default)]
    pub discount: f64,
    /// Defaults to the product's tax rate
    pub tax_rate: Option<f64>,
}

/// Create sale request (dealer/employee)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSaleRequest {
    pub customer_id: Option<Uuid>,
    pub customer: Option<WalkInCustomer>,
    #[validate(length(min = 1), nested)]
    pub items: Vec<SaleItemRequest>,
    #[serde(default)]
    pub discount: f64,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<PaymentDetails>,
}

/// Update delivery status request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDeliveryStatusRequest {
    pub delivery_status: DeliveryStatus,
}

/// Sale list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleQuery {
    pub payment_status: Option<String>,
    pub delivery_status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Employees: include all dealership sales, not only their own
    pub view_all: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Period bucket for the sales dashboard
#[derive(Debug, Clone, Serialize)]
pub struct SalesPeriod {
    pub count: i64,
    pub revenue: f64,
}

/// Sales dashboard rollup
#[derive(Debug, Clone, Serialize)]
pub struct SalesDashboard {
    pub total_sales: i64,
    pub total_revenue: f64,
    pub today: SalesPeriod,
    pub this_month: SalesPeriod,
    pub pending_deliveries: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_round_trip() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Card,
            PaymentMethod::Upi,
            PaymentMethod::Emi,
            PaymentMethod::BankTransfer,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_warranty_info_json_round_trip() {
        let warranty = WarrantyInfo {
            is_activated: true,
            activation_date: Utc::now(),
            expiry_date: Utc::now() + chrono::Duration::days(730),
            free_services_total: 4,
            free_services_used: 1,
            free_services_remaining: 3,
        };

        let json = serde_json::to_string(&warranty).unwrap();
        let parsed: WarrantyInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, warranty);
    }
}
