//! Dealer inventory models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock row for one product at one dealership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerInventory {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub product_model: Option<String>,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub low_stock_threshold: i64,
    pub low_stock_alert: bool,
    pub last_restocked: Option<DateTime<Utc>>,
    pub last_sold: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DealerInventory {
    /// Sellable quantity: on-hand minus reservations
    pub fn available_quantity(&self) -> i64 {
        (self.quantity - self.reserved_quantity).max(0)
    }
}

/// Inventory transaction type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Restock,
    Sale,
    Adjustment,
    Return,
    Damage,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Restock => "restock",
            TransactionType::Sale => "sale",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Return => "return",
            TransactionType::Damage => "damage",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restock" => Ok(TransactionType::Restock),
            "sale" => Ok(TransactionType::Sale),
            "adjustment" => Ok(TransactionType::Adjustment),
            "return" => Ok(TransactionType::Return),
            "damage" => Ok(TransactionType::Damage),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Audit row for a dealer inventory mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub transaction_type: TransactionType,
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub order_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
    pub performed_by_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Master-stock movement type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    OrderReceived,
    Sale,
    Return,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::OrderReceived => "order_received",
            MovementType::Sale => "sale",
            MovementType::Return => "return",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_received" => Ok(MovementType::OrderReceived),
            "sale" => Ok(MovementType::Sale),
            "return" => Ok(MovementType::Return),
            "adjustment" => Ok(MovementType::Adjustment),
            _ => Err(format!("Invalid movement type: {}", s)),
        }
    }
}

/// Master-stock audit row (distributor side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub dealer_id: Option<Uuid>,
    pub movement_type: MovementType,
    /// Positive for additions, negative for deductions
    pub quantity: i64,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub performed_by: Option<Uuid>,
    pub previous_stock: Option<i64>,
    pub new_stock: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Manual inventory adjustment request (dealer)
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustInventoryRequest {
    pub quantity_change: i64,
    #[serde(default = "default_adjustment_type")]
    pub transaction_type: TransactionType,
    pub notes: Option<String>,
}

fn default_adjustment_type() -> TransactionType {
    TransactionType::Adjustment
}

/// Inventory list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryQuery {
    pub low_stock: Option<bool>,
    pub dealer_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_quantity() {
        let now = Utc::now();
        let mut row = DealerInventory {
            id: Uuid::new_v4(),
            dealer_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: None,
            product_model: None,
            quantity: 10,
            reserved_quantity: 3,
            low_stock_threshold: 5,
            low_stock_alert: false,
            last_restocked: None,
            last_sold: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(row.available_quantity(), 7);

        // Reservations never drive availability negative
        row.reserved_quantity = 15;
        assert_eq!(row.available_quantity(), 0);
    }

    #[test]
    fn test_transaction_type_round_trip() {
        for tx in [
            TransactionType::Restock,
            TransactionType::Sale,
            TransactionType::Adjustment,
            TransactionType::Return,
            TransactionType::Damage,
        ] {
            assert_eq!(tx.as_str().parse::<TransactionType>().unwrap(), tx);
        }
    }

    #[test]
    fn test_adjustment_request_defaults() {
        let json = r#"{"quantity_change": -2, "notes": "damaged in transit"}"#;
        let req: AdjustInventoryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.transaction_type, TransactionType::Adjustment);
        assert_eq!(req.quantity_change, -2);
    }
}
