//! Product catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Technical specifications, stored as a JSON document on the product row
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProductSpecifications {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_km: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charging_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_power: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

/// Service charge table per issue type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceCharges {
    pub standard_service: f64,
    pub major_service: f64,
    pub repair: f64,
    pub inspection: f64,
}

impl Default for ServiceCharges {
    fn default() -> Self {
        Self {
            standard_service: 500.0,
            major_service: 1000.0,
            repair: 500.0,
            inspection: 300.0,
        }
    }
}

/// Warranty policy attached to a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarrantyPolicy {
    pub free_services: u32,
    pub warranty_period_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

impl Default for WarrantyPolicy {
    fn default() -> Self {
        Self {
            free_services: 4,
            warranty_period_months: 24,
            terms: None,
        }
    }
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub model: String,
    pub description: Option<String>,
    pub specifications: Option<ProductSpecifications>,
    /// Retail price charged to customers
    pub base_price: f64,
    /// Wholesale price charged to dealers
    pub dealer_price: f64,
    pub mrp: f64,
    /// GST percentage
    pub tax_rate: f64,
    pub service_charges: ServiceCharges,
    pub warranty: WarrantyPolicy,
    /// Distributor master stock
    pub total_stock: i64,
    pub low_stock_threshold: i64,
    pub is_available: bool,
    pub is_featured: bool,
    pub category: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.total_stock <= self.low_stock_threshold
    }
}

/// Create product request (admin)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    pub description: Option<String>,
    pub specifications: Option<ProductSpecifications>,
    #[validate(range(min = 0.0))]
    pub base_price: f64,
    #[validate(range(min = 0.0))]
    pub dealer_price: f64,
    #[validate(range(min = 0.0))]
    pub mrp: f64,
    pub tax_rate: Option<f64>,
    pub service_charges: Option<ServiceCharges>,
    pub warranty: Option<WarrantyPolicy>,
    pub total_stock: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    pub is_available: Option<bool>,
    pub is_featured: Option<bool>,
    pub category: Option<String>,
}

/// Update product request (admin)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub specifications: Option<ProductSpecifications>,
    pub base_price: Option<f64>,
    pub dealer_price: Option<f64>,
    pub mrp: Option<f64>,
    pub tax_rate: Option<f64>,
    pub service_charges: Option<ServiceCharges>,
    pub warranty: Option<WarrantyPolicy>,
    pub total_stock: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    pub is_available: Option<bool>,
    pub is_featured: Option<bool>,
    pub category: Option<String>,
}

/// Product list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub available_only: Option<bool>,
    pub featured_only: Option<bool>,
    /// Case-insensitive name substring match
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Per-product stock line in the admin stock overview
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockLine {
    pub product_id: Uuid,
    pub name: String,
    pub model: String,
    pub total_stock: i64,
    pub low_stock: bool,
    pub is_available: bool,
}

/// Admin stock overview rollup
#[derive(Debug, Clone, Serialize)]
pub struct StockOverview {
    pub total_products: i64,
    pub total_units: i64,
    pub low_stock_products: i64,
    pub unavailable_products: i64,
    pub products: Vec<ProductStockLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock_derivation() {
        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4(),
            name: "Lightning Pro".to_string(),
            slug: "lightning-pro".to_string(),
            model: "LIGHTNING".to_string(),
            description: None,
            specifications: None,
            base_price: 55000.0,
            dealer_price: 48000.0,
            mrp: 60000.0,
            tax_rate: 18.0,
            service_charges: ServiceCharges::default(),
            warranty: WarrantyPolicy::default(),
            total_stock: 10,
            low_stock_threshold: 10,
            is_available: true,
            is_featured: false,
            category: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };

        assert!(product.is_low_stock());
        product.total_stock = 11;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_default_policies() {
        let charges = ServiceCharges::default();
        assert_eq!(charges.standard_service, 500.0);
        assert_eq!(charges.inspection, 300.0);

        let warranty = WarrantyPolicy::default();
        assert_eq!(warranty.free_services, 4);
        assert_eq!(warranty.warranty_period_months, 24);
    }

    #[test]
    fn test_specifications_json_round_trip() {
        let specs = ProductSpecifications {
            range_km: Some("50-60 KM".to_string()),
            battery_type: Some("Lithium-ion".to_string()),
            colors: vec!["red".to_string(), "black".to_string()],
            ..Default::default()
        };

        let json = serde_json::to_string(&specs).unwrap();
        let parsed: ProductSpecifications = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, specs);
    }
}
