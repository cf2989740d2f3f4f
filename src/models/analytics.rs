//! Analytics response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Count + revenue bucket
#[derive(Debug, Clone, Serialize)]
pub struct PeriodMetrics {
    pub count: i64,
    pub revenue: f64,
}

/// Dealer ranked by revenue
#[derive(Debug, Clone, Serialize)]
pub struct TopDealer {
    pub dealer_id: Uuid,
    pub dealer_name: String,
    pub total_sales: i64,
    pub total_revenue: f64,
}

/// Product ranked by units sold
#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub units_sold: i64,
}

/// Global overview counters
#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
    pub total_dealers: i64,
    pub total_customers: i64,
    pub total_products: i64,
    pub total_revenue: f64,
    pub total_sales: i64,
}

/// Pending work counters
#[derive(Debug, Clone, Serialize)]
pub struct PendingCounters {
    pub dealer_orders: i64,
    pub services: i64,
    pub active_services: i64,
}

/// Admin dashboard rollup
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub overview: AdminOverview,
    pub today: PeriodMetrics,
    pub this_month: PeriodMetrics,
    pub pending: PendingCounters,
    pub top_dealers: Vec<TopDealer>,
    pub top_products: Vec<TopProduct>,
}

/// Trend granularity for sales analytics
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum TrendPeriod {
    #[serde(rename = "7days")]
    Week,
    #[default]
    #[serde(rename = "30days")]
    Month,
    #[serde(rename = "12months")]
    Year,
}

/// Sales analytics query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalesAnalyticsQuery {
    #[serde(default)]
    pub period: TrendPeriod,
    /// Admin-only dealer filter
    pub dealer_id: Option<Uuid>,
}

/// One point on the sales trend series
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    /// Day (YYYY-MM-DD) or month (YYYY-MM) bucket
    pub period: String,
    pub sales: i64,
    pub revenue: f64,
}

/// Sales analytics response
#[derive(Debug, Clone, Serialize)]
pub struct SalesAnalytics {
    pub period: String,
    pub total_sales: i64,
    pub total_revenue: f64,
    pub trend: Vec<TrendPoint>,
    pub payment_methods: std::collections::HashMap<String, i64>,
}

/// Staff counters on the dealer dashboard
#[derive(Debug, Clone, Serialize)]
pub struct StaffCounters {
    pub employees: i64,
    pub servicemen: i64,
}

/// Sales block on the dealer dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DealerSalesMetrics {
    pub total: i64,
    pub total_revenue: f64,
    pub today_sales: i64,
    pub today_revenue: f64,
    pub month_sales: i64,
    pub month_revenue: f64,
}

/// Inventory block on the dealer dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DealerInventoryMetrics {
    pub total_products: i64,
    pub total_value: f64,
    pub low_stock_items: i64,
}

/// Service block on the dealer dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DealerServiceMetrics {
    pub pending: i64,
    pub active: i64,
}

/// Dealer dashboard rollup
#[derive(Debug, Clone, Serialize)]
pub struct DealerDashboard {
    pub staff: StaffCounters,
    pub sales: DealerSalesMetrics,
    pub inventory: DealerInventoryMetrics,
    pub services: DealerServiceMetrics,
    pub pending_deliveries: i64,
    pub top_products: Vec<TopProduct>,
}

/// Per-product line in inventory analytics
#[derive(Debug, Clone, Serialize)]
pub struct InventoryValueLine {
    pub product_name: String,
    pub quantity: i64,
    pub value: f64,
    pub low_stock: bool,
}

/// Inventory analytics rollup (dealer)
#[derive(Debug, Clone, Serialize)]
pub struct InventoryAnalytics {
    pub total_products: i64,
    pub total_quantity: i64,
    pub total_value: f64,
    pub low_stock_items: i64,
    pub out_of_stock: i64,
    pub products: Vec<InventoryValueLine>,
}

impl TrendPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendPeriod::Week => "7days",
            TrendPeriod::Month => "30days",
            TrendPeriod::Year => "12months",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            TrendPeriod::Week => 7,
            TrendPeriod::Month => 30,
            TrendPeriod::Year => 365,
        }
    }

    /// Monthly buckets for the year view, daily otherwise
    pub fn bucket_format(&self) -> &'static str {
        match self {
            TrendPeriod::Year => "%Y-%m",
            _ => "%Y-%m-%d",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_period_parsing() {
        #[derive(Deserialize)]
        struct Query {
            period: TrendPeriod,
        }

        let q: Query = serde_json::from_str(r#"{"period": "7days"}"#).unwrap();
        assert_eq!(q.period, TrendPeriod::Week);
        assert_eq!(q.period.days(), 7);

        let q: Query = serde_json::from_str(r#"{"period": "12months"}"#).unwrap();
        assert_eq!(q.period, TrendPeriod::Year);
        assert_eq!(q.period.bucket_format(), "%Y-%m");
    }
}
