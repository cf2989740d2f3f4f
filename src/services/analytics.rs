//! Analytics rollups
//!
//! Dashboard and trend aggregations over sales, orders, inventory and
//! service tickets. Item-level rollups unpack the denormalized JSON lines
//! on each invoice.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid};
use crate::models::{
    AdminDashboard, AdminOverview, DealerDashboard, DealerInventoryMetrics, DealerSalesMetrics,
    DealerServiceMetrics, InventoryAnalytics, InventoryValueLine, PendingCounters, PeriodMetrics,
    Role, SaleItem, SalesAnalytics, SalesAnalyticsQuery, StaffCounters, TopDealer, TopProduct,
    TrendPoint,
};

/// Flattened sale used by the in-memory rollups
struct SaleFacts {
    dealer_id: Uuid,
    grand_total: f64,
    sale_date: chrono::DateTime<Utc>,
    payment_method: String,
    delivery_status: String,
    items: Vec<SaleItem>,
}

pub struct AnalyticsService {
    pool: SqlitePool,
}

impl AnalyticsService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Global dashboard for admins
    pub async fn admin_dashboard(&self) -> Result<AdminDashboard> {
        let sales = self.load_sales(None, None).await?;

        let total_dealers = self.count_users(Role::Dealer).await?;
        let total_customers = self.count_users(Role::Customer).await?;
        let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count products")?;

        let today_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let month_start = today_start
            .date_naive()
            .with_day(1)
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
            .unwrap_or(today_start);

        let total_revenue: f64 = sales.iter().map(|s| s.grand_total).sum();
        let today: Vec<_> = sales.iter().filter(|s| s.sale_date >= today_start).collect();
        let month: Vec<_> = sales.iter().filter(|s| s.sale_date >= month_start).collect();

        let pending_dealer_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM dealer_orders WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .context("Failed to count pending dealer orders")?;
        let pending_services: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM service_requests WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .context("Failed to count pending services")?;
        let active_services: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_requests WHERE status = 'in_progress'",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count active services")?;

        Ok(AdminDashboard {
            overview: AdminOverview {
                total_dealers,
                total_customers,
                total_products,
                total_revenue,
                total_sales: sales.len() as i64,
            },
            today: PeriodMetrics {
                count: today.len() as i64,
                revenue: today.iter().map(|s| s.grand_total).sum(),
            },
            this_month: PeriodMetrics {
                count: month.len() as i64,
                revenue: month.iter().map(|s| s.grand_total).sum(),
            },
            pending: PendingCounters {
                dealer_orders: pending_dealer_orders,
                services: pending_services,
                active_services,
            },
            top_dealers: self.top_dealers(&sales, 5).await?,
            top_products: top_products(&sales, 5),
        })
    }

    /// Trend series with payment-method breakdown
    pub async fn sales_analytics(
        &self,
        dealer_id: Option<Uuid>,
        query: &SalesAnalyticsQuery,
    ) -> Result<SalesAnalytics> {
        let start = Utc::now() - Duration::days(query.period.days());
        let sales = self.load_sales(dealer_id, Some(start)).await?;

        let format = query.period.bucket_format();
        let mut buckets: BTreeMap<String, (i64, f64)> = BTreeMap::new();
        let mut payment_methods: HashMap<String, i64> = HashMap::new();

        for sale in &sales {
            let bucket = sale.sale_date.format(format).to_string();
            let entry = buckets.entry(bucket).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += sale.grand_total;

            *payment_methods.entry(sale.payment_method.clone()).or_insert(0) += 1;
        }

        Ok(SalesAnalytics {
            period: query.period.as_str().to_string(),
            total_sales: sales.len() as i64,
            total_revenue: sales.iter().map(|s| s.grand_total).sum(),
            trend: buckets
                .into_iter()
                .map(|(period, (count, revenue))| TrendPoint {
                    period,
                    sales: count,
                    revenue,
                })
                .collect(),
            payment_methods,
        })
    }

    /// Per-dealership dashboard
    pub async fn dealer_dashboard(&self, dealer_id: Uuid) -> Result<DealerDashboard> {
        let sales = self.load_sales(Some(dealer_id), None).await?;

        let today_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let month_start = today_start
            .date_naive()
            .with_day(1)
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
            .unwrap_or(today_start);

        let today: Vec<_> = sales.iter().filter(|s| s.sale_date >= today_start).collect();
        let month: Vec<_> = sales.iter().filter(|s| s.sale_date >= month_start).collect();

        let employees = self.count_staff(dealer_id, Role::Employee).await?;
        let servicemen = self.count_staff(dealer_id, Role::Serviceman).await?;

        let inventory = self.inventory_analytics(dealer_id).await?;

        let pending_services = self.count_services(dealer_id, "pending").await?;
        let active_services = self.count_services(dealer_id, "in_progress").await?;

        let pending_deliveries = sales
            .iter()
            .filter(|s| s.delivery_status == "pending")
            .count() as i64;

        Ok(DealerDashboard {
            staff: StaffCounters {
                employees,
                servicemen,
            },
            sales: DealerSalesMetrics {
                total: sales.len() as i64,
                total_revenue: sales.iter().map(|s| s.grand_total).sum(),
                today_sales: today.len() as i64,
                today_revenue: today.iter().map(|s| s.grand_total).sum(),
                month_sales: month.len() as i64,
                month_revenue: month.iter().map(|s| s.grand_total).sum(),
            },
            inventory: DealerInventoryMetrics {
                total_products: inventory.total_products,
                total_value: inventory.total_value,
                low_stock_items: inventory.low_stock_items,
            },
            services: DealerServiceMetrics {
                pending: pending_services,
                active: active_services,
            },
            pending_deliveries,
            top_products: top_products(&sales, 5),
        })
    }

    /// Inventory value breakdown for a dealership. Value is units times the
    /// wholesale price.
    pub async fn inventory_analytics(&self, dealer_id: Uuid) -> Result<InventoryAnalytics> {
        let rows = sqlx::query(
            r#"
            SELECT di.product_name, di.quantity, di.low_stock_alert,
                   COALESCE(p.dealer_price, 0.0) AS dealer_price
            FROM dealer_inventory di
            LEFT JOIN products p ON p.id = di.product_id
            WHERE di.dealer_id = ?
            "#,
        )
        .bind(dealer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load inventory analytics")?;

        let mut total_quantity = 0i64;
        let mut total_value = 0.0f64;
        let mut low_stock_items = 0i64;
        let mut out_of_stock = 0i64;
        let mut products = Vec::with_capacity(rows.len());

        for row in &rows {
            let quantity: i64 = row.get("quantity");
            let low_stock: i64 = row.get("low_stock_alert");
            let dealer_price: f64 = row.get("dealer_price");
            let value = quantity as f64 * dealer_price;

            total_quantity += quantity;
            total_value += value;
            if low_stock != 0 {
                low_stock_items += 1;
            }
            if quantity == 0 {
                out_of_stock += 1;
            }

            products.push(InventoryValueLine {
                product_name: row
                    .get::<Option<String>, _>("product_name")
                    .unwrap_or_default(),
                quantity,
                value,
                low_stock: low_stock != 0,
            });
        }

        products.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
        products.truncate(10);

        Ok(InventoryAnalytics {
            total_products: rows.len() as i64,
            total_quantity,
            total_value,
            low_stock_items,
            out_of_stock,
            products,
        })
    }

    async fn load_sales(
        &self,
        dealer_id: Option<Uuid>,
        since: Option<chrono::DateTime<Utc>>,
    ) -> Result<Vec<SaleFacts>> {
        let mut sql = "SELECT dealer_id, grand_total, sale_date, payment_method, \
                       delivery_status, items FROM sales WHERE 1=1"
            .to_string();
        if dealer_id.is_some() {
            sql.push_str(" AND dealer_id = ?");
        }
        if since.is_some() {
            sql.push_str(" AND sale_date >= ?");
        }

        let mut q = sqlx::query(&sql);
        if let Some(d) = dealer_id {
            q = q.bind(d.to_string());
        }
        if let Some(since) = since {
            q = q.bind(since.to_rfc3339());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .context("Failed to load sales")?;

        Ok(rows
            .iter()
            .map(|row| SaleFacts {
                dealer_id: parse_db_uuid(row.get("dealer_id")),
                grand_total: row.get("grand_total"),
                sale_date: parse_db_timestamp(row.get("sale_date")),
                payment_method: row.get("payment_method"),
                delivery_status: row.get("delivery_status"),
                items: serde_json::from_str(row.get::<String, _>("items").as_str())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn top_dealers(&self, sales: &[SaleFacts], limit: usize) -> Result<Vec<TopDealer>> {
        let mut revenue: HashMap<Uuid, (i64, f64)> = HashMap::new();
        for sale in sales {
            let entry = revenue.entry(sale.dealer_id).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += sale.grand_total;
        }

        let mut ranked: Vec<_> = revenue.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .1.partial_cmp(&a.1 .1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(limit);

        let mut top = Vec::with_capacity(ranked.len());
        for (dealer_id, (count, total)) in ranked {
            let name: Option<(Option<String>, String, String)> = sqlx::query_as(
                "SELECT dealership_name, first_name, last_name FROM users WHERE id = ?",
            )
            .bind(dealer_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to resolve dealer name")?;

            let dealer_name = match name {
                Some((Some(dealership), _, _)) if !dealership.is_empty() => dealership,
                Some((_, first, last)) => format!("{} {}", first, last).trim().to_string(),
                None => continue,
            };

            top.push(TopDealer {
                dealer_id,
                dealer_name,
                total_sales: count,
                total_revenue: total,
            });
        }

        Ok(top)
    }

    async fn count_users(&self, role: Role) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }

    async fn count_staff(&self, dealer_id: Uuid, role: Role) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ? AND dealer_id = ?")
                .bind(role.as_str())
                .bind(dealer_id.to_string())
                .fetch_one(&self.pool)
                .await
                .context("Failed to count staff")?;
        Ok(count)
    }

    async fn count_services(&self, dealer_id: Uuid, status: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_requests WHERE dealer_id = ? AND status = ?",
        )
        .bind(dealer_id.to_string())
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count services")?;
        Ok(count)
    }
}

/// Rank products by units sold across the given sales
fn top_products(sales: &[SaleFacts], limit: usize) -> Vec<TopProduct> {
    let mut units: HashMap<Uuid, (String, i64)> = HashMap::new();
    for sale in sales {
        for item in &sale.items {
            let entry = units
                .entry(item.product_id)
                .or_insert_with(|| (item.product_name.clone(), 0));
            entry.1 += item.quantity;
        }
    }

    let mut ranked: Vec<_> = units.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .1.cmp(&a.1 .1));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(product_id, (product_name, units_sold))| TopProduct {
            product_id,
            product_name,
            units_sold,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_pool;
    use crate::models::TrendPeriod;

    async fn test_pool() -> SqlitePool {
        init_pool(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap()
    }

    async fn seed_sale(pool: &SqlitePool, dealer_id: Uuid, grand_total: f64, method: &str) {
        let product_id = Uuid::new_v4();
        let items = serde_json::json!([{
            "product_id": product_id,
            "product_name": "Lightning Pro",
            "quantity": 1,
            "unit_price": grand_total,
            "discount": 0.0,
            "tax_rate": 18.0,
            "subtotal": grand_total
        }]);
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO sales (id, invoice_number, dealer_id, employee_id, items, subtotal, \
             discount, tax_amount, grand_total, payment_method, payment_status, warranty, \
             delivery_status, sale_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?, 'paid', '{}', 'pending', ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(format!("INV-{}", Uuid::new_v4()))
        .bind(dealer_id.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(items.to_string())
        .bind(grand_total)
        .bind(grand_total)
        .bind(method)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_sales_analytics_trend_and_methods() {
        let pool = test_pool().await;
        let service = AnalyticsService::new(pool.clone());
        let dealer_id = Uuid::new_v4();

        seed_sale(&pool, dealer_id, 1000.0, "cash").await;
        seed_sale(&pool, dealer_id, 2000.0, "upi").await;
        seed_sale(&pool, dealer_id, 3000.0, "cash").await;

        let analytics = service
            .sales_analytics(
                Some(dealer_id),
                &SalesAnalyticsQuery {
                    period: TrendPeriod::Month,
                    dealer_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(analytics.total_sales, 3);
        assert_eq!(analytics.total_revenue, 6000.0);
        // All three sales land in today's bucket
        assert_eq!(analytics.trend.len(), 1);
        assert_eq!(analytics.trend[0].sales, 3);
        assert_eq!(analytics.payment_methods.get("cash"), Some(&2));
        assert_eq!(analytics.payment_methods.get("upi"), Some(&1));
    }

    #[tokio::test]
    async fn test_admin_dashboard_totals_and_top_products() {
        let pool = test_pool().await;
        let service = AnalyticsService::new(pool.clone());
        let dealer_id = Uuid::new_v4();

        // The dealer must exist for the top-dealer name lookup
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, \
             dealership_name, employment_status, is_active, is_approved, created_at, updated_at) \
             VALUES (?, 'dealer@example.com', 'x', 'Meera', 'Shah', '9876543210', 'dealer', \
             'VoltRide Pune', 'active', 1, 1, ?, ?)",
        )
        .bind(dealer_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        seed_sale(&pool, dealer_id, 55000.0, "cash").await;
        seed_sale(&pool, dealer_id, 48000.0, "emi").await;

        let dashboard = service.admin_dashboard().await.unwrap();
        assert_eq!(dashboard.overview.total_sales, 2);
        assert_eq!(dashboard.overview.total_revenue, 103000.0);
        assert_eq!(dashboard.overview.total_dealers, 1);
        assert_eq!(dashboard.today.count, 2);
        assert_eq!(dashboard.top_dealers.len(), 1);
        assert_eq!(dashboard.top_dealers[0].dealer_name, "VoltRide Pune");
        assert_eq!(dashboard.top_products.len(), 1);
        assert_eq!(dashboard.top_products[0].units_sold, 2);
    }

    #[tokio::test]
    async fn test_inventory_analytics() {
        let pool = test_pool().await;
        let service = AnalyticsService::new(pool.clone());
        let dealer_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO dealer_inventory (id, dealer_id, product_id, product_name, quantity, \
             reserved_quantity, low_stock_threshold, low_stock_alert, created_at, updated_at) \
             VALUES (?, ?, ?, 'Lightning Pro', 4, 0, 5, 1, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(dealer_id.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO dealer_inventory (id, dealer_id, product_id, product_name, quantity, \
             reserved_quantity, low_stock_threshold, low_stock_alert, created_at, updated_at) \
             VALUES (?, ?, ?, 'Marium', 0, 0, 5, 1, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(dealer_id.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        let analytics = service.inventory_analytics(dealer_id).await.unwrap();
        assert_eq!(analytics.total_products, 2);
        assert_eq!(analytics.total_quantity, 4);
        assert_eq!(analytics.low_stock_items, 2);
        assert_eq!(analytics.out_of_stock, 1);
        // No catalog rows joined, so value falls back to zero
        assert_eq!(analytics.total_value, 0.0);
    }
}
