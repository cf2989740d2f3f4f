//! Sales / invoice repository
//!
//! Creating a sale deducts dealer inventory per line with a guarded UPDATE
//! and writes the invoice plus audit rows in one transaction.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_json_column, parse_opt_uuid};
use crate::models::{
    DeliveryStatus, MovementType, PaymentDetails, PaymentMethod, Sale, SaleItem,
    SalePaymentStatus, SaleQuery, SalesDashboard, SalesPeriod, TransactionType, WalkInCustomer,
    WarrantyInfo,
};

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    invoice_number: String,
    dealer_id: String,
    employee_id: String,
    customer_id: Option<String>,
    customer: Option<String>,
    items: String,
    subtotal: f64,
    discount: f64,
    tax_amount: f64,
    grand_total: f64,
    payment_method: String,
    payment_status: String,
    payment_details: Option<String>,
    warranty: String,
    delivery_status: String,
    sale_date: String,
    created_at: String,
}

/// Listing scope resolved from the caller's role
#[derive(Debug, Clone, Copy)]
pub enum SaleScope {
    All,
    Dealer(Uuid),
    Employee(Uuid),
    Customer(Uuid),
}

impl SaleScope {
    fn column(&self) -> Option<&'static str> {
        match self {
            SaleScope::All => None,
            SaleScope::Dealer(_) => Some("dealer_id"),
            SaleScope::Employee(_) => Some("employee_id"),
            SaleScope::Customer(_) => Some("customer_id"),
        }
    }

    fn value(&self) -> Option<String> {
        match self {
            SaleScope::All => None,
            SaleScope::Dealer(id) | SaleScope::Employee(id) | SaleScope::Customer(id) => {
                Some(id.to_string())
            }
        }
    }
}

pub struct SaleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SaleRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a sale: per line, deduct on-hand stock (guarded on
    /// availability, clearing any reservation), stamp last_sold, and write
    /// the inventory-transaction and stock-movement audit rows. The whole
    /// operation commits or rolls back together.
    pub async fn create_sale(
        &self,
        sale: &Sale,
        performed_by_name: &str,
    ) -> Result<Sale> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        for item in &sale.items {
            let before: Option<i64> = sqlx::query_scalar(
                "SELECT quantity FROM dealer_inventory WHERE dealer_id = ? AND product_id = ?",
            )
            .bind(sale.dealer_id.to_string())
            .bind(item.product_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to read inventory")?;

            let Some(quantity_before) = before else {
                bail!("Product '{}' not in inventory", item.product_name);
            };

            let deducted = sqlx::query(
                r#"
                UPDATE dealer_inventory
                SET quantity = quantity - ?,
                    reserved_quantity = MAX(0, reserved_quantity - ?),
                    last_sold = ?,
                    updated_at = ?,
                    low_stock_alert = CASE
                        WHEN quantity - ? - MAX(0, reserved_quantity - ?) <= low_stock_threshold
                        THEN 1 ELSE 0
                    END
                WHERE dealer_id = ? AND product_id = ?
                  AND quantity - reserved_quantity >= ?
                "#,
            )
            .bind(item.quantity)
            .bind(item.quantity)
            .bind(&now)
            .bind(&now)
            .bind(item.quantity)
            .bind(item.quantity)
            .bind(sale.dealer_id.to_string())
            .bind(item.product_id.to_string())
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .context("Failed to deduct inventory")?;

            if deducted.rows_affected() == 0 {
                bail!("Insufficient stock for '{}'", item.product_name);
            }

            sqlx::query(
                r#"
                INSERT INTO inventory_transactions (
                    id, dealer_id, product_id, product_name, transaction_type,
                    quantity_change, quantity_before, quantity_after,
                    order_id, performed_by, performed_by_name, notes, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(sale.dealer_id.to_string())
            .bind(item.product_id.to_string())
            .bind(&item.product_name)
            .bind(TransactionType::Sale.as_str())
            .bind(-item.quantity)
            .bind(quantity_before)
            .bind(quantity_before - item.quantity)
            .bind(sale.id.to_string())
            .bind(sale.employee_id.to_string())
            .bind(performed_by_name)
            .bind(format!("Sold via invoice {}", sale.invoice_number))
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Failed to record inventory transaction")?;

            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    id, product_id, dealer_id, movement_type, quantity,
                    reference_id, reference_type, performed_by,
                    previous_stock, new_stock, notes, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, 'sale', ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(item.product_id.to_string())
            .bind(sale.dealer_id.to_string())
            .bind(MovementType::Sale.as_str())
            .bind(-item.quantity)
            .bind(sale.id.to_string())
            .bind(sale.employee_id.to_string())
            .bind(quantity_before)
            .bind(quantity_before - item.quantity)
            .bind(format!("Sale to customer - Invoice {}", sale.invoice_number))
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Failed to record stock movement")?;
        }

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, dealer_id, employee_id, customer_id, customer,
                items, subtotal, discount, tax_amount, grand_total,
                payment_method, payment_status, payment_details, warranty,
                delivery_status, sale_date, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.id.to_string())
        .bind(&sale.invoice_number)
        .bind(sale.dealer_id.to_string())
        .bind(sale.employee_id.to_string())
        .bind(sale.customer_id.map(|c| c.to_string()))
        .bind(
            sale.customer
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(&sale.items)?)
        .bind(sale.subtotal)
        .bind(sale.discount)
        .bind(sale.tax_amount)
        .bind(sale.grand_total)
        .bind(sale.payment_method.as_str())
        .bind(sale.payment_status.as_str())
        .bind(
            sale.payment_details
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(&sale.warranty)?)
        .bind(sale.delivery_status.as_str())
        .bind(sale.sale_date.to_rfc3339())
        .bind(sale.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to insert sale")?;

        tx.commit().await.context("Failed to commit sale")?;

        self.get_by_id(sale.id)
            .await?
            .context("Sale missing after creation")
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>("SELECT * FROM sales WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to get sale")?;

        Ok(row.map(row_to_sale))
    }

    pub async fn list(&self, scope: SaleScope, query: &SaleQuery) -> Result<Vec<Sale>> {
        let mut sql = "SELECT * FROM sales WHERE 1=1".to_string();
        if scope.column().is_some() {
            sql.push_str(&format!(" AND {} = ?", scope.column().unwrap()));
        }
        if query.payment_status.is_some() {
            sql.push_str(" AND payment_status = ?");
        }
        if query.delivery_status.is_some() {
            sql.push_str(" AND delivery_status = ?");
        }
        if query.start_date.is_some() {
            sql.push_str(" AND sale_date >= ?");
        }
        if query.end_date.is_some() {
            sql.push_str(" AND sale_date <= ?");
        }
        sql.push_str(" ORDER BY sale_date DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, SaleRow>(&sql);
        if let Some(value) = scope.value() {
            q = q.bind(value);
        }
        if let Some(ref payment_status) = query.payment_status {
            q = q.bind(payment_status);
        }
        if let Some(ref delivery_status) = query.delivery_status {
            q = q.bind(delivery_status);
        }
        if let Some(start) = query.start_date {
            q = q.bind(start.to_rfc3339());
        }
        if let Some(end) = query.end_date {
            q = q.bind(end.to_rfc3339());
        }
        q = q
            .bind(query.limit.unwrap_or(20).clamp(1, 100))
            .bind(query.offset.unwrap_or(0).max(0));

        let rows = q.fetch_all(self.pool).await.context("Failed to list sales")?;
        Ok(rows.into_iter().map(row_to_sale).collect())
    }

    pub async fn update_delivery_status(
        &self,
        id: Uuid,
        status: DeliveryStatus,
    ) -> Result<Option<Sale>> {
        sqlx::query("UPDATE sales SET delivery_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to update delivery status")?;

        self.get_by_id(id).await
    }

    /// Dashboard rollup, optionally scoped to one dealership
    pub async fn dashboard(&self, dealer_id: Option<Uuid>) -> Result<SalesDashboard> {
        let scope_sql = if dealer_id.is_some() {
            " AND dealer_id = ?"
        } else {
            ""
        };
        let now = Utc::now();
        let today_start = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let month_start = today_start
            .date_naive()
            .with_day(1)
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
            .unwrap_or(today_start);

        let totals_sql = format!(
            "SELECT COUNT(*) AS count, COALESCE(SUM(grand_total), 0.0) AS revenue \
             FROM sales WHERE 1=1{}",
            scope_sql
        );
        let period_sql = format!(
            "SELECT COUNT(*) AS count, COALESCE(SUM(grand_total), 0.0) AS revenue \
             FROM sales WHERE sale_date >= ?{}",
            scope_sql
        );
        let pending_sql = format!(
            "SELECT COUNT(*) FROM sales WHERE delivery_status = 'pending'{}",
            scope_sql
        );

        let (total_sales, total_revenue) = {
            let mut q = sqlx::query_as::<_, (i64, f64)>(&totals_sql);
            if let Some(d) = dealer_id {
                q = q.bind(d.to_string());
            }
            q.fetch_one(self.pool).await.context("Failed to load totals")?
        };

        let period = |start: chrono::DateTime<Utc>| {
            let sql = period_sql.clone();
            async move {
                let mut q = sqlx::query_as::<_, (i64, f64)>(&sql).bind(start.to_rfc3339());
                if let Some(d) = dealer_id {
                    q = q.bind(d.to_string());
                }
                q.fetch_one(self.pool).await
            }
        };

        let (today_count, today_revenue) =
            period(today_start).await.context("Failed to load today metrics")?;
        let (month_count, month_revenue) =
            period(month_start).await.context("Failed to load month metrics")?;

        let pending_deliveries: i64 = {
            let mut q = sqlx::query_scalar(&pending_sql);
            if let Some(d) = dealer_id {
                q = q.bind(d.to_string());
            }
            q.fetch_one(self.pool)
                .await
                .context("Failed to count pending deliveries")?
        };

        Ok(SalesDashboard {
            total_sales,
            total_revenue,
            today: SalesPeriod {
                count: today_count,
                revenue: today_revenue,
            },
            this_month: SalesPeriod {
                count: month_count,
                revenue: month_revenue,
            },
            pending_deliveries,
        })
    }
}

fn row_to_sale(row: SaleRow) -> Sale {
    Sale {
        id: parse_db_uuid(&row.id),
        invoice_number: row.invoice_number,
        dealer_id: parse_db_uuid(&row.dealer_id),
        employee_id: parse_db_uuid(&row.employee_id),
        customer_id: parse_opt_uuid(row.customer_id.as_deref()),
        customer: row
            .customer
            .as_deref()
            .and_then(|c| serde_json::from_str::<WalkInCustomer>(c).ok()),
        items: parse_json_column::<Vec<SaleItem>>(Some(&row.items)),
        subtotal: row.subtotal,
        discount: row.discount,
        tax_amount: row.tax_amount,
        grand_total: row.grand_total,
        payment_method: row.payment_method.parse().unwrap_or(PaymentMethod::Cash),
        payment_status: row
            .payment_status
            .parse()
            .unwrap_or(SalePaymentStatus::Pending),
        payment_details: row
            .payment_details
            .as_deref()
            .and_then(|p| serde_json::from_str::<PaymentDetails>(p).ok()),
        warranty: serde_json::from_str::<WarrantyInfo>(&row.warranty).unwrap_or(WarrantyInfo {
            is_activated: false,
            activation_date: parse_db_timestamp(&row.sale_date),
            expiry_date: parse_db_timestamp(&row.sale_date),
            free_services_total: 0,
            free_services_used: 0,
            free_services_remaining: 0,
        }),
        delivery_status: row
            .delivery_status
            .parse()
            .unwrap_or(DeliveryStatus::Pending),
        sale_date: parse_db_timestamp(&row.sale_date),
        created_at: parse_db_timestamp(&row.created_at),
    }
}
