//! Dealer and customer order repository
//!
//! Dealer-order approval transfers stock from the distributor to the
//! dealership inside a single transaction; the master-stock deduction is a
//! guarded UPDATE so a concurrent approval cannot overdraw.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_json_column, parse_opt_timestamp, parse_opt_uuid};
use crate::models::{
    CustomerOrder, CustomerOrderStatus, DealerOrder, DealerOrderStatus, MovementType, OrderItem,
    OrderQuery, PaymentProgress,
};

#[derive(Debug, sqlx::FromRow)]
struct DealerOrderRow {
    id: String,
    order_number: String,
    dealer_id: String,
    dealer_name: String,
    dealer_email: Option<String>,
    dealer_phone: Option<String>,
    items: String,
    total_amount: f64,
    tax_amount: f64,
    grand_total: f64,
    status: String,
    approved_by: Option<String>,
    approved_by_name: Option<String>,
    approval_date: Option<String>,
    rejection_reason: Option<String>,
    expected_delivery: Option<String>,
    actual_delivery: Option<String>,
    tracking_number: Option<String>,
    shipping_address: Option<String>,
    dealer_notes: Option<String>,
    admin_notes: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerOrderRow {
    id: String,
    order_number: String,
    customer_id: String,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: String,
    dealer_id: String,
    dealer_name: String,
    dealership_name: Option<String>,
    items: String,
    total_amount: f64,
    tax_amount: f64,
    discount_amount: f64,
    grand_total: f64,
    payment_status: String,
    amount_paid: f64,
    amount_remaining: f64,
    status: String,
    delivery_address: Option<String>,
    delivery_city: Option<String>,
    delivery_state: Option<String>,
    delivery_pincode: Option<String>,
    delivery_date: Option<String>,
    is_home_delivery: i64,
    customer_notes: Option<String>,
    dealer_notes: Option<String>,
    cancellation_reason: Option<String>,
    processed_by: Option<String>,
    processed_by_name: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Listing scope resolved from the caller's role
#[derive(Debug, Clone, Copy)]
pub enum OrderScope {
    All,
    Dealer(Uuid),
    Customer(Uuid),
}

pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // ---- Dealer orders -------------------------------------------------

    pub async fn insert_dealer_order(&self, order: &DealerOrder) -> Result<DealerOrder> {
        sqlx::query(
            r#"
            INSERT INTO dealer_orders (
                id, order_number, dealer_id, dealer_name, dealer_email, dealer_phone,
                items, total_amount, tax_amount, grand_total, status,
                shipping_address, dealer_notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(&order.order_number)
        .bind(order.dealer_id.to_string())
        .bind(&order.dealer_name)
        .bind(&order.dealer_email)
        .bind(&order.dealer_phone)
        .bind(serde_json::to_string(&order.items)?)
        .bind(order.total_amount)
        .bind(order.tax_amount)
        .bind(order.grand_total)
        .bind(order.status.as_str())
        .bind(&order.shipping_address)
        .bind(&order.dealer_notes)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to create dealer order")?;

        self.get_dealer_order(order.id)
            .await?
            .context("Failed to retrieve created dealer order")
    }

    pub async fn get_dealer_order(&self, id: Uuid) -> Result<Option<DealerOrder>> {
        let row = sqlx::query_as::<_, DealerOrderRow>("SELECT * FROM dealer_orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to get dealer order")?;

        Ok(row.map(row_to_dealer_order))
    }

    pub async fn list_dealer_orders(
        &self,
        dealer_id: Option<Uuid>,
        query: &OrderQuery,
    ) -> Result<Vec<DealerOrder>> {
        let mut sql = "SELECT * FROM dealer_orders WHERE 1=1".to_string();
        if dealer_id.is_some() {
            sql.push_str(" AND dealer_id = ?");
        }
        if query.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, DealerOrderRow>(&sql);
        if let Some(dealer_id) = dealer_id {
            q = q.bind(dealer_id.to_string());
        }
        if let Some(ref status) = query.status {
            q = q.bind(status);
        }
        q = q
            .bind(query.limit.unwrap_or(20).clamp(1, 100))
            .bind(query.offset.unwrap_or(0).max(0));

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list dealer orders")?;

        Ok(rows.into_iter().map(row_to_dealer_order).collect())
    }

    /// Approve a pending dealer order.
    ///
    /// In one transaction: flips the order to approved (guarded on the
    /// pending state), deducts master stock per line (guarded on
    /// availability), credits the dealership's inventory rows, and writes
    /// the audit trail. Fails without side effects if any guard misses.
    pub async fn approve_dealer_order(
        &self,
        order: &DealerOrder,
        approver_id: Uuid,
        approver_name: &str,
        admin_notes: Option<&str>,
        lead_days: u32,
    ) -> Result<DealerOrder> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE dealer_orders
            SET status = 'approved', approved_by = ?, approved_by_name = ?,
                approval_date = ?, expected_delivery = ?, admin_notes = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(approver_id.to_string())
        .bind(approver_name)
        .bind(now.to_rfc3339())
        .bind((now + Duration::days(lead_days as i64)).to_rfc3339())
        .bind(admin_notes)
        .bind(now.to_rfc3339())
        .bind(order.id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update order status")?;

        if updated.rows_affected() == 0 {
            bail!("Order is no longer pending");
        }

        for item in &order.items {
            // Guarded master-stock deduction; zero rows means insufficient stock
            let deducted = sqlx::query(
                r#"
                UPDATE products
                SET total_stock = total_stock - ?, updated_at = ?
                WHERE id = ? AND total_stock >= ?
                "#,
            )
            .bind(item.quantity)
            .bind(now.to_rfc3339())
            .bind(item.product_id.to_string())
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .context("Failed to deduct master stock")?;

            if deducted.rows_affected() == 0 {
                bail!("Insufficient stock for '{}'", item.product_name);
            }

            // Credit the dealership's stock row, creating it on first receipt
            sqlx::query(
                r#"
                INSERT INTO dealer_inventory (
                    id, dealer_id, product_id, product_name, product_model,
                    quantity, reserved_quantity, low_stock_alert,
                    last_restocked, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?)
                ON CONFLICT(dealer_id, product_id) DO UPDATE SET
                    quantity = quantity + excluded.quantity,
                    last_restocked = excluded.last_restocked,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(order.dealer_id.to_string())
            .bind(item.product_id.to_string())
            .bind(&item.product_name)
            .bind(&item.product_model)
            .bind(item.quantity)
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to credit dealer inventory")?;

            // Recompute the low-stock flag on the touched row
            sqlx::query(
                r#"
                UPDATE dealer_inventory
                SET low_stock_alert = CASE
                    WHEN quantity - reserved_quantity <= low_stock_threshold THEN 1
                    ELSE 0
                END
                WHERE dealer_id = ? AND product_id = ?
                "#,
            )
            .bind(order.dealer_id.to_string())
            .bind(item.product_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to recompute low stock flag")?;

            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    id, product_id, dealer_id, movement_type, quantity,
                    reference_id, reference_type, performed_by, notes, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, 'dealer_order', ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(item.product_id.to_string())
            .bind(order.dealer_id.to_string())
            .bind(MovementType::OrderReceived.as_str())
            .bind(item.quantity)
            .bind(order.id.to_string())
            .bind(approver_id.to_string())
            .bind(format!("Dealer order {} approved", order.order_number))
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to record stock movement")?;
        }

        tx.commit().await.context("Failed to commit approval")?;

        self.get_dealer_order(order.id)
            .await?
            .context("Order missing after approval")
    }

    /// Reject a pending dealer order. Returns false if the order already
    /// left the pending state.
    pub async fn reject_dealer_order(
        &self,
        id: Uuid,
        rejection_reason: &str,
        admin_notes: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE dealer_orders
            SET status = 'rejected', rejection_reason = ?, admin_notes = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(rejection_reason)
        .bind(admin_notes)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to reject dealer order")?;

        Ok(result.rows_affected() > 0)
    }

    /// approved -> shipped
    pub async fn mark_dealer_order_shipped(
        &self,
        id: Uuid,
        tracking_number: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE dealer_orders
            SET status = 'shipped', tracking_number = ?, updated_at = ?
            WHERE id = ? AND status = 'approved'
            "#,
        )
        .bind(tracking_number)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to mark order shipped")?;

        Ok(result.rows_affected() > 0)
    }

    /// shipped -> delivered
    pub async fn mark_dealer_order_delivered(&self, id: Uuid) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE dealer_orders
            SET status = 'delivered', actual_delivery = ?, updated_at = ?
            WHERE id = ? AND status = 'shipped'
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to mark order delivered")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_pending_dealer_orders(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM dealer_orders WHERE status = 'pending'")
                .fetch_one(self.pool)
                .await
                .context("Failed to count pending dealer orders")?;
        Ok(count)
    }

    // ---- Customer orders -----------------------------------------------

    pub async fn insert_customer_order(&self, order: &CustomerOrder) -> Result<CustomerOrder> {
        sqlx::query(
            r#"
            INSERT INTO customer_orders (
                id, order_number, customer_id, customer_name, customer_email,
                customer_phone, dealer_id, dealer_name, dealership_name, items,
                total_amount, tax_amount, discount_amount, grand_total,
                payment_status, amount_paid, amount_remaining, status,
                delivery_address, delivery_city, delivery_state, delivery_pincode,
                is_home_delivery, customer_notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(&order.order_number)
        .bind(order.customer_id.to_string())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.dealer_id.to_string())
        .bind(&order.dealer_name)
        .bind(&order.dealership_name)
        .bind(serde_json::to_string(&order.items)?)
        .bind(order.total_amount)
        .bind(order.tax_amount)
        .bind(order.discount_amount)
        .bind(order.grand_total)
        .bind(order.payment_status.as_str())
        .bind(order.amount_paid)
        .bind(order.amount_remaining)
        .bind(order.status.as_str())
        .bind(&order.delivery_address)
        .bind(&order.delivery_city)
        .bind(&order.delivery_state)
        .bind(&order.delivery_pincode)
        .bind(order.is_home_delivery)
        .bind(&order.customer_notes)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to create customer order")?;

        self.get_customer_order(order.id)
            .await?
            .context("Failed to retrieve created customer order")
    }

    pub async fn get_customer_order(&self, id: Uuid) -> Result<Option<CustomerOrder>> {
        let row =
            sqlx::query_as::<_, CustomerOrderRow>("SELECT * FROM customer_orders WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to get customer order")?;

        Ok(row.map(row_to_customer_order))
    }

    pub async fn list_customer_orders(
        &self,
        scope: OrderScope,
        query: &OrderQuery,
    ) -> Result<Vec<CustomerOrder>> {
        let mut sql = "SELECT * FROM customer_orders WHERE 1=1".to_string();
        match scope {
            OrderScope::All => {}
            OrderScope::Dealer(_) => sql.push_str(" AND dealer_id = ?"),
            OrderScope::Customer(_) => sql.push_str(" AND customer_id = ?"),
        }
        if query.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if query.payment_status.is_some() {
            sql.push_str(" AND payment_status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, CustomerOrderRow>(&sql);
        match scope {
            OrderScope::All => {}
            OrderScope::Dealer(id) | OrderScope::Customer(id) => {
                q = q.bind(id.to_string());
            }
        }
        if let Some(ref status) = query.status {
            q = q.bind(status);
        }
        if let Some(ref payment_status) = query.payment_status {
            q = q.bind(payment_status);
        }
        q = q
            .bind(query.limit.unwrap_or(20).clamp(1, 100))
            .bind(query.offset.unwrap_or(0).max(0));

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list customer orders")?;

        Ok(rows.into_iter().map(row_to_customer_order).collect())
    }

    pub async fn update_customer_order_status(
        &self,
        id: Uuid,
        status: CustomerOrderStatus,
        dealer_notes: Option<&str>,
        cancellation_reason: Option<&str>,
        processor_id: Uuid,
        processor_name: &str,
    ) -> Result<Option<CustomerOrder>> {
        let now = Utc::now();
        let delivery_date = matches!(status, CustomerOrderStatus::Delivered)
            .then(|| now.to_rfc3339());

        sqlx::query(
            r#"
            UPDATE customer_orders
            SET status = ?,
                dealer_notes = COALESCE(?, dealer_notes),
                cancellation_reason = COALESCE(?, cancellation_reason),
                delivery_date = COALESCE(?, delivery_date),
                processed_by = COALESCE(processed_by, ?),
                processed_by_name = COALESCE(processed_by_name, ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(dealer_notes)
        .bind(cancellation_reason)
        .bind(delivery_date)
        .bind(processor_id.to_string())
        .bind(processor_name)
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update customer order status")?;

        self.get_customer_order(id).await
    }

    /// Record an additional payment. The amounts and the derived payment
    /// state are recomputed in one statement.
    pub async fn record_customer_order_payment(
        &self,
        id: Uuid,
        additional_payment: f64,
    ) -> Result<Option<CustomerOrder>> {
        sqlx::query(
            r#"
            UPDATE customer_orders
            SET amount_paid = amount_paid + ?,
                amount_remaining = grand_total - (amount_paid + ?),
                payment_status = CASE
                    WHEN amount_paid + ? >= grand_total THEN 'completed'
                    WHEN amount_paid + ? > 0 THEN 'partial'
                    ELSE 'pending'
                END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(additional_payment)
        .bind(additional_payment)
        .bind(additional_payment)
        .bind(additional_payment)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to record payment")?;

        self.get_customer_order(id).await
    }
}

fn row_to_dealer_order(row: DealerOrderRow) -> DealerOrder {
    DealerOrder {
        id: parse_db_uuid(&row.id),
        order_number: row.order_number,
        dealer_id: parse_db_uuid(&row.dealer_id),
        dealer_name: row.dealer_name,
        dealer_email: row.dealer_email,
        dealer_phone: row.dealer_phone,
        items: parse_json_column::<Vec<OrderItem>>(Some(&row.items)),
        total_amount: row.total_amount,
        tax_amount: row.tax_amount,
        grand_total: row.grand_total,
        status: row.status.parse().unwrap_or(DealerOrderStatus::Pending),
        approved_by: parse_opt_uuid(row.approved_by.as_deref()),
        approved_by_name: row.approved_by_name,
        approval_date: parse_opt_timestamp(row.approval_date.as_deref()),
        rejection_reason: row.rejection_reason,
        expected_delivery: parse_opt_timestamp(row.expected_delivery.as_deref()),
        actual_delivery: parse_opt_timestamp(row.actual_delivery.as_deref()),
        tracking_number: row.tracking_number,
        shipping_address: row.shipping_address,
        dealer_notes: row.dealer_notes,
        admin_notes: row.admin_notes,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

fn row_to_customer_order(row: CustomerOrderRow) -> CustomerOrder {
    CustomerOrder {
        id: parse_db_uuid(&row.id),
        order_number: row.order_number,
        customer_id: parse_db_uuid(&row.customer_id),
        customer_name: row.customer_name,
        customer_email: row.customer_email,
        customer_phone: row.customer_phone,
        dealer_id: parse_db_uuid(&row.dealer_id),
        dealer_name: row.dealer_name,
        dealership_name: row.dealership_name,
        items: parse_json_column::<Vec<OrderItem>>(Some(&row.items)),
        total_amount: row.total_amount,
        tax_amount: row.tax_amount,
        discount_amount: row.discount_amount,
        grand_total: row.grand_total,
        payment_status: row.payment_status.parse().unwrap_or(PaymentProgress::Pending),
        amount_paid: row.amount_paid,
        amount_remaining: row.amount_remaining,
        status: row.status.parse().unwrap_or(CustomerOrderStatus::Pending),
        delivery_address: row.delivery_address,
        delivery_city: row.delivery_city,
        delivery_state: row.delivery_state,
        delivery_pincode: row.delivery_pincode,
        delivery_date: parse_opt_timestamp(row.delivery_date.as_deref()),
        is_home_delivery: row.is_home_delivery != 0,
        customer_notes: row.customer_notes,
        dealer_notes: row.dealer_notes,
        cancellation_reason: row.cancellation_reason,
        processed_by: parse_opt_uuid(row.processed_by.as_deref()),
        processed_by_name: row.processed_by_name,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{init_pool, ProductRepository};
    use crate::models::{CreateProductRequest, OrderItem};

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

    async fn seed_product(pool: &SqlitePool, stock: i64) -> Uuid {
        let repo = ProductRepository::new(pool);
        let product = repo
            .create(
                &CreateProductRequest {
                    name: "Lightning Pro".to_string(),
                    slug: format!("lightning-{}", Uuid::new_v4()),
                    model: "LIGHTNING".to_string(),
                    description: None,
                    specifications: None,
                    base_price: 55000.0,
                    dealer_price: 48000.0,
                    mrp: 60000.0,
                    tax_rate: None,
                    service_charges: None,
                    warranty: None,
                    total_stock: Some(stock),
                    low_stock_threshold: None,
                    is_available: None,
                    is_featured: None,
                    category: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        product.id
    }

    fn pending_order(dealer_id: Uuid, product_id: Uuid, quantity: i64) -> DealerOrder {
        let now = Utc::now();
        let subtotal = 48000.0 * quantity as f64;
        DealerOrder {
            id: Uuid::new_v4(),
            order_number: DealerOrder::generate_order_number(),
            dealer_id,
            dealer_name: "VoltRide Pune".to_string(),
            dealer_email: None,
            dealer_phone: None,
            items: vec![OrderItem {
                product_id,
                product_name: "Lightning Pro".to_string(),
                product_model: Some("LIGHTNING".to_string()),
                quantity,
                unit_price: 48000.0,
                subtotal,
            }],
            total_amount: subtotal,
            tax_amount: subtotal * 0.18,
            grand_total: subtotal * 1.18,
            status: DealerOrderStatus::Pending,
            approved_by: None,
            approved_by_name: None,
            approval_date: None,
            rejection_reason: None,
            expected_delivery: None,
            actual_delivery: None,
            tracking_number: None,
            shipping_address: None,
            dealer_notes: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_approval_moves_stock() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let dealer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, 20).await;

        let order = repo
            .insert_dealer_order(&pending_order(dealer_id, product_id, 5))
            .await
            .unwrap();

        let approved = repo
            .approve_dealer_order(&order, Uuid::new_v4(), "Head Office", None, 7)
            .await
            .unwrap();
        assert_eq!(approved.status, DealerOrderStatus::Approved);
        assert!(approved.expected_delivery.is_some());

        let stock: i64 = sqlx::query_scalar("SELECT total_stock FROM products WHERE id = ?")
            .bind(product_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 15);

        let credited: i64 = sqlx::query_scalar(
            "SELECT quantity FROM dealer_inventory WHERE dealer_id = ? AND product_id = ?",
        )
        .bind(dealer_id.to_string())
        .bind(product_id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(credited, 5);
    }

    #[tokio::test]
    async fn test_approval_rejects_overdraw_without_side_effects() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let dealer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, 3).await;

        let order = repo
            .insert_dealer_order(&pending_order(dealer_id, product_id, 5))
            .await
            .unwrap();

        let err = repo
            .approve_dealer_order(&order, Uuid::new_v4(), "Head Office", None, 7)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient stock"));

        // The guarded transaction rolled everything back
        let reloaded = repo.get_dealer_order(order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, DealerOrderStatus::Pending);

        let stock: i64 = sqlx::query_scalar("SELECT total_stock FROM products WHERE id = ?")
            .bind(product_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_double_approval_loses_the_race() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let product_id = seed_product(&pool, 20).await;

        let order = repo
            .insert_dealer_order(&pending_order(Uuid::new_v4(), product_id, 2))
            .await
            .unwrap();

        repo.approve_dealer_order(&order, Uuid::new_v4(), "Head Office", None, 7)
            .await
            .unwrap();
        let err = repo
            .approve_dealer_order(&order, Uuid::new_v4(), "Head Office", None, 7)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no longer pending"));
    }

    #[tokio::test]
    async fn test_shipping_transitions_are_ordered() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let product_id = seed_product(&pool, 20).await;

        let order = repo
            .insert_dealer_order(&pending_order(Uuid::new_v4(), product_id, 2))
            .await
            .unwrap();

        // Cannot ship an unapproved order
        assert!(!repo
            .mark_dealer_order_shipped(order.id, Some("TRK-1"))
            .await
            .unwrap());

        repo.approve_dealer_order(&order, Uuid::new_v4(), "Head Office", None, 7)
            .await
            .unwrap();
        assert!(repo
            .mark_dealer_order_shipped(order.id, Some("TRK-1"))
            .await
            .unwrap());
        assert!(repo.mark_dealer_order_delivered(order.id).await.unwrap());

        let delivered = repo.get_dealer_order(order.id).await.unwrap().unwrap();
        assert_eq!(delivered.status, DealerOrderStatus::Delivered);
        assert!(delivered.actual_delivery.is_some());
    }

    #[tokio::test]
    async fn test_customer_order_payment_progression() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let now = Utc::now();

        let order = CustomerOrder {
            id: Uuid::new_v4(),
            order_number: CustomerOrder::generate_order_number(),
            customer_id: Uuid::new_v4(),
            customer_name: "Asha Verma".to_string(),
            customer_email: None,
            customer_phone: "9876543210".to_string(),
            dealer_id: Uuid::new_v4(),
            dealer_name: "VoltRide Pune".to_string(),
            dealership_name: None,
            items: vec![],
            total_amount: 1000.0,
            tax_amount: 180.0,
            discount_amount: 0.0,
            grand_total: 1180.0,
            payment_status: PaymentProgress::Pending,
            amount_paid: 0.0,
            amount_remaining: 1180.0,
            status: CustomerOrderStatus::Pending,
            delivery_address: None,
            delivery_city: None,
            delivery_state: None,
            delivery_pincode: None,
            delivery_date: None,
            is_home_delivery: false,
            customer_notes: None,
            dealer_notes: None,
            cancellation_reason: None,
            processed_by: None,
            processed_by_name: None,
            created_at: now,
            updated_at: now,
        };
        repo.insert_customer_order(&order).await.unwrap();

        let partial = repo
            .record_customer_order_payment(order.id, 500.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(partial.payment_status, PaymentProgress::Partial);
        assert_eq!(partial.amount_remaining, 680.0);

        let completed = repo
            .record_customer_order_payment(order.id, 680.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.payment_status, PaymentProgress::Completed);
        assert_eq!(completed.amount_remaining, 0.0);
    }

    #[tokio::test]
    async fn test_status_update_stamps_first_processor() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let now = Utc::now();
        let order = CustomerOrder {
            id: Uuid::new_v4(),
            order_number: CustomerOrder::generate_order_number(),
            customer_id: Uuid::new_v4(),
            customer_name: "Asha Verma".to_string(),
            customer_email: None,
            customer_phone: "9876543210".to_string(),
            dealer_id: Uuid::new_v4(),
            dealer_name: "VoltRide Pune".to_string(),
            dealership_name: None,
            items: vec![],
            total_amount: 100.0,
            tax_amount: 18.0,
            discount_amount: 0.0,
            grand_total: 118.0,
            payment_status: PaymentProgress::Pending,
            amount_paid: 0.0,
            amount_remaining: 118.0,
            status: CustomerOrderStatus::Pending,
            delivery_address: None,
            delivery_city: None,
            delivery_state: None,
            delivery_pincode: None,
            delivery_date: None,
            is_home_delivery: false,
            customer_notes: None,
            dealer_notes: None,
            cancellation_reason: None,
            processed_by: None,
            processed_by_name: None,
            created_at: now,
            updated_at: now,
        };
        repo.insert_customer_order(&order).await.unwrap();

        let first = Uuid::new_v4();
        let updated = repo
            .update_customer_order_status(
                order.id,
                CustomerOrderStatus::Confirmed,
                None,
                None,
                first,
                "Ravi",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.processed_by, Some(first));

        // A later update does not steal the processor stamp
        let updated = repo
            .update_customer_order_status(
                order.id,
                CustomerOrderStatus::Delivered,
                None,
                None,
                Uuid::new_v4(),
                "Meena",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.processed_by, Some(first));
        assert!(updated.delivery_date.is_some());
    }
}
