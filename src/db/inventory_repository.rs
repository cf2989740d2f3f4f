//! Dealer inventory repository
//!
//! Stock mutations are guarded single-statement updates: an update that
//! would overdraw available stock affects zero rows and the caller gets a
//! conflict instead of a corrupted quantity.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_opt_timestamp, parse_opt_uuid};
use crate::models::{
    AdjustInventoryRequest, DealerInventory, InventoryQuery, InventoryTransaction, TransactionType,
};

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    id: String,
    dealer_id: String,
    product_id: String,
    product_name: Option<String>,
    product_model: Option<String>,
    quantity: i64,
    reserved_quantity: i64,
    low_stock_threshold: i64,
    low_stock_alert: i64,
    last_restocked: Option<String>,
    last_sold: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    dealer_id: String,
    product_id: String,
    product_name: Option<String>,
    transaction_type: String,
    quantity_change: i64,
    quantity_before: i64,
    quantity_after: i64,
    order_id: Option<String>,
    performed_by: Option<String>,
    performed_by_name: Option<String>,
    notes: Option<String>,
    created_at: String,
}

pub struct InventoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InventoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<DealerInventory>> {
        let row = sqlx::query_as::<_, InventoryRow>("SELECT * FROM dealer_inventory WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to get inventory item")?;

        Ok(row.map(row_to_inventory))
    }

    pub async fn get_by_dealer_product(
        &self,
        dealer_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<DealerInventory>> {
        let row = sqlx::query_as::<_, InventoryRow>(
            "SELECT * FROM dealer_inventory WHERE dealer_id = ? AND product_id = ?",
        )
        .bind(dealer_id.to_string())
        .bind(product_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get inventory row")?;

        Ok(row.map(row_to_inventory))
    }

    pub async fn list_for_dealer(
        &self,
        dealer_id: Uuid,
        query: &InventoryQuery,
    ) -> Result<Vec<DealerInventory>> {
        let mut sql = "SELECT * FROM dealer_inventory WHERE dealer_id = ?".to_string();
        if query.low_stock == Some(true) {
            sql.push_str(" AND low_stock_alert = 1");
        }
        sql.push_str(" ORDER BY updated_at DESC LIMIT ? OFFSET ?");

        let rows = sqlx::query_as::<_, InventoryRow>(&sql)
            .bind(dealer_id.to_string())
            .bind(query.limit.unwrap_or(50).clamp(1, 200))
            .bind(query.offset.unwrap_or(0).max(0))
            .fetch_all(self.pool)
            .await
            .context("Failed to list dealer inventory")?;

        Ok(rows.into_iter().map(row_to_inventory).collect())
    }

    /// Admin view across all dealerships, optionally filtered by dealer
    pub async fn list_all(&self, query: &InventoryQuery) -> Result<Vec<DealerInventory>> {
        let mut sql = "SELECT * FROM dealer_inventory WHERE 1=1".to_string();
        if query.dealer_id.is_some() {
            sql.push_str(" AND dealer_id = ?");
        }
        if query.low_stock == Some(true) {
            sql.push_str(" AND low_stock_alert = 1");
        }
        sql.push_str(" ORDER BY updated_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, InventoryRow>(&sql);
        if let Some(dealer_id) = query.dealer_id {
            q = q.bind(dealer_id.to_string());
        }
        let rows = q
            .bind(query.limit.unwrap_or(50).clamp(1, 200))
            .bind(query.offset.unwrap_or(0).max(0))
            .fetch_all(self.pool)
            .await
            .context("Failed to list inventories")?;

        Ok(rows.into_iter().map(row_to_inventory).collect())
    }

    /// Manual adjustment by the dealer. Applies the signed change with a
    /// non-negative guard and writes the audit row in one transaction.
    pub async fn adjust(
        &self,
        item: &DealerInventory,
        req: &AdjustInventoryRequest,
        performed_by: Uuid,
        performed_by_name: &str,
    ) -> Result<DealerInventory> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        // SET expressions see pre-update values, so the low-stock flag must
        // fold the delta in explicitly
        let updated = sqlx::query(
            r#"
            UPDATE dealer_inventory
            SET quantity = quantity + ?,
                updated_at = ?,
                low_stock_alert = CASE
                    WHEN (quantity + ?) - reserved_quantity <= low_stock_threshold THEN 1
                    ELSE 0
                END
            WHERE id = ? AND quantity + ? >= 0
            "#,
        )
        .bind(req.quantity_change)
        .bind(&now)
        .bind(req.quantity_change)
        .bind(item.id.to_string())
        .bind(req.quantity_change)
        .execute(&mut *tx)
        .await
        .context("Failed to adjust inventory")?;

        if updated.rows_affected() == 0 {
            bail!("Insufficient stock. Current: {}", item.quantity);
        }

        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, dealer_id, product_id, product_name, transaction_type,
                quantity_change, quantity_before, quantity_after,
                performed_by, performed_by_name, notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(item.dealer_id.to_string())
        .bind(item.product_id.to_string())
        .bind(&item.product_name)
        .bind(req.transaction_type.as_str())
        .bind(req.quantity_change)
        .bind(item.quantity)
        .bind(item.quantity + req.quantity_change)
        .bind(performed_by.to_string())
        .bind(performed_by_name)
        .bind(&req.notes)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to record inventory transaction")?;

        tx.commit().await.context("Failed to commit adjustment")?;

        self.get_by_id(item.id)
            .await?
            .context("Inventory row missing after adjustment")
    }

    /// Reserve stock for an order; fails if available stock is short.
    pub async fn reserve(&self, dealer_id: Uuid, product_id: Uuid, quantity: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE dealer_inventory
            SET reserved_quantity = reserved_quantity + ?,
                updated_at = ?,
                low_stock_alert = CASE
                    WHEN quantity - (reserved_quantity + ?) <= low_stock_threshold THEN 1
                    ELSE 0
                END
            WHERE dealer_id = ? AND product_id = ?
              AND quantity - reserved_quantity >= ?
            "#,
        )
        .bind(quantity)
        .bind(Utc::now().to_rfc3339())
        .bind(quantity)
        .bind(dealer_id.to_string())
        .bind(product_id.to_string())
        .bind(quantity)
        .execute(self.pool)
        .await
        .context("Failed to reserve stock")?;

        Ok(result.rows_affected() > 0)
    }

    /// Release previously reserved stock
    pub async fn release(&self, dealer_id: Uuid, product_id: Uuid, quantity: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE dealer_inventory
            SET reserved_quantity = MAX(0, reserved_quantity - ?),
                updated_at = ?,
                low_stock_alert = CASE
                    WHEN quantity - MAX(0, reserved_quantity - ?) <= low_stock_threshold THEN 1
                    ELSE 0
                END
            WHERE dealer_id = ? AND product_id = ?
            "#,
        )
        .bind(quantity)
        .bind(Utc::now().to_rfc3339())
        .bind(quantity)
        .bind(dealer_id.to_string())
        .bind(product_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to release stock")?;

        Ok(())
    }

    pub async fn transactions_for_item(
        &self,
        dealer_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM inventory_transactions \
             WHERE dealer_id = ? AND product_id = ? \
             ORDER BY created_at DESC",
        )
        .bind(dealer_id.to_string())
        .bind(product_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to load inventory transactions")?;

        Ok(rows.into_iter().map(row_to_transaction).collect())
    }
}

fn row_to_inventory(row: InventoryRow) -> DealerInventory {
    DealerInventory {
        id: parse_db_uuid(&row.id),
        dealer_id: parse_db_uuid(&row.dealer_id),
        product_id: parse_db_uuid(&row.product_id),
        product_name: row.product_name,
        product_model: row.product_model,
        quantity: row.quantity,
        reserved_quantity: row.reserved_quantity,
        low_stock_threshold: row.low_stock_threshold,
        low_stock_alert: row.low_stock_alert != 0,
        last_restocked: parse_opt_timestamp(row.last_restocked.as_deref()),
        last_sold: parse_opt_timestamp(row.last_sold.as_deref()),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

fn row_to_transaction(row: TransactionRow) -> InventoryTransaction {
    InventoryTransaction {
        id: parse_db_uuid(&row.id),
        dealer_id: parse_db_uuid(&row.dealer_id),
        product_id: parse_db_uuid(&row.product_id),
        product_name: row.product_name,
        transaction_type: row
            .transaction_type
            .parse()
            .unwrap_or(TransactionType::Adjustment),
        quantity_change: row.quantity_change,
        quantity_before: row.quantity_before,
        quantity_after: row.quantity_after,
        order_id: parse_opt_uuid(row.order_id.as_deref()),
        performed_by: parse_opt_uuid(row.performed_by.as_deref()),
        performed_by_name: row.performed_by_name,
        notes: row.notes,
        created_at: parse_db_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_pool;

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

    async fn seed_row(pool: &SqlitePool, dealer_id: Uuid, product_id: Uuid, quantity: i64) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO dealer_inventory \
             (id, dealer_id, product_id, product_name, quantity, reserved_quantity, \
              low_stock_threshold, low_stock_alert, created_at, updated_at) \
             VALUES (?, ?, ?, 'Lightning Pro', ?, 0, 5, 0, ?, ?)",
        )
        .bind(id.to_string())
        .bind(dealer_id.to_string())
        .bind(product_id.to_string())
        .bind(quantity)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_adjust_records_audit_row() {
        let pool = test_pool().await;
        let repo = InventoryRepository::new(&pool);
        let dealer_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let id = seed_row(&pool, dealer_id, product_id, 10).await;

        let item = repo.get_by_id(id).await.unwrap().unwrap();
        let adjusted = repo
            .adjust(
                &item,
                &AdjustInventoryRequest {
                    quantity_change: -2,
                    transaction_type: TransactionType::Damage,
                    notes: Some("damaged in transit".to_string()),
                },
                Uuid::new_v4(),
                "Dealer",
            )
            .await
            .unwrap();
        assert_eq!(adjusted.quantity, 8);

        let txs = repo.transactions_for_item(dealer_id, product_id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].transaction_type, TransactionType::Damage);
        assert_eq!(txs[0].quantity_before, 10);
        assert_eq!(txs[0].quantity_after, 8);
    }

    #[tokio::test]
    async fn test_adjust_rejects_negative_result() {
        let pool = test_pool().await;
        let repo = InventoryRepository::new(&pool);
        let id = seed_row(&pool, Uuid::new_v4(), Uuid::new_v4(), 3).await;

        let item = repo.get_by_id(id).await.unwrap().unwrap();
        let err = repo
            .adjust(
                &item,
                &AdjustInventoryRequest {
                    quantity_change: -5,
                    transaction_type: TransactionType::Adjustment,
                    notes: None,
                },
                Uuid::new_v4(),
                "Dealer",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient stock"));

        // No audit row and no change
        let reloaded = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.quantity, 3);
        assert!(repo
            .transactions_for_item(item.dealer_id, item.product_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let pool = test_pool().await;
        let repo = InventoryRepository::new(&pool);
        let dealer_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let id = seed_row(&pool, dealer_id, product_id, 4).await;

        assert!(repo.reserve(dealer_id, product_id, 3).await.unwrap());
        // Only one unit left available
        assert!(!repo.reserve(dealer_id, product_id, 2).await.unwrap());

        let row = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.reserved_quantity, 3);
        assert_eq!(row.available_quantity(), 1);
        // Reserving down to threshold raised the alert
        assert!(row.low_stock_alert);

        repo.release(dealer_id, product_id, 3).await.unwrap();
        let row = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.reserved_quantity, 0);
        assert_eq!(row.available_quantity(), 4);
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let pool = test_pool().await;
        let repo = InventoryRepository::new(&pool);
        let dealer_id = Uuid::new_v4();
        seed_row(&pool, dealer_id, Uuid::new_v4(), 20).await;
        let low_id = seed_row(&pool, dealer_id, Uuid::new_v4(), 6).await;

        // Drop one row under its threshold via a guarded adjustment
        let item = repo.get_by_id(low_id).await.unwrap().unwrap();
        repo.adjust(
            &item,
            &AdjustInventoryRequest {
                quantity_change: -3,
                transaction_type: TransactionType::Adjustment,
                notes: None,
            },
            Uuid::new_v4(),
            "Dealer",
        )
        .await
        .unwrap();

        let low_stock = repo
            .list_for_dealer(
                dealer_id,
                &InventoryQuery {
                    low_stock: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(low_stock.len(), 1);
        assert_eq!(low_stock[0].id, low_id);
    }
}
