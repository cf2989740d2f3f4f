//! Product catalog repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_opt_uuid};
use crate::models::{
    CreateProductRequest, MovementType, Product, ProductQuery, ProductSpecifications,
    ProductStockLine, ServiceCharges, StockMovement, StockOverview, UpdateProductRequest,
    WarrantyPolicy,
};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    slug: String,
    model: String,
    description: Option<String>,
    specifications: Option<String>,
    base_price: f64,
    dealer_price: f64,
    mrp: f64,
    tax_rate: f64,
    service_charges: String,
    warranty: String,
    total_stock: i64,
    low_stock_threshold: i64,
    is_available: i64,
    is_featured: i64,
    category: Option<String>,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StockMovementRow {
    id: String,
    product_id: String,
    dealer_id: Option<String>,
    movement_type: String,
    quantity: i64,
    reference_id: Option<String>,
    reference_type: Option<String>,
    performed_by: Option<String>,
    previous_stock: Option<i64>,
    new_stock: Option<i64>,
    notes: Option<String>,
    created_at: String,
}

const PRODUCT_COLUMNS: &str = "id, name, slug, model, description, specifications, \
     base_price, dealer_price, mrp, tax_rate, service_charges, warranty, \
     total_stock, low_stock_threshold, is_available, is_featured, category, \
     created_by, created_at, updated_at";

pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {} FROM products WHERE 1=1", PRODUCT_COLUMNS);

        if query.category.is_some() {
            sql.push_str(" AND category = ?");
        }
        if query.available_only == Some(true) {
            sql.push_str(" AND is_available = 1");
        }
        if query.featured_only == Some(true) {
            sql.push_str(" AND is_featured = 1");
        }
        if query.search.is_some() {
            sql.push_str(" AND name LIKE ? COLLATE NOCASE");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, ProductRow>(&sql);
        if let Some(ref category) = query.category {
            q = q.bind(category);
        }
        if let Some(ref search) = query.search {
            q = q.bind(format!("%{}%", search));
        }
        q = q
            .bind(query.limit.unwrap_or(50).clamp(1, 200))
            .bind(query.offset.unwrap_or(0).max(0));

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list products")?;

        Ok(rows.into_iter().map(row_to_product).collect())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to get product")?;

        Ok(row.map(row_to_product))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE slug = ?", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await
            .context("Failed to get product by slug")?;

        Ok(row.map(row_to_product))
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE slug = ?")
            .bind(slug)
            .fetch_one(self.pool)
            .await
            .context("Failed to check slug")?;
        Ok(count > 0)
    }

    pub async fn create(&self, req: &CreateProductRequest, created_by: Uuid) -> Result<Product> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let specifications = req
            .specifications
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let service_charges =
            serde_json::to_string(&req.service_charges.clone().unwrap_or_default())?;
        let warranty = serde_json::to_string(&req.warranty.clone().unwrap_or_default())?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, slug, model, description, specifications,
                base_price, dealer_price, mrp, tax_rate, service_charges, warranty,
                total_stock, low_stock_threshold, is_available, is_featured,
                category, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.model)
        .bind(&req.description)
        .bind(&specifications)
        .bind(req.base_price)
        .bind(req.dealer_price)
        .bind(req.mrp)
        .bind(req.tax_rate.unwrap_or(18.0))
        .bind(&service_charges)
        .bind(&warranty)
        .bind(req.total_stock.unwrap_or(0))
        .bind(req.low_stock_threshold.unwrap_or(10))
        .bind(req.is_available.unwrap_or(true))
        .bind(req.is_featured.unwrap_or(false))
        .bind(&req.category)
        .bind(created_by.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create product")?;

        self.get_by_id(id)
            .await?
            .context("Failed to retrieve created product")
    }

    pub async fn update(&self, id: Uuid, req: &UpdateProductRequest) -> Result<Option<Product>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let specifications = req
            .specifications
            .clone()
            .or(existing.specifications)
            .map(|s| serde_json::to_string(&s))
            .transpose()?;
        let service_charges = serde_json::to_string(
            &req.service_charges
                .clone()
                .unwrap_or(existing.service_charges),
        )?;
        let warranty = serde_json::to_string(&req.warranty.clone().unwrap_or(existing.warranty))?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, specifications = ?,
                base_price = ?, dealer_price = ?, mrp = ?, tax_rate = ?,
                service_charges = ?, warranty = ?,
                total_stock = ?, low_stock_threshold = ?,
                is_available = ?, is_featured = ?, category = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.name.clone().unwrap_or(existing.name))
        .bind(req.description.clone().or(existing.description))
        .bind(&specifications)
        .bind(req.base_price.unwrap_or(existing.base_price))
        .bind(req.dealer_price.unwrap_or(existing.dealer_price))
        .bind(req.mrp.unwrap_or(existing.mrp))
        .bind(req.tax_rate.unwrap_or(existing.tax_rate))
        .bind(&service_charges)
        .bind(&warranty)
        .bind(req.total_stock.unwrap_or(existing.total_stock))
        .bind(
            req.low_stock_threshold
                .unwrap_or(existing.low_stock_threshold),
        )
        .bind(req.is_available.unwrap_or(existing.is_available))
        .bind(req.is_featured.unwrap_or(existing.is_featured))
        .bind(req.category.clone().or(existing.category))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update product")?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete product")?;

        Ok(result.rows_affected() > 0)
    }

    /// Admin rollup of master stock across the catalog
    pub async fn stock_overview(&self) -> Result<StockOverview> {
        let rows = sqlx::query(
            "SELECT id, name, model, total_stock, low_stock_threshold, is_available \
             FROM products ORDER BY total_stock ASC",
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to load stock overview")?;

        let mut products = Vec::with_capacity(rows.len());
        let mut total_units = 0i64;
        let mut low_stock_products = 0i64;
        let mut unavailable_products = 0i64;

        for row in &rows {
            let total_stock: i64 = row.get("total_stock");
            let threshold: i64 = row.get("low_stock_threshold");
            let is_available: i64 = row.get("is_available");
            let low_stock = total_stock <= threshold;

            total_units += total_stock;
            if low_stock {
                low_stock_products += 1;
            }
            if is_available == 0 {
                unavailable_products += 1;
            }

            products.push(ProductStockLine {
                product_id: parse_db_uuid(row.get("id")),
                name: row.get("name"),
                model: row.get("model"),
                total_stock,
                low_stock,
                is_available: is_available != 0,
            });
        }

        Ok(StockOverview {
            total_products: rows.len() as i64,
            total_units,
            low_stock_products,
            unavailable_products,
            products,
        })
    }

    /// Master-stock movement audit trail for a product, newest first
    pub async fn stock_movements(&self, product_id: Uuid) -> Result<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovementRow>(
            "SELECT * FROM stock_movements WHERE product_id = ? ORDER BY created_at DESC",
        )
        .bind(product_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to load stock movements")?;

        Ok(rows
            .into_iter()
            .map(|row| StockMovement {
                id: parse_db_uuid(&row.id),
                product_id: parse_db_uuid(&row.product_id),
                dealer_id: parse_opt_uuid(row.dealer_id.as_deref()),
                movement_type: row
                    .movement_type
                    .parse()
                    .unwrap_or(MovementType::Adjustment),
                quantity: row.quantity,
                reference_id: parse_opt_uuid(row.reference_id.as_deref()),
                reference_type: row.reference_type,
                performed_by: parse_opt_uuid(row.performed_by.as_deref()),
                previous_stock: row.previous_stock,
                new_stock: row.new_stock,
                notes: row.notes,
                created_at: parse_db_timestamp(&row.created_at),
            })
            .collect())
    }
}

fn row_to_product(row: ProductRow) -> Product {
    Product {
        id: parse_db_uuid(&row.id),
        name: row.name,
        slug: row.slug,
        model: row.model,
        description: row.description,
        specifications: row
            .specifications
            .as_deref()
            .and_then(|s| serde_json::from_str::<ProductSpecifications>(s).ok()),
        base_price: row.base_price,
        dealer_price: row.dealer_price,
        mrp: row.mrp,
        tax_rate: row.tax_rate,
        service_charges: serde_json::from_str::<ServiceCharges>(&row.service_charges)
            .unwrap_or_default(),
        warranty: serde_json::from_str::<WarrantyPolicy>(&row.warranty).unwrap_or_default(),
        total_stock: row.total_stock,
        low_stock_threshold: row.low_stock_threshold,
        is_available: row.is_available != 0,
        is_featured: row.is_featured != 0,
        category: row.category,
        created_by: parse_opt_uuid(row.created_by.as_deref()),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
