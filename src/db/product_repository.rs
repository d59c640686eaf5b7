//! Product catalogue repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::{CreateProductRequest, Product, UpdateProductRequest, MAX_STOCK};

use super::{now_timestamp, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    nev: String,
    cikkszam: String,
    leiras: Option<String>,
    mennyiseg: i64,
    ar: i64,
    created_at: String,
    updated_at: String,
}

/// Outcome of a stock change
#[derive(Debug, Clone, PartialEq)]
pub enum StockAdjustment {
    Applied(Product),
    /// The change would take stock below zero; nothing was written
    Insufficient { available: i64 },
    /// The change would take stock above [`MAX_STOCK`]; nothing was written
    OverCapacity { available: i64 },
    NotFound,
}

const PRODUCT_COLUMNS: &str = "id, nev, cikkszam, leiras, mennyiseg, ar, created_at, updated_at";

pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY nev, id", PRODUCT_COLUMNS);
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await
            .context("Failed to list products")?;

        rows.into_iter().map(row_to_product).collect()
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to get product")?;

        row.map(row_to_product).transpose()
    }

    pub async fn create(&self, req: &CreateProductRequest) -> Result<Product> {
        let now = now_timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO products (nev, cikkszam, leiras, mennyiseg, ar, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.nev)
        .bind(&req.cikkszam)
        .bind(&req.leiras)
        .bind(req.mennyiseg)
        .bind(req.ar)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create product")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .context("Failed to retrieve created product")
    }

    pub async fn update(&self, id: i64, req: &UpdateProductRequest) -> Result<Option<Product>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let nev = req.nev.clone().unwrap_or(existing.nev);
        let cikkszam = req.cikkszam.clone().unwrap_or(existing.cikkszam);
        let leiras = req.leiras.clone().or(existing.leiras);
        let ar = req.ar.unwrap_or(existing.ar);

        sqlx::query(
            r#"
            UPDATE products
            SET nev = ?, cikkszam = ?, leiras = ?, ar = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&nev)
        .bind(&cikkszam)
        .bind(&leiras)
        .bind(ar)
        .bind(now_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to update product")?;

        self.get_by_id(id).await
    }

    /// Add `valtozas` (possibly negative) to the stock in one statement.
    ///
    /// The guard lives in the `WHERE` clause so concurrent adjustments can
    /// never leave the quantity outside `0..=MAX_STOCK`. Both sides of the
    /// comparison stay within `i64`, so SQLite never falls back to REAL.
    pub async fn adjust_stock(&self, id: i64, valtozas: i64) -> Result<StockAdjustment> {
        let (floor, ceiling) = (0i64.checked_sub(valtozas), MAX_STOCK.checked_sub(valtozas));

        let updated = match (floor, ceiling) {
            (Some(floor), Some(ceiling)) => sqlx::query(
                r#"
                UPDATE products
                SET mennyiseg = mennyiseg + ?, updated_at = ?
                WHERE id = ? AND mennyiseg >= ? AND mennyiseg <= ?
                "#,
            )
            .bind(valtozas)
            .bind(now_timestamp())
            .bind(id)
            .bind(floor)
            .bind(ceiling)
            .execute(self.pool)
            .await
            .context("Failed to adjust stock")?
            .rows_affected(),
            _ => 0,
        };

        let current = self.get_by_id(id).await?;
        Ok(match (updated, current) {
            (_, None) => StockAdjustment::NotFound,
            (0, Some(product))
                if product
                    .mennyiseg
                    .checked_add(valtozas)
                    .map_or(true, |n| n > MAX_STOCK) =>
            {
                StockAdjustment::OverCapacity {
                    available: product.mennyiseg,
                }
            }
            (0, Some(product)) => StockAdjustment::Insufficient {
                available: product.mennyiseg,
            },
            (_, Some(product)) => StockAdjustment::Applied(product),
        })
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete product")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_product(row: ProductRow) -> Result<Product> {
    Ok(Product {
        id: row.id,
        nev: row.nev,
        cikkszam: row.cikkszam,
        leiras: row.leiras,
        mennyiseg: row.mennyiseg,
        ar: row.ar,
        created_at: parse_db_timestamp(&row.created_at)?,
        updated_at: parse_db_timestamp(&row.updated_at)?,
    })
}
