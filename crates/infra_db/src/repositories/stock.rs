//! Product stock repository
//!
//! `stock_quantity` is only ever changed through the guarded updates in this
//! module, inside a bill transaction that already holds the row lock.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for product stock reads
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    /// Creates a new StockRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Products with fewer than `threshold` units, lowest stock first
    pub async fn below_threshold(&self, threshold: i64) -> Result<Vec<ProductStockRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ProductStockRow>(
            r#"
            SELECT product_id, unique_code, name, price, stock_quantity
            FROM products
            WHERE stock_quantity < $1
            ORDER BY stock_quantity ASC, unique_code ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Locks the given product rows in ascending id order
///
/// Ids that match no product are absent from the result.
pub async fn lock_products(conn: &mut PgConnection, product_ids: &[Uuid]) -> Result<Vec<ProductStockRow>, DatabaseError> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ProductStockRow>(
        r#"
        SELECT product_id, unique_code, name, price, stock_quantity
        FROM products
        WHERE product_id = ANY($1)
        ORDER BY product_id
        FOR UPDATE
        "#,
    )
    .bind(product_ids)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Removes units if enough remain; returns false otherwise
pub async fn decrement(conn: &mut PgConnection, product_id: Uuid, quantity: i32) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - $2
        WHERE product_id = $1 AND stock_quantity >= $2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Adds units back; returns false if the product no longer exists
pub async fn increment(conn: &mut PgConnection, product_id: Uuid, quantity: i32) -> Result<bool, DatabaseError> {
    let result = sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2 WHERE product_id = $1")
        .bind(product_id)
        .bind(quantity)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Database row for product stock
#[derive(Debug, Clone, FromRow)]
pub struct ProductStockRow {
    pub product_id: Uuid,
    pub unique_code: String,
    pub name: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}
