//! Bill repository implementation
//!
//! Read queries run against the pool and only see committed bills. The
//! write-side functions take a connection borrowed from an open transaction
//! so the bill transaction engine controls where the unit of work ends.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use domain_billing::{Bill, BillItem, PaymentStatus};

use crate::error::DatabaseError;

/// Advisory lock key serializing bill number allocation ("BILL")
pub const BILL_NUMBER_LOCK_KEY: i64 = 0x4249_4C4C;

const BILL_COLUMNS: &str = r#"
    b.bill_id,
    b.bill_number,
    b.customer_id,
    b.subtotal,
    b.tax_amount,
    b.discount_amount,
    b.total_amount,
    b.payment_status,
    b.notes,
    b.created_at
"#;

/// Repository for bill headers and lines
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    /// Creates a new BillRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists every bill, newest first, with the customer's name
    pub async fn list(&self) -> Result<Vec<BillSummaryRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {BILL_COLUMNS}, COALESCE(c.name, '') AS customer_name
            FROM bills b
            LEFT JOIN customers c ON c.customer_id = b.customer_id
            ORDER BY b.created_at DESC, b.bill_id DESC
            "#
        );

        let rows = sqlx::query_as::<_, BillSummaryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Fetches a bill header with its lines
    ///
    /// Both reads run in one read-only transaction so the header and lines
    /// come from the same snapshot.
    pub async fn find(&self, bill_id: Uuid) -> Result<Option<BillWithItems>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {BILL_COLUMNS}, c.name AS customer_name
            FROM bills b
            LEFT JOIN customers c ON c.customer_id = b.customer_id
            WHERE b.bill_id = $1
            "#
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let header = sqlx::query_as::<_, BillDetailRow>(&sql)
            .bind(bill_id)
            .fetch_optional(&mut *tx)
            .await?;

        let result = match header {
            Some(header) => {
                let items = items_of(&mut tx, bill_id).await?;
                Some(BillWithItems { header, items })
            }
            None => None,
        };

        tx.commit().await?;
        Ok(result)
    }
}

/// Looks up a customer's name
pub async fn customer_name(conn: &mut PgConnection, customer_id: Uuid) -> Result<Option<String>, DatabaseError> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM customers WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;

    Ok(name)
}

/// Takes the transaction-scoped numbering lock and reads every bill number
pub async fn lock_bill_numbers(conn: &mut PgConnection) -> Result<Vec<String>, DatabaseError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(BILL_NUMBER_LOCK_KEY)
        .execute(&mut *conn)
        .await?;

    let numbers = sqlx::query_scalar::<_, String>("SELECT bill_number FROM bills")
        .fetch_all(conn)
        .await?;

    Ok(numbers)
}

/// Inserts a bill header
pub async fn insert_bill(conn: &mut PgConnection, bill: &Bill) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO bills (
            bill_id, bill_number, customer_id, subtotal, tax_amount,
            discount_amount, total_amount, payment_status, notes, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(Uuid::from(bill.id))
    .bind(&bill.bill_number)
    .bind(Uuid::from(bill.customer_id))
    .bind(bill.totals.subtotal.amount())
    .bind(bill.totals.tax_amount.amount())
    .bind(bill.totals.discount_amount.amount())
    .bind(bill.totals.total_amount.amount())
    .bind(DbPaymentStatus::from(bill.payment_status))
    .bind(&bill.notes)
    .bind(bill.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a bill line
pub async fn insert_bill_item(conn: &mut PgConnection, item: &BillItem) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO bill_items (
            bill_item_id, bill_id, product_id, quantity, unit_price, total_price
        ) VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::from(item.id))
    .bind(Uuid::from(item.bill_id))
    .bind(Uuid::from(item.product_id))
    .bind(to_db_quantity(item.quantity)?)
    .bind(item.unit_price.amount())
    .bind(item.total_price.amount())
    .execute(conn)
    .await?;

    Ok(())
}

/// Locks a bill header row; returns false if it does not exist
pub async fn lock_bill(conn: &mut PgConnection, bill_id: Uuid) -> Result<bool, DatabaseError> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT bill_id FROM bills WHERE bill_id = $1 FOR UPDATE")
        .bind(bill_id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

/// Reads the lines of a bill in insertion order
pub async fn items_of(conn: &mut PgConnection, bill_id: Uuid) -> Result<Vec<BillItemRow>, DatabaseError> {
    let rows = sqlx::query_as::<_, BillItemRow>(
        r#"
        SELECT bill_item_id, bill_id, product_id, quantity, unit_price, total_price
        FROM bill_items
        WHERE bill_id = $1
        ORDER BY bill_item_id
        "#,
    )
    .bind(bill_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Deletes the lines of a bill
pub async fn delete_bill_items(conn: &mut PgConnection, bill_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM bill_items WHERE bill_id = $1")
        .bind(bill_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes a bill header; returns false if no row was removed
pub async fn delete_bill(conn: &mut PgConnection, bill_id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM bills WHERE bill_id = $1")
        .bind(bill_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Converts a line quantity to the `INTEGER` column type
pub fn to_db_quantity(quantity: u32) -> Result<i32, DatabaseError> {
    i32::try_from(quantity)
        .map_err(|_| DatabaseError::SerializationError(format!("quantity {} exceeds column range", quantity)))
}

/// Payment status as stored in the `payment_status` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum DbPaymentStatus {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

impl From<PaymentStatus> for DbPaymentStatus {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => DbPaymentStatus::Pending,
            PaymentStatus::Partial => DbPaymentStatus::Partial,
            PaymentStatus::Paid => DbPaymentStatus::Paid,
            PaymentStatus::Cancelled => DbPaymentStatus::Cancelled,
        }
    }
}

impl From<DbPaymentStatus> for PaymentStatus {
    fn from(status: DbPaymentStatus) -> Self {
        match status {
            DbPaymentStatus::Pending => PaymentStatus::Pending,
            DbPaymentStatus::Partial => PaymentStatus::Partial,
            DbPaymentStatus::Paid => PaymentStatus::Paid,
            DbPaymentStatus::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

/// Database row for a bill header
#[derive(Debug, Clone, FromRow)]
pub struct BillRow {
    pub bill_id: Uuid,
    pub bill_number: String,
    pub customer_id: Uuid,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_status: DbPaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database row for a bill listing entry
#[derive(Debug, Clone, FromRow)]
pub struct BillSummaryRow {
    #[sqlx(flatten)]
    pub bill: BillRow,
    pub customer_name: String,
}

/// Database row for a single bill header
#[derive(Debug, Clone, FromRow)]
pub struct BillDetailRow {
    #[sqlx(flatten)]
    pub bill: BillRow,
    pub customer_name: Option<String>,
}

/// Database row for a bill line
#[derive(Debug, Clone, FromRow)]
pub struct BillItemRow {
    pub bill_item_id: Uuid,
    pub bill_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// A bill header together with its lines
#[derive(Debug, Clone)]
pub struct BillWithItems {
    pub header: BillDetailRow,
    pub items: Vec<BillItemRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_mapping_is_total() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Partial,
            PaymentStatus::Paid,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::from(DbPaymentStatus::from(status)), status);
        }
    }

    #[test]
    fn test_quantity_range() {
        assert_eq!(to_db_quantity(3).unwrap(), 3);
        assert!(to_db_quantity(u32::MAX).is_err());
    }
}
