//! PostgreSQL Bill Adapter
//!
//! Implements the billing ports on PostgreSQL. Each `BillTransaction` wraps
//! one `sqlx::Transaction`; numbering is serialized with a transaction-scoped
//! advisory lock and product rows with `SELECT ... FOR UPDATE`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillStore;
//! use domain_billing::{BillEngine, BillingService, NumberingSequence};
//! use std::sync::Arc;
//!
//! let store = PostgresBillStore::new(pool);
//! let service: Arc<dyn BillingService> = Arc::new(BillEngine::new(store, NumberingSequence::default()));
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    BillId, BillItemId, CustomerId, DomainPort, HealthCheckResult, HealthCheckable, Money, ProductId,
};
use domain_billing::{
    Bill, BillDetail, BillItem, BillReader, BillStore, BillSummary, BillTotals, BillTransaction, BillingError,
    ProductStock, StockReader,
};

use crate::error::DatabaseError;
use crate::repositories::bills::{self, BillItemRow, BillRepository, BillRow};
use crate::repositories::stock::{self, ProductStockRow, StockRepository};

/// PostgreSQL-backed bill store
#[derive(Debug, Clone)]
pub struct PostgresBillStore {
    bills: BillRepository,
    stock: StockRepository,
    pool: PgPool,
}

impl PostgresBillStore {
    /// Creates a new store over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            bills: BillRepository::new(pool.clone()),
            stock: StockRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresBillStore {}

#[async_trait]
impl HealthCheckable for PostgresBillStore {
    /// Performs a `SELECT 1` to verify the pool is operational
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-bill-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-bill-store",
                latency_ms,
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl BillStore for PostgresBillStore {
    type Tx = PostgresBillTransaction;

    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Self::Tx, BillingError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        debug!("Bill transaction started");
        Ok(PostgresBillTransaction { tx })
    }
}

/// One open PostgreSQL transaction
///
/// Dropping it without `commit` rolls back, which also releases the row and
/// advisory locks it holds.
pub struct PostgresBillTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillTransaction for PostgresBillTransaction {
    async fn customer_name(&mut self, customer_id: CustomerId) -> Result<Option<String>, BillingError> {
        Ok(bills::customer_name(&mut self.tx, customer_id.into()).await?)
    }

    async fn lock_bill_numbers(&mut self) -> Result<Vec<String>, BillingError> {
        let numbers = bills::lock_bill_numbers(&mut self.tx).await?;
        debug!(existing = numbers.len(), "Numbering lock acquired");
        Ok(numbers)
    }

    async fn lock_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<ProductStock>, BillingError> {
        let ids: Vec<Uuid> = product_ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = stock::lock_products(&mut self.tx, &ids).await?;
        Ok(rows
            .into_iter()
            .map(row_to_stock)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, BillingError> {
        let quantity = bills::to_db_quantity(quantity)?;
        Ok(stock::decrement(&mut self.tx, product_id.into(), quantity).await?)
    }

    async fn increment_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, BillingError> {
        let quantity = bills::to_db_quantity(quantity)?;
        Ok(stock::increment(&mut self.tx, product_id.into(), quantity).await?)
    }

    async fn insert_bill(&mut self, bill: &Bill) -> Result<(), BillingError> {
        Ok(bills::insert_bill(&mut self.tx, bill).await?)
    }

    async fn insert_bill_item(&mut self, item: &BillItem) -> Result<(), BillingError> {
        Ok(bills::insert_bill_item(&mut self.tx, item).await?)
    }

    async fn lock_bill(&mut self, bill_id: BillId) -> Result<bool, BillingError> {
        Ok(bills::lock_bill(&mut self.tx, bill_id.into()).await?)
    }

    async fn bill_items(&mut self, bill_id: BillId) -> Result<Vec<BillItem>, BillingError> {
        let rows = bills::items_of(&mut self.tx, bill_id.into()).await?;
        Ok(rows.into_iter().map(row_to_item).collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_bill_items(&mut self, bill_id: BillId) -> Result<u64, BillingError> {
        Ok(bills::delete_bill_items(&mut self.tx, bill_id.into()).await?)
    }

    async fn delete_bill(&mut self, bill_id: BillId) -> Result<bool, BillingError> {
        Ok(bills::delete_bill(&mut self.tx, bill_id.into()).await?)
    }

    async fn commit(self) -> Result<(), BillingError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), BillingError> {
        self.tx.rollback().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[async_trait]
impl BillReader for PostgresBillStore {
    #[instrument(skip(self))]
    async fn list_bills(&self) -> Result<Vec<BillSummary>, BillingError> {
        let rows = self.bills.list().await?;
        debug!(count = rows.len(), "Listed bills");

        Ok(rows
            .into_iter()
            .map(|row| BillSummary {
                bill: row_to_bill(row.bill),
                customer_name: row.customer_name,
            })
            .collect())
    }

    #[instrument(skip(self), fields(bill_id = %bill_id))]
    async fn find_bill(&self, bill_id: BillId) -> Result<Option<BillDetail>, BillingError> {
        let Some(found) = self.bills.find(bill_id.into()).await? else {
            return Ok(None);
        };

        let items = found
            .items
            .into_iter()
            .map(row_to_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(BillDetail {
            bill: row_to_bill(found.header.bill),
            customer_name: found.header.customer_name,
            items,
        }))
    }
}

#[async_trait]
impl StockReader for PostgresBillStore {
    #[instrument(skip(self))]
    async fn low_stock(&self, threshold: u32) -> Result<Vec<ProductStock>, BillingError> {
        let rows = self.stock.below_threshold(i64::from(threshold)).await?;
        Ok(rows
            .into_iter()
            .map(row_to_stock)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

fn from_db_quantity(quantity: i32) -> Result<u32, DatabaseError> {
    u32::try_from(quantity)
        .map_err(|_| DatabaseError::SerializationError(format!("negative quantity {} in storage", quantity)))
}

fn row_to_stock(row: ProductStockRow) -> Result<ProductStock, DatabaseError> {
    Ok(ProductStock {
        product_id: ProductId::from(row.product_id),
        code: row.unique_code,
        name: row.name,
        unit_price: Money::new(row.price),
        available_quantity: from_db_quantity(row.stock_quantity)?,
    })
}

fn row_to_bill(row: BillRow) -> Bill {
    Bill {
        id: BillId::from(row.bill_id),
        bill_number: row.bill_number,
        customer_id: CustomerId::from(row.customer_id),
        totals: BillTotals {
            subtotal: Money::new(row.subtotal),
            tax_amount: Money::new(row.tax_amount),
            discount_amount: Money::new(row.discount_amount),
            total_amount: Money::new(row.total_amount),
        },
        payment_status: row.payment_status.into(),
        notes: row.notes,
        created_at: row.created_at,
    }
}

fn row_to_item(row: BillItemRow) -> Result<BillItem, DatabaseError> {
    Ok(BillItem {
        id: BillItemId::from(row.bill_item_id),
        bill_id: BillId::from(row.bill_id),
        product_id: ProductId::from(row.product_id),
        quantity: from_db_quantity(row.quantity)?,
        unit_price: Money::new(row.unit_price),
        total_price: Money::new(row.total_price),
    })
}
