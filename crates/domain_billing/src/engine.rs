//! Bill transaction engine
//!
//! Creates and deletes bills as single all-or-nothing units spanning the
//! header, its lines, and product stock.
//!
//! # Create
//!
//! `Started → NumberAllocated → LinesValidated → Persisted → StockAdjusted → Committed`
//!
//! # Delete
//!
//! `Started → ItemsLoaded → StockRestored → ItemsRemoved → HeaderRemoved → Committed`
//!
//! A failure at any stage rolls the transaction back (`RolledBack`) before
//! the originating error is returned. Nothing is recovered locally.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use core_kernel::{BillId, HealthCheckResult, HealthCheckable, Money, ProductId};

use crate::bill::{Bill, BillDetail, BillItem, BillSummary, BillTotals};
use crate::error::BillingError;
use crate::numbering::NumberingSequence;
use crate::ports::{BillReader, BillStore, BillTransaction, BillingService, StockReader};
use crate::request::CreateBillRequest;
use crate::stock::{ProductStock, RestoreOutcome, StockLedger};

/// Progress of a bill creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateStage {
    Started,
    NumberAllocated,
    LinesValidated,
    Persisted,
    StockAdjusted,
    Committed,
    RolledBack,
}

/// Progress of a bill deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteStage {
    Started,
    ItemsLoaded,
    StockRestored,
    ItemsRemoved,
    HeaderRemoved,
    Committed,
    RolledBack,
}

impl fmt::Display for CreateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for DeleteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A committed bill creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBill {
    pub bill_id: BillId,
    pub bill_number: String,
    #[serde(flatten)]
    pub totals: BillTotals,
}

/// Units given back to one product by a deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredStock {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A committed (or no-op) bill deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedBill {
    pub bill_id: BillId,
    /// False when the bill was already absent
    pub existed: bool,
    pub items_removed: u64,
    pub restored: Vec<RestoredStock>,
    /// Lines whose product no longer exists
    pub missing_products: Vec<RestoredStock>,
}

impl DeletedBill {
    fn absent(bill_id: BillId) -> Self {
        Self {
            bill_id,
            existed: false,
            items_removed: 0,
            restored: Vec::new(),
            missing_products: Vec::new(),
        }
    }
}

/// Orchestrates bill creation and deletion over a transactional store
///
/// # Type Parameters
///
/// * `S` - The persistence adapter
#[derive(Debug, Clone)]
pub struct BillEngine<S> {
    store: S,
    numbering: NumberingSequence,
}

impl<S> BillEngine<S>
where
    S: BillStore,
{
    /// Creates an engine over a store
    pub fn new(store: S, numbering: NumberingSequence) -> Self {
        Self { store, numbering }
    }

    /// Returns the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the numbering sequence
    pub fn numbering(&self) -> &NumberingSequence {
        &self.numbering
    }

    /// Creates a bill, its lines and the matching stock decrements atomically
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for missing customer, missing lines, bad amounts or
    ///   a supplied line total that does not match the price
    /// - `NotFound` if the customer does not exist
    /// - `InsufficientStock` if any line asks for more than remains
    /// - `TransactionConflict` / `Internal` from the store
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create_bill(&self, request: CreateBillRequest) -> Result<CreatedBill, BillingError> {
        let customer_id = request.validate()?;

        let mut tx = self.store.begin().await?;
        let mut stage = CreateStage::Started;

        match self.create_within(&mut tx, customer_id, &request, &mut stage).await {
            Ok(created) => {
                if let Err(e) = tx.commit().await {
                    warn!(stage = %stage, error = %e, "Commit failed; bill not created");
                    return Err(e);
                }
                info!(
                    bill_id = %created.bill_id,
                    bill_number = %created.bill_number,
                    total = %created.totals.total_amount,
                    stage = %CreateStage::Committed,
                    "Bill created"
                );
                Ok(created)
            }
            Err(e) => {
                abort(tx, &e, &stage.to_string()).await;
                info!(stage = %CreateStage::RolledBack, kind = e.kind(), "Bill creation rolled back");
                Err(e)
            }
        }
    }

    async fn create_within(
        &self,
        tx: &mut S::Tx,
        customer_id: core_kernel::CustomerId,
        request: &CreateBillRequest,
        stage: &mut CreateStage,
    ) -> Result<CreatedBill, BillingError> {
        if tx.customer_name(customer_id).await?.is_none() {
            return Err(BillingError::not_found("Customer", customer_id));
        }

        let existing = tx.lock_bill_numbers().await?;
        let bill_number = self
            .numbering
            .next(existing.iter().map(String::as_str))?
            .to_string();
        *stage = CreateStage::NumberAllocated;

        let bill_id = BillId::new_v7();
        let mut ledger = StockLedger::lock(tx, &request.product_ids()).await?;
        let mut items = Vec::with_capacity(request.items.len());

        for (index, line) in request.items.iter().enumerate() {
            let catalog_price = ledger.check_and_reserve(line.product_id, line.quantity)?;
            let unit_price = line.unit_price.unwrap_or(catalog_price);
            let item = BillItem::new(bill_id, line.product_id, line.quantity, unit_price)?;

            if let Some(expected) = line.total_price {
                if expected != item.total_price {
                    return Err(BillingError::invalid(format!(
                        "line {}: total {} does not match {} x {}",
                        index + 1,
                        expected,
                        line.quantity,
                        unit_price
                    )));
                }
            }
            items.push(item);
        }
        *stage = CreateStage::LinesValidated;

        let subtotal = Money::checked_sum(items.iter().map(|item| item.total_price))?;
        let totals = BillTotals::compute(subtotal, request.tax_amount, request.discount_amount)?;

        let bill = Bill {
            id: bill_id,
            bill_number: bill_number.clone(),
            customer_id,
            totals,
            payment_status: request.payment_status,
            notes: request.notes.clone(),
            created_at: Utc::now(),
        };

        tx.insert_bill(&bill).await?;
        for item in &items {
            tx.insert_bill_item(item).await?;
        }
        *stage = CreateStage::Persisted;

        ledger.apply(tx).await?;
        *stage = CreateStage::StockAdjusted;

        Ok(CreatedBill {
            bill_id,
            bill_number,
            totals,
        })
    }

    /// Deletes a bill, restoring the stock its lines consumed
    ///
    /// Deleting a bill that does not exist succeeds without changing
    /// anything.
    ///
    /// # Errors
    ///
    /// `TransactionConflict` / `Internal` from the store; the bill is left as
    /// it was
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn delete_bill(&self, bill_id: BillId) -> Result<DeletedBill, BillingError> {
        let mut tx = self.store.begin().await?;
        let mut stage = DeleteStage::Started;

        match self.delete_within(&mut tx, bill_id, &mut stage).await {
            Ok(deleted) if !deleted.existed => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Rollback of no-op delete failed");
                }
                info!("Bill already absent; nothing to delete");
                Ok(deleted)
            }
            Ok(deleted) => {
                if let Err(e) = tx.commit().await {
                    warn!(stage = %stage, error = %e, "Commit failed; bill not deleted");
                    return Err(e);
                }
                info!(
                    items_removed = deleted.items_removed,
                    missing_products = deleted.missing_products.len(),
                    stage = %DeleteStage::Committed,
                    "Bill deleted"
                );
                Ok(deleted)
            }
            Err(e) => {
                abort(tx, &e, &stage.to_string()).await;
                info!(stage = %DeleteStage::RolledBack, kind = e.kind(), "Bill deletion rolled back");
                Err(e)
            }
        }
    }

    async fn delete_within(
        &self,
        tx: &mut S::Tx,
        bill_id: BillId,
        stage: &mut DeleteStage,
    ) -> Result<DeletedBill, BillingError> {
        if !tx.lock_bill(bill_id).await? {
            return Ok(DeletedBill::absent(bill_id));
        }

        let items = tx.bill_items(bill_id).await?;
        *stage = DeleteStage::ItemsLoaded;

        // Sum per product and restore in id order, matching the lock order of create
        let mut per_product: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in &items {
            let quantity = per_product.entry(item.product_id).or_insert(0);
            *quantity = quantity
                .checked_add(item.quantity)
                .ok_or_else(|| BillingError::Internal("restored quantity overflow".to_string()))?;
        }

        let mut restored = Vec::new();
        let mut missing_products = Vec::new();
        for (product_id, quantity) in per_product {
            match StockLedger::restore(tx, product_id, quantity).await? {
                RestoreOutcome::Restored { product_id, quantity } => {
                    restored.push(RestoredStock { product_id, quantity })
                }
                RestoreOutcome::ProductMissing { product_id, quantity } => {
                    missing_products.push(RestoredStock { product_id, quantity })
                }
            }
        }
        *stage = DeleteStage::StockRestored;

        let items_removed = tx.delete_bill_items(bill_id).await?;
        *stage = DeleteStage::ItemsRemoved;

        tx.delete_bill(bill_id).await?;
        *stage = DeleteStage::HeaderRemoved;

        Ok(DeletedBill {
            bill_id,
            existed: true,
            items_removed,
            restored,
            missing_products,
        })
    }
}

/// Rolls back after a failure, logging the stage reached
async fn abort<T: BillTransaction>(tx: T, cause: &BillingError, stage: &str) {
    warn!(stage, kind = cause.kind(), error = %cause, "Rolling back bill transaction");
    if let Err(e) = tx.rollback().await {
        // The transaction is dropped either way, which also discards it
        error!(error = %e, "Rollback failed");
    }
}

#[async_trait]
impl<S> HealthCheckable for BillEngine<S>
where
    S: BillStore + HealthCheckable,
{
    async fn health_check(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}

#[async_trait]
impl<S> BillingService for BillEngine<S>
where
    S: BillStore + BillReader + StockReader + HealthCheckable,
{
    async fn list_bills(&self) -> Result<Vec<BillSummary>, BillingError> {
        self.store.list_bills().await
    }

    async fn get_bill(&self, bill_id: BillId) -> Result<BillDetail, BillingError> {
        self.store
            .find_bill(bill_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill", bill_id))
    }

    async fn create_bill(&self, request: CreateBillRequest) -> Result<CreatedBill, BillingError> {
        BillEngine::create_bill(self, request).await
    }

    async fn delete_bill(&self, bill_id: BillId) -> Result<DeletedBill, BillingError> {
        BillEngine::delete_bill(self, bill_id).await
    }

    async fn low_stock(&self, threshold: u32) -> Result<Vec<ProductStock>, BillingError> {
        self.store.low_stock(threshold).await
    }
}
