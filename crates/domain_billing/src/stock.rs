//! Stock ledger
//!
//! The single choke point for available-quantity mutation. During bill
//! creation the ledger locks every product the bill touches, then checks each
//! line against what remains after the earlier lines of the same bill. The
//! accumulated decrements are applied in one pass once every line has passed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::{Money, ProductId};

use crate::error::BillingError;
use crate::ports::BillTransaction;

/// Stock and price of one product, as read under lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub product_id: ProductId,
    /// Unique external code
    pub code: String,
    pub name: String,
    /// Current catalog price
    pub unit_price: Money,
    pub available_quantity: u32,
}

/// Result of restoring stock for a deleted line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    /// Units were added back
    Restored { product_id: ProductId, quantity: u32 },
    /// The product no longer exists; nothing was added back
    ProductMissing { product_id: ProductId, quantity: u32 },
}

#[derive(Debug)]
struct LedgerEntry {
    stock: ProductStock,
    reserved: u32,
}

impl LedgerEntry {
    fn remaining(&self) -> u32 {
        self.stock.available_quantity.saturating_sub(self.reserved)
    }
}

/// Per-transaction view of the stock touched by one bill
#[derive(Debug, Default)]
pub struct StockLedger {
    entries: BTreeMap<ProductId, LedgerEntry>,
}

impl StockLedger {
    /// Builds a ledger from rows already read under lock
    pub fn from_stock(rows: impl IntoIterator<Item = ProductStock>) -> Self {
        let entries = rows
            .into_iter()
            .map(|stock| (stock.product_id, LedgerEntry { stock, reserved: 0 }))
            .collect();
        Self { entries }
    }

    /// Locks the given products inside `tx` and builds a ledger over them
    ///
    /// Rows are locked in ascending id order so two bills touching the same
    /// products cannot deadlock each other.
    pub async fn lock<T>(tx: &mut T, product_ids: &[ProductId]) -> Result<Self, BillingError>
    where
        T: BillTransaction,
    {
        let mut ids = product_ids.to_vec();
        ids.sort();
        ids.dedup();

        let rows = tx.lock_products(&ids).await?;
        debug!(requested = ids.len(), found = rows.len(), "Locked product rows");
        Ok(Self::from_stock(rows))
    }

    /// Checks a line against remaining stock and reserves its units
    ///
    /// # Returns
    ///
    /// The catalog unit price to snapshot
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` if the product is unknown or fewer than
    /// `quantity` units remain after earlier reservations
    pub fn check_and_reserve(&mut self, product_id: ProductId, quantity: u32) -> Result<Money, BillingError> {
        let entry = match self.entries.get_mut(&product_id) {
            Some(entry) => entry,
            None => return Err(BillingError::insufficient_stock(product_id, None, quantity, 0)),
        };

        let remaining = entry.remaining();
        if quantity > remaining {
            return Err(BillingError::insufficient_stock(
                product_id,
                Some(entry.stock.code.clone()),
                quantity,
                remaining,
            ));
        }

        entry.reserved += quantity;
        Ok(entry.stock.unit_price)
    }

    /// Units still available for a product after reservations
    pub fn remaining(&self, product_id: ProductId) -> Option<u32> {
        self.entries.get(&product_id).map(LedgerEntry::remaining)
    }

    /// Locked stock row for a product
    pub fn stock(&self, product_id: ProductId) -> Option<&ProductStock> {
        self.entries.get(&product_id).map(|entry| &entry.stock)
    }

    /// Reserved quantity per product, ascending by id
    pub fn pending_decrements(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.reserved > 0)
            .map(|(id, entry)| (*id, entry.reserved))
    }

    /// Writes every reservation to storage
    ///
    /// # Errors
    ///
    /// Returns `TransactionConflict` if a guarded decrement finds fewer units
    /// than were validated, which only happens if the row lock was bypassed
    pub async fn apply<T>(&self, tx: &mut T) -> Result<(), BillingError>
    where
        T: BillTransaction,
    {
        for (product_id, quantity) in self.pending_decrements() {
            if !tx.decrement_stock(product_id, quantity).await? {
                return Err(BillingError::TransactionConflict(format!(
                    "stock of product {} changed during the transaction",
                    product_id
                )));
            }
            debug!(%product_id, quantity, "Stock decremented");
        }
        Ok(())
    }

    /// Adds units back for a deleted line
    ///
    /// A missing product is reported as a data-integrity warning, not a
    /// failure: the bill being deleted is historical record.
    pub async fn restore<T>(tx: &mut T, product_id: ProductId, quantity: u32) -> Result<RestoreOutcome, BillingError>
    where
        T: BillTransaction,
    {
        if tx.increment_stock(product_id, quantity).await? {
            debug!(%product_id, quantity, "Stock restored");
            Ok(RestoreOutcome::Restored { product_id, quantity })
        } else {
            warn!(
                %product_id,
                quantity,
                "Product no longer exists; stock for deleted bill line not restored"
            );
            Ok(RestoreOutcome::ProductMissing { product_id, quantity })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stock(available: u32) -> ProductStock {
        ProductStock {
            product_id: ProductId::new(),
            code: "SKU-1".to_string(),
            name: "Brass lamp".to_string(),
            unit_price: Money::new(dec!(12.50)),
            available_quantity: available,
        }
    }

    #[test]
    fn test_reserve_returns_catalog_price() {
        let row = stock(5);
        let id = row.product_id;
        let mut ledger = StockLedger::from_stock([row]);

        assert_eq!(ledger.check_and_reserve(id, 3).unwrap(), Money::new(dec!(12.50)));
        assert_eq!(ledger.remaining(id), Some(2));
    }

    #[test]
    fn test_second_line_sees_first_reservation() {
        let row = stock(5);
        let id = row.product_id;
        let mut ledger = StockLedger::from_stock([row]);

        ledger.check_and_reserve(id, 3).unwrap();
        let err = ledger.check_and_reserve(id, 3).unwrap_err();
        match err {
            BillingError::InsufficientStock { available, shortfall, .. } => {
                assert_eq!(available, 2);
                assert_eq!(shortfall, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.pending_decrements().collect::<Vec<_>>(), vec![(id, 3)]);
    }

    #[test]
    fn test_unknown_product_is_insufficient_stock() {
        let mut ledger = StockLedger::default();
        let err = ledger.check_and_reserve(ProductId::new(), 1).unwrap_err();
        assert!(matches!(err, BillingError::InsufficientStock { available: 0, .. }));
    }

    #[test]
    fn test_exact_quantity_is_allowed() {
        let row = stock(4);
        let id = row.product_id;
        let mut ledger = StockLedger::from_stock([row]);
        ledger.check_and_reserve(id, 4).unwrap();
        assert_eq!(ledger.remaining(id), Some(0));
    }
}
