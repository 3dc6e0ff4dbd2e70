//! Billing Domain Ports
//!
//! The bill lifecycle needs a transactional persistence substrate, a
//! committed-state read side, and a stock report. Each is a port trait so the
//! engine runs unchanged against PostgreSQL (infra_db) or the in-memory mock.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::{BillEngine, BillingService, NumberingSequence};
//! use std::sync::Arc;
//!
//! let engine = BillEngine::new(PostgresBillStore::new(pool), NumberingSequence::default());
//! let service: Arc<dyn BillingService> = Arc::new(engine);
//! let created = service.create_bill(request).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{BillId, CustomerId, DomainPort, HealthCheckable, ProductId};

use crate::bill::{Bill, BillDetail, BillItem, BillSummary};
use crate::engine::{CreatedBill, DeletedBill};
use crate::error::BillingError;
use crate::request::CreateBillRequest;
use crate::stock::ProductStock;

/// One open unit of work against the bill store
///
/// Nothing written through a transaction is visible to other transactions
/// until `commit` succeeds. Dropping a transaction without committing rolls
/// it back.
#[async_trait]
pub trait BillTransaction: Send {
    /// Looks up a customer's display name
    async fn customer_name(&mut self, customer_id: CustomerId) -> Result<Option<String>, BillingError>;

    /// Takes the numbering lock and returns every stored bill number
    ///
    /// The lock is held until the transaction ends.
    async fn lock_bill_numbers(&mut self) -> Result<Vec<String>, BillingError>;

    /// Locks and returns the given product rows
    ///
    /// `product_ids` is sorted and distinct so concurrent transactions lock
    /// rows in the same order. Missing products are simply absent from the
    /// result.
    async fn lock_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<ProductStock>, BillingError>;

    /// Removes `quantity` units; returns false if the product is missing or
    /// has fewer units left
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, BillingError>;

    /// Adds `quantity` units; returns false if the product is missing
    async fn increment_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, BillingError>;

    /// Inserts a bill header
    async fn insert_bill(&mut self, bill: &Bill) -> Result<(), BillingError>;

    /// Inserts a bill line
    async fn insert_bill_item(&mut self, item: &BillItem) -> Result<(), BillingError>;

    /// Locks a bill header; returns false if it does not exist
    async fn lock_bill(&mut self, bill_id: BillId) -> Result<bool, BillingError>;

    /// Returns the lines of a bill
    async fn bill_items(&mut self, bill_id: BillId) -> Result<Vec<BillItem>, BillingError>;

    /// Deletes the lines of a bill, returning how many were removed
    async fn delete_bill_items(&mut self, bill_id: BillId) -> Result<u64, BillingError>;

    /// Deletes a bill header; returns false if it did not exist
    async fn delete_bill(&mut self, bill_id: BillId) -> Result<bool, BillingError>;

    /// Makes every change of this transaction visible
    async fn commit(self) -> Result<(), BillingError>;

    /// Discards every change of this transaction
    async fn rollback(self) -> Result<(), BillingError>;
}

/// Factory for bill transactions
#[async_trait]
pub trait BillStore: DomainPort {
    type Tx: BillTransaction + 'static;

    /// Begins a transaction
    async fn begin(&self) -> Result<Self::Tx, BillingError>;
}

/// Read side over committed bills
#[async_trait]
pub trait BillReader: DomainPort {
    /// All bills, newest first, with customer display names
    async fn list_bills(&self) -> Result<Vec<BillSummary>, BillingError>;

    /// A bill with its lines
    async fn find_bill(&self, bill_id: BillId) -> Result<Option<BillDetail>, BillingError>;
}

/// Read side over product stock
#[async_trait]
pub trait StockReader: DomainPort {
    /// Products with fewer than `threshold` units available, lowest first
    async fn low_stock(&self, threshold: u32) -> Result<Vec<ProductStock>, BillingError>;
}

/// Inbound port used by the HTTP layer
#[async_trait]
pub trait BillingService: HealthCheckable {
    /// Lists bills newest first
    async fn list_bills(&self) -> Result<Vec<BillSummary>, BillingError>;

    /// Fetches a bill with its lines
    async fn get_bill(&self, bill_id: BillId) -> Result<BillDetail, BillingError>;

    /// Creates a bill and decrements stock atomically
    async fn create_bill(&self, request: CreateBillRequest) -> Result<CreatedBill, BillingError>;

    /// Deletes a bill and restores stock atomically
    async fn delete_bill(&self, bill_id: BillId) -> Result<DeletedBill, BillingError>;

    /// Products running low
    async fn low_stock(&self, threshold: u32) -> Result<Vec<ProductStock>, BillingError>;
}

/// Mock implementation for testing
///
/// Keeps the whole store behind one async mutex. A transaction holds the
/// lock from `begin` until it ends and works on a private copy of the state,
/// so transactions are fully serialized and uncommitted writes are never
/// visible to readers.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex as SyncMutex};
    use tokio::sync::{Mutex, OwnedMutexGuard};

    use core_kernel::{HealthCheckResult, Money};

    /// Operation that can be made to fail once
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailPoint {
        Begin,
        LockBillNumbers,
        InsertBill,
        InsertBillItem,
        DecrementStock,
        IncrementStock,
        DeleteBillItems,
        DeleteBill,
        Commit,
    }

    /// Copy of everything the mock stores
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct MockSnapshot {
        pub products: BTreeMap<ProductId, ProductStock>,
        pub customers: HashMap<CustomerId, String>,
        pub bills: BTreeMap<BillId, Bill>,
        pub items: Vec<BillItem>,
    }

    /// In-memory transactional bill store
    #[derive(Debug, Clone, Default)]
    pub struct MockBillStore {
        state: Arc<Mutex<MockSnapshot>>,
        faults: Arc<SyncMutex<Vec<FailPoint>>>,
    }

    impl MockBillStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a customer
        pub async fn add_customer(&self, name: impl Into<String>) -> CustomerId {
            let id = CustomerId::new();
            self.state.lock().await.customers.insert(id, name.into());
            id
        }

        /// Adds a product
        pub async fn add_product(&self, code: impl Into<String>, unit_price: Money, available_quantity: u32) -> ProductId {
            let id = ProductId::new();
            let code = code.into();
            let stock = ProductStock {
                product_id: id,
                name: format!("Product {}", code),
                code,
                unit_price,
                available_quantity,
            };
            self.state.lock().await.products.insert(id, stock);
            id
        }

        /// Removes a product, as catalog management would
        pub async fn remove_product(&self, product_id: ProductId) {
            self.state.lock().await.products.remove(&product_id);
        }

        /// Changes a catalog price
        pub async fn set_price(&self, product_id: ProductId, unit_price: Money) {
            if let Some(stock) = self.state.lock().await.products.get_mut(&product_id) {
                stock.unit_price = unit_price;
            }
        }

        /// Current committed stock of a product
        pub async fn available(&self, product_id: ProductId) -> Option<u32> {
            self.state
                .lock()
                .await
                .products
                .get(&product_id)
                .map(|stock| stock.available_quantity)
        }

        /// Copy of the committed state
        pub async fn snapshot(&self) -> MockSnapshot {
            self.state.lock().await.clone()
        }

        /// Makes the next call of `point` fail with an internal error
        pub fn fail_next(&self, point: FailPoint) {
            if let Ok(mut faults) = self.faults.lock() {
                faults.push(point);
            }
        }

        fn take_fault(faults: &SyncMutex<Vec<FailPoint>>, point: FailPoint) -> Result<(), BillingError> {
            let mut faults = match faults.lock() {
                Ok(faults) => faults,
                Err(poisoned) => poisoned.into_inner(),
            };
            match faults.iter().position(|p| *p == point) {
                Some(index) => {
                    faults.remove(index);
                    Err(BillingError::Internal(format!("injected failure at {:?}", point)))
                }
                None => Ok(()),
            }
        }
    }

    impl DomainPort for MockBillStore {}

    #[async_trait]
    impl HealthCheckable for MockBillStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-bill-store", 0)
        }
    }

    /// Transaction over a private copy of the mock state
    pub struct MockBillTransaction {
        guard: OwnedMutexGuard<MockSnapshot>,
        staged: MockSnapshot,
        faults: Arc<SyncMutex<Vec<FailPoint>>>,
    }

    impl MockBillTransaction {
        fn fault(&self, point: FailPoint) -> Result<(), BillingError> {
            MockBillStore::take_fault(&self.faults, point)
        }
    }

    #[async_trait]
    impl BillStore for MockBillStore {
        type Tx = MockBillTransaction;

        async fn begin(&self) -> Result<Self::Tx, BillingError> {
            Self::take_fault(&self.faults, FailPoint::Begin)?;
            let guard = self.state.clone().lock_owned().await;
            let staged = guard.clone();
            Ok(MockBillTransaction {
                guard,
                staged,
                faults: self.faults.clone(),
            })
        }
    }

    #[async_trait]
    impl BillTransaction for MockBillTransaction {
        async fn customer_name(&mut self, customer_id: CustomerId) -> Result<Option<String>, BillingError> {
            Ok(self.staged.customers.get(&customer_id).cloned())
        }

        async fn lock_bill_numbers(&mut self) -> Result<Vec<String>, BillingError> {
            self.fault(FailPoint::LockBillNumbers)?;
            Ok(self.staged.bills.values().map(|b| b.bill_number.clone()).collect())
        }

        async fn lock_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<ProductStock>, BillingError> {
            Ok(product_ids
                .iter()
                .filter_map(|id| self.staged.products.get(id).cloned())
                .collect())
        }

        async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, BillingError> {
            self.fault(FailPoint::DecrementStock)?;
            match self.staged.products.get_mut(&product_id) {
                Some(stock) if stock.available_quantity >= quantity => {
                    stock.available_quantity -= quantity;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn increment_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, BillingError> {
            self.fault(FailPoint::IncrementStock)?;
            match self.staged.products.get_mut(&product_id) {
                Some(stock) => {
                    stock.available_quantity = stock
                        .available_quantity
                        .checked_add(quantity)
                        .ok_or_else(|| BillingError::Internal("stock overflow".to_string()))?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn insert_bill(&mut self, bill: &Bill) -> Result<(), BillingError> {
            self.fault(FailPoint::InsertBill)?;
            if self.staged.bills.values().any(|b| b.bill_number == bill.bill_number) {
                return Err(BillingError::TransactionConflict(format!(
                    "bill number {} already taken",
                    bill.bill_number
                )));
            }
            self.staged.bills.insert(bill.id, bill.clone());
            Ok(())
        }

        async fn insert_bill_item(&mut self, item: &BillItem) -> Result<(), BillingError> {
            self.fault(FailPoint::InsertBillItem)?;
            if !self.staged.bills.contains_key(&item.bill_id) {
                return Err(BillingError::Internal("line inserted before its bill".to_string()));
            }
            self.staged.items.push(item.clone());
            Ok(())
        }

        async fn lock_bill(&mut self, bill_id: BillId) -> Result<bool, BillingError> {
            Ok(self.staged.bills.contains_key(&bill_id))
        }

        async fn bill_items(&mut self, bill_id: BillId) -> Result<Vec<BillItem>, BillingError> {
            Ok(self
                .staged
                .items
                .iter()
                .filter(|item| item.bill_id == bill_id)
                .cloned()
                .collect())
        }

        async fn delete_bill_items(&mut self, bill_id: BillId) -> Result<u64, BillingError> {
            self.fault(FailPoint::DeleteBillItems)?;
            let before = self.staged.items.len();
            self.staged.items.retain(|item| item.bill_id != bill_id);
            Ok((before - self.staged.items.len()) as u64)
        }

        async fn delete_bill(&mut self, bill_id: BillId) -> Result<bool, BillingError> {
            self.fault(FailPoint::DeleteBill)?;
            if self.staged.items.iter().any(|item| item.bill_id == bill_id) {
                return Err(BillingError::Internal("bill still has lines".to_string()));
            }
            Ok(self.staged.bills.remove(&bill_id).is_some())
        }

        async fn commit(self) -> Result<(), BillingError> {
            self.fault(FailPoint::Commit)?;
            let MockBillTransaction { mut guard, staged, .. } = self;
            *guard = staged;
            Ok(())
        }

        async fn rollback(self) -> Result<(), BillingError> {
            Ok(())
        }
    }

    #[async_trait]
    impl BillReader for MockBillStore {
        async fn list_bills(&self) -> Result<Vec<BillSummary>, BillingError> {
            let state = self.state.lock().await;
            let mut bills: Vec<BillSummary> = state
                .bills
                .values()
                .map(|bill| BillSummary {
                    customer_name: state.customers.get(&bill.customer_id).cloned().unwrap_or_default(),
                    bill: bill.clone(),
                })
                .collect();
            bills.sort_by(|a, b| {
                b.bill
                    .created_at
                    .cmp(&a.bill.created_at)
                    .then_with(|| b.bill.id.cmp(&a.bill.id))
            });
            Ok(bills)
        }

        async fn find_bill(&self, bill_id: BillId) -> Result<Option<BillDetail>, BillingError> {
            let state = self.state.lock().await;
            Ok(state.bills.get(&bill_id).map(|bill| BillDetail {
                bill: bill.clone(),
                customer_name: state.customers.get(&bill.customer_id).cloned(),
                items: state
                    .items
                    .iter()
                    .filter(|item| item.bill_id == bill_id)
                    .cloned()
                    .collect(),
            }))
        }
    }

    #[async_trait]
    impl StockReader for MockBillStore {
        async fn low_stock(&self, threshold: u32) -> Result<Vec<ProductStock>, BillingError> {
            let state = self.state.lock().await;
            let mut low: Vec<ProductStock> = state
                .products
                .values()
                .filter(|stock| stock.available_quantity < threshold)
                .cloned()
                .collect();
            low.sort_by(|a, b| {
                a.available_quantity
                    .cmp(&b.available_quantity)
                    .then_with(|| a.code.cmp(&b.code))
            });
            Ok(low)
        }
    }
}
