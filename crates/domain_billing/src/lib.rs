//! Billing Domain - Transactional Bill Lifecycle
//!
//! This crate creates and deletes retail bills (invoices) while keeping
//! product stock consistent with the lines of every committed bill.
//!
//! # Guarantees
//!
//! - A bill exists with all of its lines and stock effects, or not at all
//! - Available stock never goes negative, even under concurrent creation
//! - Bill numbers are unique and follow the largest existing suffix
//! - Deleting a bill gives back exactly the units its lines took
//!
//! # Components
//!
//! - **NumberingSequence**: derives the next `BILL-nnnn` number
//! - **StockLedger**: checks and applies stock changes under row locks
//! - **BillEngine**: runs the create and delete flows in one transaction
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillEngine, BillLineRequest, CreateBillRequest, NumberingSequence};
//!
//! let engine = BillEngine::new(store, NumberingSequence::default());
//!
//! let request = CreateBillRequest::for_customer(customer_id)
//!     .line(BillLineRequest::new(lamp_id, 3))
//!     .with_tax(tax);
//!
//! let created = engine.create_bill(request).await?;
//! engine.delete_bill(created.bill_id).await?;
//! ```

pub mod bill;
pub mod engine;
pub mod error;
pub mod numbering;
pub mod ports;
pub mod request;
pub mod stock;

pub use bill::{ensure_storable, Bill, BillDetail, BillItem, BillSummary, BillTotals, PaymentStatus, MAX_BILL_AMOUNT};
pub use engine::{BillEngine, CreateStage, CreatedBill, DeleteStage, DeletedBill, RestoredStock};
pub use error::BillingError;
pub use numbering::{BillNumber, NumberingSequence, DEFAULT_PREFIX, DEFAULT_WIDTH};
pub use ports::{BillReader, BillStore, BillTransaction, BillingService, StockReader};
pub use request::{BillLineRequest, CreateBillRequest};
pub use stock::{ProductStock, RestoreOutcome, StockLedger};
