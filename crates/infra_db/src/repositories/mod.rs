//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and plain
//! row structs. Pool-backed methods serve committed reads; free functions
//! taking a `PgConnection` run inside a caller-owned transaction.

pub mod bills;
pub mod stock;

pub use bills::BillRepository;
pub use stock::StockRepository;
