//! Core Kernel - Foundational types for the back-office service
//!
//! This crate provides the building blocks shared by the billing domain,
//! the database adapters and the HTTP layer:
//! - Money with fixed two-place decimal arithmetic
//! - Strongly-typed identifiers for catalog, customer and bill records
//! - Port marker traits and adapter health checks

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, MoneyError};
pub use identifiers::{BillId, BillItemId, CustomerId, ProductId};
pub use ports::{DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
