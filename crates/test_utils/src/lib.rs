//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the billing
//! service test suite.
//!
//! # Modules
//!
//! - `fixtures`: Sample catalog, generated names, a seeded mock store
//! - `builders`: Builders for bill creation requests and JSON bodies
//! - `database`: PostgreSQL testcontainer management and seeding

pub mod builders;
pub mod database;
pub mod fixtures;

pub use builders::*;
pub use database::*;
pub use fixtures::*;
