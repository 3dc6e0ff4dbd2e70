//! Domain Adapters
//!
//! Adapter implementations connecting domain port traits to PostgreSQL.
//! Each adapter:
//! - Implements the domain's port traits
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations

pub mod bills;

pub use bills::{PostgresBillStore, PostgresBillTransaction};
