//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the billing service using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories hold the SQL;
//! adapters implement the domain ports on top of them. Bill creation and
//! deletion run in a single database transaction owned by the domain engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBillStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/billing")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresBillStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresBillStore, PostgresBillTransaction};
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
