//! Database Test Utilities
//!
//! Provides helpers for database testing including testcontainer management,
//! schema setup and seeding of catalog rows.

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use uuid::Uuid;

use core_kernel::{CustomerId, ProductId};

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "billing_test";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container with the billing schema applied
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or migrations fail
    pub async fn new() -> Result<Self, BoxError> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..Default::default()
        };

        // Enough connections for the concurrency tests to really overlap
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        infra_db::run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Inserts a customer row
pub async fn insert_customer(pool: &PgPool, name: &str) -> Result<CustomerId, BoxError> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO customers (customer_id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(CustomerId::from(id))
}

/// Inserts a product row
pub async fn insert_product(
    pool: &PgPool,
    code: &str,
    price: Decimal,
    stock_quantity: i32,
) -> Result<ProductId, BoxError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (product_id, unique_code, name, price, stock_quantity)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(format!("Product {}", code))
    .bind(price)
    .bind(stock_quantity)
    .execute(pool)
    .await?;
    Ok(ProductId::from(id))
}

/// Removes a product row, as catalog management would
pub async fn delete_product(pool: &PgPool, product_id: ProductId) -> Result<(), BoxError> {
    sqlx::query("DELETE FROM products WHERE product_id = $1")
        .bind(Uuid::from(product_id))
        .execute(pool)
        .await?;
    Ok(())
}

/// Reads the committed stock of a product
pub async fn stock_of(pool: &PgPool, product_id: ProductId) -> Result<Option<i32>, BoxError> {
    let quantity = sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM products WHERE product_id = $1")
        .bind(Uuid::from(product_id))
        .fetch_optional(pool)
        .await?;
    Ok(quantity)
}

/// Counts rows in a billing table
pub async fn count_rows(pool: &PgPool, table: &str) -> Result<i64, BoxError> {
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::new().await
}

/// Helper macro for running database tests
///
/// Tests need Docker and are ignored by default; run them with
/// `cargo test -- --ignored`.
#[macro_export]
macro_rules! db_test {
    ($name:ident, |$pool:ident| $body:block) => {
        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        #[ignore = "requires Docker"]
        async fn $name() {
            let db = $crate::database::create_isolated_test_database()
                .await
                .expect("Failed to create test database");
            let $pool = db.pool().clone();
            $body
        }
    };
}
