//! Pre-built Test Fixtures
//!
//! Ready-to-use catalog and customer data. Prices and quantities are fixed
//! so scenario tests can assert exact totals; names are generated.

use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use core_kernel::{CustomerId, Money, ProductId};
use domain_billing::ports::mock::MockBillStore;
use domain_billing::{BillEngine, NumberingSequence};

/// A catalog entry used to seed stores
#[derive(Debug, Clone)]
pub struct SampleProduct {
    pub code: &'static str,
    pub unit_price: Money,
    pub available_quantity: u32,
}

/// Small shop catalog shared by scenario tests
pub static SAMPLE_CATALOG: Lazy<Vec<SampleProduct>> = Lazy::new(|| {
    vec![
        SampleProduct {
            code: "LAMP-01",
            unit_price: Money::new(dec!(10.00)),
            available_quantity: 5,
        },
        SampleProduct {
            code: "MUG-02",
            unit_price: Money::new(dec!(4.25)),
            available_quantity: 40,
        },
        SampleProduct {
            code: "RUG-03",
            unit_price: Money::new(dec!(89.90)),
            available_quantity: 2,
        },
    ]
});

/// Fixture for money amounts
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard tax on a small bill
    pub fn tax() -> Money {
        Money::new(dec!(2.00))
    }

    /// Standard discount on a small bill
    pub fn discount() -> Money {
        Money::new(dec!(1.00))
    }

    /// A negative amount for validation tests
    pub fn negative() -> Money {
        Money::new(dec!(-5.00))
    }
}

/// Fixture for generated names
pub struct NameFixtures;

impl NameFixtures {
    /// A random person name
    pub fn customer_name() -> String {
        Name().fake()
    }

    /// A random business name
    pub fn business_name() -> String {
        CompanyName().fake()
    }
}

/// A mock-backed engine seeded with one customer and the sample catalog
pub struct SeededMockStore {
    pub engine: BillEngine<MockBillStore>,
    pub customer_id: CustomerId,
    /// Product ids in `SAMPLE_CATALOG` order
    pub product_ids: Vec<ProductId>,
}

impl SeededMockStore {
    /// Builds the seeded store
    pub async fn new() -> Self {
        let store = MockBillStore::new();
        let customer_id = store.add_customer(NameFixtures::customer_name()).await;

        let mut product_ids = Vec::with_capacity(SAMPLE_CATALOG.len());
        for product in SAMPLE_CATALOG.iter() {
            product_ids.push(
                store
                    .add_product(product.code, product.unit_price, product.available_quantity)
                    .await,
            );
        }

        Self {
            engine: BillEngine::new(store, NumberingSequence::default()),
            customer_id,
            product_ids,
        }
    }

    /// The lamp: 5 units at 10.00
    pub fn lamp(&self) -> ProductId {
        self.product_ids[0]
    }

    /// The mug: 40 units at 4.25
    pub fn mug(&self) -> ProductId {
        self.product_ids[1]
    }

    /// The store behind the engine
    pub fn store(&self) -> &MockBillStore {
        self.engine.store()
    }
}
