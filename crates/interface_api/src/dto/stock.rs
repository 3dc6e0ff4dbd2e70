//! Stock DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_billing::ProductStock;

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    /// Report products with fewer units than this
    pub threshold: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStockResponse {
    pub product_id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_price: Decimal,
    pub available_quantity: u32,
}

impl From<ProductStock> for ProductStockResponse {
    fn from(stock: ProductStock) -> Self {
        Self {
            product_id: stock.product_id.into(),
            code: stock.code,
            name: stock.name,
            unit_price: stock.unit_price.amount(),
            available_quantity: stock.available_quantity,
        }
    }
}
