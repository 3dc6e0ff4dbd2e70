//! Test Data Builders
//!
//! Builders for bill creation requests, so tests only spell out the lines
//! and amounts they care about.

use core_kernel::{CustomerId, Money, ProductId};
use domain_billing::{BillLineRequest, CreateBillRequest, PaymentStatus};
use serde_json::{json, Value};

/// Builder for `CreateBillRequest`
#[derive(Debug, Clone, Default)]
pub struct TestBillRequestBuilder {
    request: CreateBillRequest,
}

impl TestBillRequestBuilder {
    /// Starts a request for a customer
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            request: CreateBillRequest::for_customer(customer_id),
        }
    }

    /// Starts a request with no customer
    pub fn without_customer() -> Self {
        Self::default()
    }

    /// Adds a line priced from the catalog
    pub fn line(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.request.items.push(BillLineRequest::new(product_id, quantity));
        self
    }

    /// Adds a line with an explicit unit price
    pub fn priced_line(mut self, product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        self.request
            .items
            .push(BillLineRequest::new(product_id, quantity).with_unit_price(unit_price));
        self
    }

    /// Sets the tax amount
    pub fn tax(mut self, amount: Money) -> Self {
        self.request.tax_amount = amount;
        self
    }

    /// Sets the discount amount
    pub fn discount(mut self, amount: Money) -> Self {
        self.request.discount_amount = amount;
        self
    }

    /// Sets the payment status
    pub fn status(mut self, status: PaymentStatus) -> Self {
        self.request.payment_status = status;
        self
    }

    /// Builds the domain request
    pub fn build(self) -> CreateBillRequest {
        self.request
    }

    /// Builds the camelCase JSON body accepted by `POST /api/v1/bills`
    pub fn build_json(self) -> Value {
        let request = self.request;
        let items: Vec<Value> = request
            .items
            .iter()
            .map(|line| {
                let mut item = json!({
                    "productId": line.product_id.as_uuid(),
                    "quantity": line.quantity,
                });
                if let Some(price) = line.unit_price {
                    item["unitPrice"] = json!(price.amount().to_string());
                }
                if let Some(total) = line.total_price {
                    item["totalPrice"] = json!(total.amount().to_string());
                }
                item
            })
            .collect();

        json!({
            "customerId": request.customer_id.map(|id| *id.as_uuid()),
            "taxAmount": request.tax_amount.amount().to_string(),
            "discountAmount": request.discount_amount.amount().to_string(),
            "paymentStatus": request.payment_status.as_str(),
            "notes": request.notes,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builder_collects_lines() {
        let product = ProductId::new();
        let request = TestBillRequestBuilder::for_customer(CustomerId::new())
            .line(product, 2)
            .priced_line(product, 1, Money::new(dec!(3.00)))
            .tax(Money::new(dec!(1.00)))
            .build();

        assert_eq!(request.items.len(), 2);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_json_body_uses_camel_case() {
        let body = TestBillRequestBuilder::for_customer(CustomerId::new())
            .line(ProductId::new(), 3)
            .build_json();

        assert!(body.get("customerId").is_some());
        assert_eq!(body["items"][0]["quantity"], 3);
        assert!(body["items"][0].get("unitPrice").is_none());
    }
}
