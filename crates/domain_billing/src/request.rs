//! Bill creation requests

use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, Money, ProductId};

use crate::bill::{ensure_storable, PaymentStatus};
use crate::error::BillingError;

/// One requested line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Sale price actually charged; the catalog price is used when absent
    pub unit_price: Option<Money>,
    /// Expected line total; must equal `quantity * unit price` when given
    pub total_price: Option<Money>,
}

impl BillLineRequest {
    /// A line priced from the catalog
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
            total_price: None,
        }
    }

    /// Charges an explicit unit price
    pub fn with_unit_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Supplies the expected line total
    pub fn with_total_price(mut self, total_price: Money) -> Self {
        self.total_price = Some(total_price);
        self
    }
}

/// Request to create a bill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBillRequest {
    pub customer_id: Option<CustomerId>,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub items: Vec<BillLineRequest>,
}

impl CreateBillRequest {
    /// Starts a request for a customer with no tax or discount
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    /// Appends a line
    pub fn line(mut self, line: BillLineRequest) -> Self {
        self.items.push(line);
        self
    }

    /// Sets the tax amount
    pub fn with_tax(mut self, tax_amount: Money) -> Self {
        self.tax_amount = tax_amount;
        self
    }

    /// Sets the discount amount
    pub fn with_discount(mut self, discount_amount: Money) -> Self {
        self.discount_amount = discount_amount;
        self
    }

    /// Sets the payment status
    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = payment_status;
        self
    }

    /// Sets the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks everything that can be checked without touching storage
    ///
    /// # Returns
    ///
    /// The customer reference
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the customer or lines are missing, a
    /// quantity is zero, or any amount is negative or too large to store
    pub fn validate(&self) -> Result<CustomerId, BillingError> {
        let customer_id = self
            .customer_id
            .ok_or_else(|| BillingError::invalid("customer reference is required"))?;

        if self.items.is_empty() {
            return Err(BillingError::invalid("a bill needs at least one line item"));
        }

        if self.tax_amount.is_negative() {
            return Err(BillingError::invalid("tax amount must not be negative"));
        }
        if self.discount_amount.is_negative() {
            return Err(BillingError::invalid("discount amount must not be negative"));
        }
        ensure_storable("tax amount", self.tax_amount)?;
        ensure_storable("discount amount", self.discount_amount)?;

        for (index, line) in self.items.iter().enumerate() {
            if line.quantity == 0 {
                return Err(BillingError::invalid(format!(
                    "line {}: quantity must be positive",
                    index + 1
                )));
            }
            let negative_price = line.unit_price.is_some_and(|p| p.is_negative())
                || line.total_price.is_some_and(|p| p.is_negative());
            if negative_price {
                return Err(BillingError::invalid(format!(
                    "line {}: prices must not be negative",
                    index + 1
                )));
            }
            for price in [line.unit_price, line.total_price].into_iter().flatten() {
                ensure_storable(&format!("line {} price", index + 1), price)?;
            }
        }

        Ok(customer_id)
    }

    /// Distinct product ids referenced by the lines, ascending
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|line| line.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_customer_is_invalid() {
        let request = CreateBillRequest::default().line(BillLineRequest::new(ProductId::new(), 1));
        assert!(matches!(request.validate(), Err(BillingError::InvalidRequest(_))));
    }

    #[test]
    fn test_empty_items_is_invalid() {
        let request = CreateBillRequest::for_customer(CustomerId::new());
        assert!(matches!(request.validate(), Err(BillingError::InvalidRequest(_))));
    }

    #[test]
    fn test_zero_quantity_is_invalid() {
        let request = CreateBillRequest::for_customer(CustomerId::new())
            .line(BillLineRequest::new(ProductId::new(), 0));
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_negative_discount_is_invalid() {
        let request = CreateBillRequest::for_customer(CustomerId::new())
            .line(BillLineRequest::new(ProductId::new(), 1))
            .with_discount(Money::new(dec!(-1)));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unstorable_prices_are_invalid() {
        let line = BillLineRequest::new(ProductId::new(), 1).with_unit_price(Money::new(dec!(1000000000000)));
        let err = CreateBillRequest::for_customer(CustomerId::new())
            .line(line)
            .validate()
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidRequest(ref m) if m.contains("line 1 price")));

        let request = CreateBillRequest::for_customer(CustomerId::new())
            .line(BillLineRequest::new(ProductId::new(), 1))
            .with_tax(Money::new(dec!(1000000000000)));
        assert!(matches!(request.validate(), Err(BillingError::InvalidRequest(_))));
    }

    #[test]
    fn test_product_ids_are_distinct_and_sorted() {
        let a = ProductId::new();
        let b = ProductId::new();
        let request = CreateBillRequest::for_customer(CustomerId::new())
            .line(BillLineRequest::new(a, 1))
            .line(BillLineRequest::new(b, 1))
            .line(BillLineRequest::new(a, 2));

        let ids = request.product_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
    }
}
