//! Bill headers and line items
//!
//! A bill is created together with all of its lines in one transaction and
//! is never partially persisted. Line prices are snapshots taken at sale
//! time and do not follow later catalog price changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BillId, BillItemId, CustomerId, Money, ProductId};

use crate::error::BillingError;

/// Largest amount a bill or line may carry (`NUMERIC(14, 2)` columns)
pub const MAX_BILL_AMOUNT: Decimal = dec!(999999999999.99);

/// Rejects amounts that cannot be stored
///
/// # Errors
///
/// Returns `InvalidRequest` naming `what` when `amount` exceeds
/// [`MAX_BILL_AMOUNT`]
pub fn ensure_storable(what: &str, amount: Money) -> Result<Money, BillingError> {
    if amount.amount() > MAX_BILL_AMOUNT {
        return Err(BillingError::invalid(format!(
            "{} {} exceeds the maximum of {}",
            what, amount, MAX_BILL_AMOUNT
        )));
    }
    Ok(amount)
}

/// Payment status of a bill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not yet paid
    #[default]
    Pending,
    /// Partially paid
    Partial,
    /// Fully paid
    Paid,
    /// Voided by the business
    Cancelled,
}

impl PaymentStatus {
    /// Returns the storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "unpaid" => Ok(PaymentStatus::Pending),
            "partial" | "partially_paid" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
            other => Err(BillingError::invalid(format!("unknown payment status '{}'", other))),
        }
    }
}

/// Monetary totals of a bill
///
/// `total_amount` is always `subtotal + tax_amount - discount_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl BillTotals {
    /// Computes the totals of a bill
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the discount would drive the total below zero
    /// or any amount is too large to store
    pub fn compute(subtotal: Money, tax_amount: Money, discount_amount: Money) -> Result<Self, BillingError> {
        ensure_storable("subtotal", subtotal)?;
        let total_amount = subtotal.checked_add(tax_amount)?.checked_sub(discount_amount)?;
        ensure_storable("total amount", total_amount)?;
        if total_amount.is_negative() {
            return Err(BillingError::invalid(format!(
                "discount {} exceeds subtotal {} plus tax {}",
                discount_amount, subtotal, tax_amount
            )));
        }

        Ok(Self {
            subtotal,
            tax_amount,
            discount_amount,
            total_amount,
        })
    }

    /// Checks the total against its components
    pub fn is_consistent(&self) -> bool {
        self.subtotal
            .checked_add(self.tax_amount)
            .and_then(|gross| gross.checked_sub(self.discount_amount))
            .is_ok_and(|total| total == self.total_amount)
    }
}

/// An invoice header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier
    pub id: BillId,
    /// Human-readable bill number
    pub bill_number: String,
    /// Customer being billed
    pub customer_id: CustomerId,
    /// Monetary totals
    #[serde(flatten)]
    pub totals: BillTotals,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Free-text notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A line on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: BillItemId,
    pub bill_id: BillId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price charged per unit at sale time
    pub unit_price: Money,
    /// `quantity * unit_price`
    pub total_price: Money,
}

impl BillItem {
    /// Creates a line, computing its total from the price snapshot
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the line total is too large to store
    pub fn new(bill_id: BillId, product_id: ProductId, quantity: u32, unit_price: Money) -> Result<Self, BillingError> {
        let total_price = ensure_storable("line total", unit_price.times(quantity)?)?;
        Ok(Self {
            id: BillItemId::new_v7(),
            bill_id,
            product_id,
            quantity,
            unit_price,
            total_price,
        })
    }
}

/// A bill as shown in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillSummary {
    #[serde(flatten)]
    pub bill: Bill,
    pub customer_name: String,
}

/// A bill with its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub customer_name: Option<String>,
    pub items: Vec<BillItem>,
}
