//! Bill DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{CustomerId, Money, ProductId};
use domain_billing::{
    Bill, BillDetail, BillItem, BillLineRequest, BillSummary, CreateBillRequest, CreatedBill, DeletedBill,
    PaymentStatus, RestoredStock,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillBody {
    #[validate(required(message = "customer reference is required"))]
    pub customer_id: Option<Uuid>,
    pub tax_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub payment_status: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "a bill needs at least one line item"), nested)]
    pub items: Vec<BillItemBody>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillItemBody {
    pub product_id: Uuid,
    #[validate(range(min = 1i64, max = 4294967295i64, message = "quantity must be positive"))]
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

impl CreateBillBody {
    /// Converts the validated body into a domain request
    pub fn into_request(self) -> Result<CreateBillRequest, ApiError> {
        let payment_status = match self.payment_status.as_deref() {
            Some(status) => status.parse::<PaymentStatus>()?,
            None => PaymentStatus::default(),
        };

        let items = self
            .items
            .into_iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity)
                    .map_err(|_| ApiError::BadRequest(format!("quantity {} out of range", item.quantity)))?;
                Ok(BillLineRequest {
                    product_id: ProductId::from(item.product_id),
                    quantity,
                    unit_price: item.unit_price.map(Money::new),
                    total_price: item.total_price.map(Money::new),
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(CreateBillRequest {
            customer_id: self.customer_id.map(CustomerId::from),
            tax_amount: self.tax_amount.map(Money::new).unwrap_or(Money::ZERO),
            discount_amount: self.discount_amount.map(Money::new).unwrap_or(Money::ZERO),
            payment_status,
            notes: self.notes,
            items,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBillResponse {
    pub bill_id: Uuid,
    pub bill_number: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

impl From<CreatedBill> for CreatedBillResponse {
    fn from(created: CreatedBill) -> Self {
        Self {
            bill_id: created.bill_id.into(),
            bill_number: created.bill_number,
            subtotal: created.totals.subtotal.amount(),
            tax_amount: created.totals.tax_amount.amount(),
            discount_amount: created.totals.discount_amount.amount(),
            total_amount: created.totals.total_amount.amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    pub id: Uuid,
    pub bill_number: String,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BillResponse {
    fn from_bill(bill: Bill, customer_name: Option<String>) -> Self {
        Self {
            id: bill.id.into(),
            bill_number: bill.bill_number,
            customer_id: bill.customer_id.into(),
            customer_name,
            subtotal: bill.totals.subtotal.amount(),
            tax_amount: bill.totals.tax_amount.amount(),
            discount_amount: bill.totals.discount_amount.amount(),
            total_amount: bill.totals.total_amount.amount(),
            payment_status: bill.payment_status.to_string(),
            notes: bill.notes,
            created_at: bill.created_at,
        }
    }
}

impl From<BillSummary> for BillResponse {
    fn from(summary: BillSummary) -> Self {
        Self::from_bill(summary.bill, Some(summary.customer_name))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItemResponse {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<BillItem> for BillItemResponse {
    fn from(item: BillItem) -> Self {
        Self {
            id: item.id.into(),
            bill_id: item.bill_id.into(),
            product_id: item.product_id.into(),
            quantity: item.quantity,
            unit_price: item.unit_price.amount(),
            total_price: item.total_price.amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDetailResponse {
    #[serde(flatten)]
    pub bill: BillResponse,
    pub items: Vec<BillItemResponse>,
}

impl From<BillDetail> for BillDetailResponse {
    fn from(detail: BillDetail) -> Self {
        Self {
            bill: BillResponse::from_bill(detail.bill, detail.customer_name),
            items: detail.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredStockResponse {
    pub product_id: Uuid,
    pub quantity: u32,
}

impl From<RestoredStock> for RestoredStockResponse {
    fn from(restored: RestoredStock) -> Self {
        Self {
            product_id: restored.product_id.into(),
            quantity: restored.quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedBillResponse {
    pub bill_id: Uuid,
    pub existed: bool,
    pub items_removed: u64,
    pub restored: Vec<RestoredStockResponse>,
    pub warnings: Vec<String>,
}

impl From<DeletedBill> for DeletedBillResponse {
    fn from(deleted: DeletedBill) -> Self {
        let warnings = deleted
            .missing_products
            .iter()
            .map(|missing| {
                format!(
                    "product {} no longer exists; {} unit(s) not restored",
                    missing.product_id.as_uuid(),
                    missing.quantity
                )
            })
            .collect();

        Self {
            bill_id: deleted.bill_id.into(),
            existed: deleted.existed,
            items_removed: deleted.items_removed,
            restored: deleted.restored.into_iter().map(Into::into).collect(),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_body_accepts_numbers_and_strings() {
        let body: CreateBillBody = serde_json::from_value(json!({
            "customerId": Uuid::new_v4(),
            "taxAmount": "2.00",
            "discountAmount": 1,
            "items": [{ "productId": Uuid::new_v4(), "quantity": 3, "unitPrice": 9.5 }]
        }))
        .unwrap();

        assert!(body.validate().is_ok());
        let request = body.into_request().unwrap();
        assert_eq!(request.tax_amount, Money::new(dec!(2.00)));
        assert_eq!(request.items[0].unit_price, Some(Money::new(dec!(9.50))));
        assert_eq!(request.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_missing_customer_and_items_fail_validation() {
        let body: CreateBillBody = serde_json::from_value(json!({})).unwrap();
        let errors = body.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_id"));
        assert!(fields.contains_key("items"));
    }

    #[test]
    fn test_zero_quantity_fails_validation() {
        let body: CreateBillBody = serde_json::from_value(json!({
            "customerId": Uuid::new_v4(),
            "items": [{ "productId": Uuid::new_v4(), "quantity": 0 }]
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_unknown_payment_status_is_rejected() {
        let body: CreateBillBody = serde_json::from_value(json!({
            "customerId": Uuid::new_v4(),
            "paymentStatus": "refunded",
            "items": [{ "productId": Uuid::new_v4(), "quantity": 1 }]
        }))
        .unwrap();
        assert!(matches!(body.into_request(), Err(ApiError::BadRequest(_))));
    }
}
