//! Tests for domain_billing that need no store

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BillId, CustomerId, Money, ProductId};

use domain_billing::{
    BillItem, BillLineRequest, BillTotals, BillingError, CreateBillRequest, NumberingSequence, PaymentStatus,
    ProductStock, StockLedger,
};

// ============================================================================
// Numbering Tests
// ============================================================================

mod numbering_tests {
    use super::*;

    #[test]
    fn test_custom_prefix_and_width() {
        let seq = NumberingSequence::new("INV").with_width(6);
        assert_eq!(seq.next(["INV-000041"]).unwrap().to_string(), "INV-000042");
    }

    #[test]
    fn test_numbers_without_digits_are_ignored() {
        let seq = NumberingSequence::default();
        let next = seq.next(["DRAFT", "", "BILL-"]).unwrap();
        assert_eq!(next.sequence(), 1);
    }

    #[test]
    fn test_generated_numbers_are_parseable() {
        let seq = NumberingSequence::default();
        let number = seq.format(77).to_string();
        assert_eq!(NumberingSequence::suffix_of(&number), Some(77));
    }

    proptest! {
        #[test]
        fn prop_next_exceeds_every_existing(suffixes in prop::collection::vec(0u64..1_000_000, 0..40)) {
            let seq = NumberingSequence::default();
            let existing: Vec<String> = suffixes.iter().map(|s| format!("BILL-{:04}", s)).collect();

            let next = seq.next(existing.iter().map(String::as_str)).unwrap();

            let max = suffixes.iter().copied().max().unwrap_or(0);
            prop_assert_eq!(next.sequence(), max + 1);
        }

        #[test]
        fn prop_repeated_allocation_is_strictly_increasing(count in 1usize..30) {
            let seq = NumberingSequence::default();
            let mut issued: Vec<String> = Vec::new();
            let mut last = 0;

            for _ in 0..count {
                let next = seq.next(issued.iter().map(String::as_str)).unwrap();
                prop_assert!(next.sequence() > last);
                last = next.sequence();
                issued.push(next.to_string());
            }

            let mut distinct = issued.clone();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(distinct.len(), issued.len());
        }
    }
}

// ============================================================================
// Totals Tests
// ============================================================================

mod totals_tests {
    use super::*;

    #[test]
    fn test_zero_total_is_allowed() {
        let totals = BillTotals::compute(Money::new(dec!(10)), Money::ZERO, Money::new(dec!(10))).unwrap();
        assert!(totals.total_amount.is_zero());
    }

    #[test]
    fn test_subtotal_is_sum_of_lines() {
        let bill_id = BillId::new();
        let lines = [
            BillItem::new(bill_id, ProductId::new(), 3, Money::new(dec!(10.00))).unwrap(),
            BillItem::new(bill_id, ProductId::new(), 2, Money::new(dec!(4.25))).unwrap(),
        ];
        let subtotal = Money::checked_sum(lines.iter().map(|l| l.total_price)).unwrap();
        assert_eq!(subtotal, Money::new(dec!(38.50)));
    }

    proptest! {
        #[test]
        fn prop_totals_are_consistent(
            subtotal in 0i64..10_000_000,
            tax in 0i64..1_000_000,
            discount in 0i64..1_000_000,
        ) {
            let subtotal = Money::from_minor(subtotal);
            let tax = Money::from_minor(tax);
            let discount = Money::from_minor(discount);

            match BillTotals::compute(subtotal, tax, discount) {
                Ok(totals) => {
                    prop_assert!(totals.is_consistent());
                    prop_assert!(!totals.total_amount.is_negative());
                }
                Err(e) => {
                    prop_assert!(matches!(e, BillingError::InvalidRequest(_)));
                    prop_assert!(subtotal.amount() + tax.amount() < discount.amount());
                }
            }
        }
    }
}

// ============================================================================
// Stock Ledger Tests
// ============================================================================

mod ledger_tests {
    use super::*;

    fn product(available: u32) -> ProductStock {
        ProductStock {
            product_id: ProductId::new(),
            code: format!("SKU-{}", available),
            name: "Ceramic mug".to_string(),
            unit_price: Money::new(dec!(3.00)),
            available_quantity: available,
        }
    }

    #[test]
    fn test_failed_line_reserves_nothing() {
        let row = product(2);
        let id = row.product_id;
        let mut ledger = StockLedger::from_stock([row]);

        assert!(ledger.check_and_reserve(id, 3).is_err());
        assert_eq!(ledger.remaining(id), Some(2));
        assert_eq!(ledger.pending_decrements().count(), 0);
    }

    #[test]
    fn test_decrements_are_in_id_order() {
        let rows = [product(5), product(6), product(7)];
        let mut ids: Vec<ProductId> = rows.iter().map(|r| r.product_id).collect();
        let mut ledger = StockLedger::from_stock(rows);

        for id in ids.iter().rev() {
            ledger.check_and_reserve(*id, 1).unwrap();
        }

        ids.sort();
        let order: Vec<ProductId> = ledger.pending_decrements().map(|(id, _)| id).collect();
        assert_eq!(order, ids);
    }

    proptest! {
        #[test]
        fn prop_reservations_never_exceed_stock(
            available in 0u32..50,
            quantities in prop::collection::vec(1u32..10, 1..12),
        ) {
            let row = product(available);
            let id = row.product_id;
            let mut ledger = StockLedger::from_stock([row]);

            let mut accepted = 0u32;
            for quantity in quantities {
                if ledger.check_and_reserve(id, quantity).is_ok() {
                    accepted += quantity;
                }
            }

            prop_assert!(accepted <= available);
            prop_assert_eq!(ledger.remaining(id), Some(available - accepted));
        }
    }
}

// ============================================================================
// Request Tests
// ============================================================================

mod request_tests {
    use super::*;

    #[test]
    fn test_valid_request_returns_customer() {
        let customer = CustomerId::new();
        let request = CreateBillRequest::for_customer(customer)
            .line(BillLineRequest::new(ProductId::new(), 2))
            .with_payment_status(PaymentStatus::Paid)
            .with_notes("counter sale");

        assert_eq!(request.validate().unwrap(), customer);
    }

    #[test]
    fn test_negative_unit_price_names_line() {
        let request = CreateBillRequest::for_customer(CustomerId::new())
            .line(BillLineRequest::new(ProductId::new(), 1))
            .line(BillLineRequest::new(ProductId::new(), 1).with_unit_price(Money::new(Decimal::NEGATIVE_ONE)));

        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
