//! Unit tests for the Identifiers module
//!
//! Tests cover creation, parsing, conversion, and display formatting
//! for every identifier used by the billing subsystem.

use core_kernel::{BillId, BillItemId, CustomerId, ProductId};
use uuid::Uuid;

mod bill_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = BillId::new();
        let id2 = BillId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = BillId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = BillId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = BillId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(BillId::prefix(), "BIL");
    }

    #[test]
    fn test_from_str_with_and_without_prefix() {
        let original = BillId::new();
        let with_prefix: BillId = original.to_string().parse().unwrap();
        let bare: BillId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, with_prefix);
        assert_eq!(original, bare);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("BIL-not-a-uuid".parse::<BillId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = BillId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}

mod other_ids {
    use super::*;

    #[test]
    fn test_prefixes_are_distinct() {
        let prefixes = [
            ProductId::prefix(),
            CustomerId::prefix(),
            BillId::prefix(),
            BillItemId::prefix(),
        ];
        for (i, a) in prefixes.iter().enumerate() {
            for b in &prefixes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_product_ids_sort_by_uuid() {
        let low = ProductId::from_uuid(Uuid::from_u128(1));
        let high = ProductId::from_uuid(Uuid::from_u128(2));
        assert!(low < high);
    }
}
