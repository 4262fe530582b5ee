//! Stock ledger tests
//!
//! Tests for ledger aggregation and transfer semantics:
//! - Balance accuracy (in - out - return)
//! - Transfer conservation and idempotent dual-leg posting
//! - Non-negative stock enforcement
//! - Consumption-warehouse exclusion from available stock

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Ledger simulation helpers
// ============================================================================

/// Warehouse kinds that matter to aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Physical,
    VendorVirtual,
    Consumption,
}

/// A simulated ledger entry: (warehouse, kind, direction, quantity)
type Entry = (u8, Kind, &'static str, Decimal);

/// Per-warehouse balance: in - out - return within one warehouse.
fn warehouse_balance(entries: &[Entry], warehouse: u8) -> Decimal {
    entries
        .iter()
        .filter(|(w, _, _, _)| *w == warehouse)
        .fold(Decimal::ZERO, |acc, (_, _, dir, qty)| {
            if *dir == "in" {
                acc + qty
            } else {
                acc - qty
            }
        })
}

/// Available stock: inflows into consumption warehouses do not count,
/// outflows and returns always subtract.
fn available_stock(entries: &[Entry]) -> Decimal {
    entries.iter().fold(Decimal::ZERO, |acc, (_, kind, dir, qty)| {
        if *dir == "in" {
            if *kind == Kind::Consumption {
                acc
            } else {
                acc + qty
            }
        } else {
            acc - qty
        }
    })
}

/// Dual-leg transfer with the source-balance guard.
fn simulate_transfer(
    entries: &mut Vec<Entry>,
    source: (u8, Kind),
    dest: (u8, Kind),
    quantity: Decimal,
) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    if warehouse_balance(entries, source.0) < quantity {
        return Err("Insufficient stock");
    }
    entries.push((source.0, source.1, "out", quantity));
    entries.push((dest.0, dest.1, "in", quantity));
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Balance is in minus out minus return
    #[test]
    fn test_balance_with_returns() {
        let entries: Vec<Entry> = vec![
            (1, Kind::Physical, "in", dec("100.0")),
            (1, Kind::Physical, "out", dec("30.0")),
            (1, Kind::Physical, "return", dec("10.0")),
        ];
        assert_eq!(warehouse_balance(&entries, 1), dec("60.0"));
    }

    /// Conservation: a transfer moves quantity, it never creates or destroys it
    #[test]
    fn test_transfer_conservation() {
        let mut entries: Vec<Entry> = vec![(1, Kind::VendorVirtual, "in", dec("100.0"))];

        let before_source = warehouse_balance(&entries, 1);
        let before_dest = warehouse_balance(&entries, 2);

        simulate_transfer(
            &mut entries,
            (1, Kind::VendorVirtual),
            (2, Kind::Physical),
            dec("40.0"),
        )
        .unwrap();

        assert_eq!(warehouse_balance(&entries, 1), before_source - dec("40.0"));
        assert_eq!(warehouse_balance(&entries, 2), before_dest + dec("40.0"));
    }

    /// A transfer above the source balance is rejected and posts nothing
    #[test]
    fn test_insufficient_stock_posts_nothing() {
        let mut entries: Vec<Entry> = vec![(1, Kind::Physical, "in", dec("50.0"))];
        let len_before = entries.len();

        let result = simulate_transfer(
            &mut entries,
            (1, Kind::Physical),
            (2, Kind::Physical),
            dec("60.0"),
        );

        assert!(result.is_err());
        assert_eq!(entries.len(), len_before);
    }

    /// Idempotency key semantics: one pair of legs per key
    #[test]
    fn test_idempotency_key_set_semantics() {
        // The unique key is (ref_type, ref_id, ref_direction, material, warehouse);
        // replaying a keyed transfer finds both legs present and inserts nothing.
        use std::collections::HashSet;

        let mut keys: HashSet<(&str, u32, &str, u8, u8)> = HashSet::new();
        let transfer_key = 42u32;

        // First execution writes both legs
        assert!(keys.insert(("transfer", transfer_key, "OUT", 1, 10)));
        assert!(keys.insert(("transfer", transfer_key, "IN", 1, 20)));

        // Replay inserts neither
        assert!(!keys.insert(("transfer", transfer_key, "OUT", 1, 10)));
        assert!(!keys.insert(("transfer", transfer_key, "IN", 1, 20)));
        assert_eq!(keys.len(), 2);
    }

    /// Goods moved into a consumption warehouse drop out of available stock
    #[test]
    fn test_consumption_warehouse_exclusion() {
        let mut entries: Vec<Entry> = vec![(1, Kind::Physical, "in", dec("200.0"))];

        simulate_transfer(
            &mut entries,
            (1, Kind::Physical),
            (3, Kind::Consumption),
            dec("180.0"),
        )
        .unwrap();

        // The movement history still shows the consumption warehouse inflow
        assert_eq!(warehouse_balance(&entries, 3), dec("180.0"));
        // but available stock treats it as spent.
        assert_eq!(available_stock(&entries), dec("20.0"));
    }

    /// Vendor-virtual stock is available until physically received and used
    #[test]
    fn test_vendor_virtual_counts_as_available() {
        let entries: Vec<Entry> = vec![(5, Kind::VendorVirtual, "in", dec("75.0"))];
        assert_eq!(available_stock(&entries), dec("75.0"));
    }

    /// The reference flow: invoice -> vendor location -> physical receipt
    #[test]
    fn test_vendor_to_physical_receipt_flow() {
        let mut entries: Vec<Entry> = vec![(5, Kind::VendorVirtual, "in", dec("100.0"))];

        simulate_transfer(
            &mut entries,
            (5, Kind::VendorVirtual),
            (1, Kind::Physical),
            dec("100.0"),
        )
        .unwrap();

        assert_eq!(warehouse_balance(&entries, 5), Decimal::ZERO);
        assert_eq!(warehouse_balance(&entries, 1), dec("100.0"));
        assert_eq!(available_stock(&entries), dec("100.0"));
    }
}

// ============================================================================
// FIFO matcher ordering
// ============================================================================

#[cfg(test)]
mod matcher_tests {
    use super::*;

    /// Candidate orders: (created_at ordinal, pending in vendor, complete?)
    fn first_open_with_pending(orders: &[(u32, Decimal, bool)]) -> Option<u32> {
        let mut sorted: Vec<_> = orders.iter().filter(|(_, _, complete)| !complete).collect();
        sorted.sort_by_key(|(created, _, _)| *created);
        sorted
            .iter()
            .find(|(_, pending, _)| *pending > Decimal::ZERO)
            .map(|(created, _, _)| *created)
    }

    #[test]
    fn test_oldest_order_with_pending_wins() {
        let orders = [
            (3, dec("10.0"), false),
            (1, dec("0.0"), false),
            (2, dec("5.0"), false),
        ];
        assert_eq!(first_open_with_pending(&orders), Some(2));
    }

    #[test]
    fn test_completed_orders_are_skipped() {
        let orders = [(1, dec("10.0"), true), (2, dec("10.0"), false)];
        assert_eq!(first_open_with_pending(&orders), Some(2));
    }

    #[test]
    fn test_no_candidate_leaves_movement_floating() {
        let orders = [(1, dec("0.0"), false), (2, Decimal::ZERO, false)];
        assert_eq!(first_open_with_pending(&orders), None);
    }

    /// Repeated runs over the same data bind the same order
    #[test]
    fn test_matching_is_deterministic() {
        let orders = [
            (2, dec("5.0"), false),
            (1, dec("3.0"), false),
            (3, dec("8.0"), false),
        ];
        let first = first_open_with_pending(&orders);
        for _ in 0..10 {
            assert_eq!(first_open_with_pending(&orders), first);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Conservation holds for any sequence of valid transfers
        #[test]
        fn prop_transfers_conserve_total_stock(
            initial in quantity_strategy(),
            amounts in prop::collection::vec(quantity_strategy(), 1..10)
        ) {
            let mut entries: Vec<Entry> = vec![(1, Kind::Physical, "in", initial)];
            let total_before = warehouse_balance(&entries, 1) + warehouse_balance(&entries, 2);

            for amount in amounts {
                // Ignore rejected transfers; they must not change anything.
                let _ = simulate_transfer(
                    &mut entries,
                    (1, Kind::Physical),
                    (2, Kind::Physical),
                    amount,
                );
            }

            let total_after = warehouse_balance(&entries, 1) + warehouse_balance(&entries, 2);
            prop_assert_eq!(total_before, total_after);
        }

        /// The source balance never goes negative, whatever is requested
        #[test]
        fn prop_source_balance_never_negative(
            initial in quantity_strategy(),
            amounts in prop::collection::vec(quantity_strategy(), 1..20)
        ) {
            let mut entries: Vec<Entry> = vec![(1, Kind::Physical, "in", initial)];

            for amount in amounts {
                let _ = simulate_transfer(
                    &mut entries,
                    (1, Kind::Physical),
                    (2, Kind::Physical),
                    amount,
                );
                prop_assert!(warehouse_balance(&entries, 1) >= Decimal::ZERO);
            }
        }

        /// Balance equals the fold over the entry history
        #[test]
        fn prop_balance_is_fold_of_history(
            entries in prop::collection::vec(
                (prop_oneof![Just("in"), Just("out"), Just("return")], quantity_strategy()),
                1..30
            )
        ) {
            let ledger: Vec<Entry> = entries
                .iter()
                .map(|(dir, qty)| (1u8, Kind::Physical, *dir, *qty))
                .collect();

            let expected = entries.iter().fold(Decimal::ZERO, |acc, (dir, qty)| {
                if *dir == "in" { acc + qty } else { acc - qty }
            });

            prop_assert_eq!(warehouse_balance(&ledger, 1), expected);
        }

        /// Available stock never exceeds the per-warehouse sum and consumption
        /// inflows never increase it
        #[test]
        fn prop_consumption_inflow_never_increases_available(
            initial in quantity_strategy(),
            consumed in quantity_strategy()
        ) {
            let mut entries: Vec<Entry> = vec![(1, Kind::Physical, "in", initial)];
            let available_before = available_stock(&entries);

            if simulate_transfer(
                &mut entries,
                (1, Kind::Physical),
                (3, Kind::Consumption),
                consumed,
            ).is_ok() {
                // Consumption transfer reduces available stock by the full amount
                prop_assert_eq!(available_stock(&entries), available_before - consumed);
            } else {
                prop_assert_eq!(available_stock(&entries), available_before);
            }
        }
    }
}
