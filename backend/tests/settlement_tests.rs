//! Settlement engine tests
//!
//! Tests for the currency lock and progress billing arithmetic:
//! - Lock write-once semantics and deterministic forced re-locks
//! - Round-trip rounding (net + vat == gross, no penny drift)
//! - Percentage cap across claim sequences
//! - Cascading deduction derivation

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::finance::{
    claim_amounts, remaining_headroom, round_currency, to_local, vat_breakdown,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests — currency lock
// ============================================================================

#[cfg(test)]
mod lock_tests {
    use super::*;

    /// The reference contract: 10 x 1000 USD, VAT 20 exclusive, rate 30
    #[test]
    fn test_reference_lock_figures() {
        let original = vat_breakdown(dec("10"), dec("1000"), 20, false);
        let local = to_local(&original, dec("30"));

        assert_eq!(local.net, dec("300000.00"));
        assert_eq!(local.vat, dec("60000.00"));
        assert_eq!(local.gross, dec("360000.00"));
    }

    /// Lock write-once: repeating a lock returns the stored snapshot
    #[test]
    fn test_lock_is_write_once() {
        // The lock gate is `locked_gross > 0`; once a snapshot exists, the
        // stored triple is returned unchanged and no recomputation happens.
        let snapshot = to_local(&vat_breakdown(dec("10"), dec("1000"), 20, false), dec("30"));

        let locked_gross = snapshot.gross;
        let is_locked = locked_gross > Decimal::ZERO;
        assert!(is_locked);

        // Rate moves from 30 to 35 after approval; the snapshot must not.
        let would_be = to_local(&vat_breakdown(dec("10"), dec("1000"), 20, false), dec("35"));
        assert_ne!(would_be.gross, snapshot.gross);

        let returned = if is_locked { snapshot } else { would_be };
        assert_eq!(returned.gross, dec("360000.00"));
    }

    /// Forced re-lock after a rate change is deterministic
    #[test]
    fn test_forced_relock_is_deterministic() {
        let breakdown = vat_breakdown(dec("10"), dec("1000"), 20, false);
        let first = to_local(&breakdown, dec("35"));
        let second = to_local(&breakdown, dec("35"));

        assert_eq!(first.net, second.net);
        assert_eq!(first.vat, second.vat);
        assert_eq!(first.gross, second.gross);
    }

    /// VAT-inclusive quotes back the net out of the gross before converting
    #[test]
    fn test_vat_inclusive_lock() {
        let original = vat_breakdown(dec("5"), dec("120"), 20, true);
        let local = to_local(&original, dec("2"));

        assert_eq!(local.gross, dec("1200.00"));
        assert_eq!(local.net, dec("1000.00"));
        assert_eq!(local.vat, dec("200.00"));
    }

    /// The exempt sentinel behaves as zero VAT
    #[test]
    fn test_exempt_vat_lock() {
        let original = vat_breakdown(dec("4"), dec("250"), -1, false);
        let local = to_local(&original, dec("1"));

        assert_eq!(local.net, dec("1000.00"));
        assert_eq!(local.vat, Decimal::ZERO);
        assert_eq!(local.gross, dec("1000.00"));
    }
}

// ============================================================================
// Unit Tests — progress billing
// ============================================================================

#[cfg(test)]
mod claim_tests {
    use super::*;

    /// The reference claim: 50% of a 300000 TRY contract, stopaj 5, teminat 10
    #[test]
    fn test_reference_claim_figures() {
        let amounts = claim_amounts(
            dec("300000"),
            dec("50"),
            20,
            dec("5"),
            dec("10"),
            Decimal::ZERO,
            Decimal::ZERO,
        );

        assert_eq!(amounts.gross, dec("180000.00"));
        assert_eq!(amounts.vat, dec("36000.00"));
        assert_eq!(amounts.withholding, dec("9000.00"));
        assert_eq!(amounts.retention, dec("18000.00"));
        // 180000 + 36000 - 9000 - 18000
        assert_eq!(amounts.net_payable, dec("189000.00"));
    }

    /// Advance and other deductions cascade after the rate-based ones
    #[test]
    fn test_all_deductions_cascade() {
        let amounts = claim_amounts(
            dec("100000"),
            dec("30"),
            20,
            dec("3"),
            dec("5"),
            dec("2000"),
            dec("500"),
        );

        assert_eq!(amounts.gross, dec("30000.00"));
        assert_eq!(amounts.vat, dec("6000.00"));
        assert_eq!(amounts.withholding, dec("900.00"));
        assert_eq!(amounts.retention, dec("1500.00"));
        // (30000 + 6000) - (900 + 1500 + 2000 + 500)
        assert_eq!(amounts.net_payable, dec("31100.00"));
    }

    /// Deductions above the receivable produce a negative payable, not an error
    #[test]
    fn test_negative_net_payable_is_valid() {
        let amounts = claim_amounts(
            dec("1000"),
            dec("5"),
            20,
            Decimal::ZERO,
            Decimal::ZERO,
            dec("100"),
            Decimal::ZERO,
        );
        // 50 + 10 - 100
        assert_eq!(amounts.net_payable, dec("-40.00"));
    }

    /// Cap check sequence: the rejecting call reports the remaining headroom
    #[test]
    fn test_cap_check_sequence() {
        let mut accepted = Decimal::ZERO;

        for (pct, should_pass) in [
            (dec("40"), true),
            (dec("35"), true),
            (dec("30"), false), // 40 + 35 + 30 > 100
            (dec("25"), true),  // exactly reaches 100
            (dec("0.01"), false),
        ] {
            let passes = accepted + pct <= Decimal::ONE_HUNDRED;
            assert_eq!(passes, should_pass, "pct {}", pct);
            if passes {
                accepted += pct;
            }
        }

        assert_eq!(accepted, Decimal::ONE_HUNDRED);
        assert_eq!(remaining_headroom(accepted), Decimal::ZERO);
    }

    #[test]
    fn test_headroom_reporting() {
        assert_eq!(remaining_headroom(dec("75")), dec("25.00"));
        assert_eq!(remaining_headroom(Decimal::ZERO), dec("100.00"));
        // An over-claimed order (legacy data) still reports zero, not negative
        assert_eq!(remaining_headroom(dec("130")), Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 1000.00
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn rate_strategy() -> impl Strategy<Value = Decimal> {
        (10000i64..=1000000i64).prop_map(|n| Decimal::new(n, 4)) // 1.0000 to 100.0000
    }

    fn vat_strategy() -> impl Strategy<Value = i32> {
        prop_oneof![Just(-1), Just(0), Just(5), Just(10), Just(16), Just(20)]
    }

    fn percentage_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 100.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Round-trip rounding: net + vat == gross for every locked triple
        #[test]
        fn prop_no_penny_drift(
            quantity in quantity_strategy(),
            price in price_strategy(),
            vat_rate in vat_strategy(),
            inclusive in any::<bool>(),
            rate in rate_strategy()
        ) {
            let original = vat_breakdown(quantity, price, vat_rate, inclusive);
            let local = to_local(&original, rate);

            prop_assert_eq!(local.net + local.vat, local.gross);
            // Everything is at currency precision
            prop_assert_eq!(local.net, round_currency(local.net));
            prop_assert_eq!(local.gross, round_currency(local.gross));
        }

        /// Locking the same inputs twice yields the same snapshot
        #[test]
        fn prop_lock_is_deterministic(
            quantity in quantity_strategy(),
            price in price_strategy(),
            vat_rate in vat_strategy(),
            inclusive in any::<bool>(),
            rate in rate_strategy()
        ) {
            let a = to_local(&vat_breakdown(quantity, price, vat_rate, inclusive), rate);
            let b = to_local(&vat_breakdown(quantity, price, vat_rate, inclusive), rate);
            prop_assert_eq!(a.net, b.net);
            prop_assert_eq!(a.vat, b.vat);
            prop_assert_eq!(a.gross, b.gross);
        }

        /// Accepted claim percentages never sum past 100
        #[test]
        fn prop_cap_never_exceeded(
            percentages in prop::collection::vec(percentage_strategy(), 1..20)
        ) {
            let mut accepted = Decimal::ZERO;

            for pct in percentages {
                if accepted + pct <= Decimal::ONE_HUNDRED {
                    accepted += pct;
                }
                prop_assert!(accepted <= Decimal::ONE_HUNDRED);
            }
        }

        /// The claim derivation identity holds for any inputs
        #[test]
        fn prop_claim_net_payable_identity(
            contract_net in price_strategy(),
            pct in percentage_strategy(),
            vat_rate in vat_strategy(),
            withholding in (0i64..=3000).prop_map(|n| Decimal::new(n, 2)),
            retention in (0i64..=3000).prop_map(|n| Decimal::new(n, 2)),
            advance in (0i64..=100000).prop_map(|n| Decimal::new(n, 2)),
            other in (0i64..=100000).prop_map(|n| Decimal::new(n, 2))
        ) {
            let amounts = claim_amounts(
                contract_net, pct, vat_rate, withholding, retention, advance, other,
            );

            let expected = round_currency(
                amounts.gross + amounts.vat
                    - (amounts.withholding + amounts.retention + advance + other),
            );
            prop_assert_eq!(amounts.net_payable, expected);

            // Each component is at currency precision
            prop_assert_eq!(amounts.gross, round_currency(amounts.gross));
            prop_assert_eq!(amounts.vat, round_currency(amounts.vat));
        }

        /// A claim's gross scales linearly with the percentage before rounding
        #[test]
        fn prop_full_contract_claim_equals_contract_net(
            contract_net in price_strategy(),
            vat_rate in vat_strategy()
        ) {
            let amounts = claim_amounts(
                contract_net,
                Decimal::ONE_HUNDRED,
                vat_rate,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
            );
            prop_assert_eq!(amounts.gross, round_currency(contract_net));
        }
    }
}
