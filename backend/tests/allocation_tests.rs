//! Payment allocation tests
//!
//! Tests for FIFO settlement and advance tracking:
//! - Allocation conservation (allocations + advance == payment amount)
//! - Strict FIFO order over the target list
//! - Advance re-matching consumes only the remainder
//! - Paid-to-date as a pure function of allocations

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::finance::plan_allocations;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The reference scenario: 500 against invoices due 300 and 400
    #[test]
    fn test_reference_allocation() {
        let (payments, remainder) = plan_allocations(dec("500"), &[dec("300"), dec("400")]);

        // Invoice A fully paid, invoice B partially, nothing left over
        assert_eq!(payments, vec![dec("300"), dec("200")]);
        assert_eq!(remainder, Decimal::ZERO);
    }

    /// Earlier targets are exhausted before later ones see any money
    #[test]
    fn test_strict_fifo_order() {
        let (payments, _) = plan_allocations(dec("350"), &[dec("300"), dec("400")]);
        assert_eq!(payments[0], dec("300"));
        assert_eq!(payments[1], dec("50"));

        // Reversed target order reverses the outcome
        let (payments, _) = plan_allocations(dec("350"), &[dec("400"), dec("300")]);
        assert_eq!(payments[0], dec("350"));
        assert_eq!(payments[1], Decimal::ZERO);
    }

    /// An overpayment leaves an advance, never an over-allocation
    #[test]
    fn test_overpayment_becomes_advance() {
        let (payments, remainder) = plan_allocations(dec("1000"), &[dec("300"), dec("400")]);

        assert_eq!(payments, vec![dec("300"), dec("400")]);
        assert_eq!(remainder, dec("300"));

        // No target ever receives more than its due
        assert!(payments[0] <= dec("300"));
        assert!(payments[1] <= dec("400"));
    }

    /// Settled targets are skipped without consuming anything
    #[test]
    fn test_settled_targets_skipped() {
        let (payments, remainder) =
            plan_allocations(dec("100"), &[Decimal::ZERO, dec("60"), dec("80")]);

        assert_eq!(payments, vec![Decimal::ZERO, dec("60"), dec("40")]);
        assert_eq!(remainder, Decimal::ZERO);
    }

    /// Advance re-matching: the second run starts from the remainder
    #[test]
    fn test_advance_rematch_uses_remainder_only() {
        let amount = dec("1000");

        // First run against one invoice of 400
        let (first, remainder) = plan_allocations(amount, &[dec("400")]);
        assert_eq!(remainder, dec("600"));

        // A new invoice of 500 appears; matching consumes only the advance.
        let (second, final_remainder) = plan_allocations(remainder, &[dec("500")]);
        assert_eq!(second, vec![dec("500")]);
        assert_eq!(final_remainder, dec("100"));

        // Total allocated never exceeds the payment amount.
        let total: Decimal = first.iter().chain(second.iter()).sum();
        assert_eq!(total + final_remainder, amount);
    }

    /// Re-running against the same (now settled) targets allocates nothing
    #[test]
    fn test_rematch_is_repeat_safe() {
        let (first, remainder) = plan_allocations(dec("300"), &[dec("300")]);
        assert_eq!(first, vec![dec("300")]);

        // The due is now zero; a repeat run is a no-op.
        let (second, second_remainder) = plan_allocations(remainder, &[Decimal::ZERO]);
        assert_eq!(second, vec![Decimal::ZERO]);
        assert_eq!(second_remainder, Decimal::ZERO);
    }

    /// Paid-to-date is the sum of a target's allocations, so deleting a
    /// payment re-derives it with no counter to fix
    #[test]
    fn test_paid_to_date_is_derived() {
        let mut allocations: Vec<(u32, Decimal)> = vec![
            (1, dec("300")), // payment 1
            (2, dec("150")), // payment 2
        ];

        let paid: Decimal = allocations.iter().map(|(_, a)| a).sum();
        assert_eq!(paid, dec("450"));

        // Payment 2 is deleted together with its allocations
        allocations.retain(|(payment, _)| *payment != 2);
        let paid: Decimal = allocations.iter().map(|(_, a)| a).sum();
        assert_eq!(paid, dec("300"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 100000.00
    }

    fn dues_strategy() -> impl Strategy<Value = Vec<Decimal>> {
        prop::collection::vec((0i64..=1000000i64).prop_map(|n| Decimal::new(n, 2)), 0..15)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Conservation: allocations + advance == payment amount, always
        #[test]
        fn prop_allocation_conservation(
            amount in amount_strategy(),
            dues in dues_strategy()
        ) {
            let (payments, remainder) = plan_allocations(amount, &dues);
            let allocated: Decimal = payments.iter().sum();

            prop_assert_eq!(allocated + remainder, amount);
            prop_assert!(remainder >= Decimal::ZERO);
        }

        /// No target ever receives more than its due
        #[test]
        fn prop_no_target_overpaid(
            amount in amount_strategy(),
            dues in dues_strategy()
        ) {
            let (payments, _) = plan_allocations(amount, &dues);

            for (payment, due) in payments.iter().zip(dues.iter()) {
                prop_assert!(payment <= due || *due <= Decimal::ZERO);
                prop_assert!(*payment >= Decimal::ZERO);
            }
        }

        /// FIFO: a target receives money only when every earlier target with
        /// a positive due is fully settled
        #[test]
        fn prop_fifo_no_skipping(
            amount in amount_strategy(),
            dues in dues_strategy()
        ) {
            let (payments, _) = plan_allocations(amount, &dues);

            for i in 0..payments.len() {
                if payments[i] > Decimal::ZERO {
                    for j in 0..i {
                        if dues[j] > Decimal::ZERO {
                            prop_assert_eq!(payments[j], dues[j]);
                        }
                    }
                }
            }
        }

        /// Splitting a payment across two runs allocates the same as one run
        #[test]
        fn prop_rematch_equals_single_run(
            amount in amount_strategy(),
            dues in dues_strategy()
        ) {
            prop_assume!(!dues.is_empty());

            let split = dues.len() / 2;
            let (first_half, first_remainder) = plan_allocations(amount, &dues[..split]);
            let (second_half, final_remainder) = plan_allocations(first_remainder, &dues[split..]);

            let (single, single_remainder) = plan_allocations(amount, &dues);

            let two_run: Vec<Decimal> = first_half.into_iter().chain(second_half).collect();
            prop_assert_eq!(two_run, single);
            prop_assert_eq!(final_remainder, single_remainder);
        }
    }
}
