//! Pure financial arithmetic: VAT breakdowns, currency conversion, progress
//! claim derivation and payment allocation planning.
//!
//! Every monetary rule with a rounding step lives here, in one place. Local
//! currency amounts are rounded half-up to 2 decimals, exchange rates to 4;
//! the converted VAT is always derived as `gross - net` so the rounded triple
//! reconciles exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::VAT_EXEMPT;

/// Round a local-currency amount to 2 decimals, half-up.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an exchange rate to 4 decimals, half-up.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Effective VAT percentage for a stored rate; the -1 sentinel means exempt.
pub fn effective_vat_rate(vat_rate: i32) -> Decimal {
    if vat_rate == VAT_EXEMPT {
        Decimal::ZERO
    } else {
        Decimal::from(vat_rate)
    }
}

/// Net / VAT / gross triple. Until converted, the fields are in the quote's
/// original currency and unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatBreakdown {
    pub net: Decimal,
    pub vat: Decimal,
    pub gross: Decimal,
}

/// Break a quantity x unit price total into net / VAT / gross.
///
/// VAT-inclusive pricing treats the product as the gross and backs the net
/// out of it; exclusive pricing adds VAT on top.
pub fn vat_breakdown(
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: i32,
    vat_inclusive: bool,
) -> VatBreakdown {
    let rate = effective_vat_rate(vat_rate);
    let factor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
    let base = quantity * unit_price;

    if vat_inclusive {
        let net = base / factor;
        VatBreakdown {
            net,
            vat: base - net,
            gross: base,
        }
    } else {
        let vat = base * rate / Decimal::ONE_HUNDRED;
        VatBreakdown {
            net: base,
            vat,
            gross: base + vat,
        }
    }
}

/// Convert an original-currency breakdown to local currency at `rate`.
///
/// Net and gross are rounded independently; VAT is their difference, so
/// `net + vat == gross` holds bit-exactly after rounding.
pub fn to_local(breakdown: &VatBreakdown, rate: Decimal) -> VatBreakdown {
    let net = round_currency(breakdown.net * rate);
    let gross = round_currency(breakdown.gross * rate);
    VatBreakdown {
        net,
        vat: gross - net,
        gross,
    }
}

/// Net unit price for a quote: strips VAT when the quoted price includes it.
pub fn net_unit_price(unit_price: Decimal, vat_rate: i32, vat_inclusive: bool) -> Decimal {
    if vat_inclusive {
        let factor = Decimal::ONE + effective_vat_rate(vat_rate) / Decimal::ONE_HUNDRED;
        unit_price / factor
    } else {
        unit_price
    }
}

/// Derived amounts of a progress claim, all local currency, 2-decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAmounts {
    pub gross: Decimal,
    pub vat: Decimal,
    pub withholding: Decimal,
    pub retention: Decimal,
    pub net_payable: Decimal,
}

/// Derive a claim's amounts from the locked contract net total.
///
/// `net_payable` may go negative when deductions exceed the period's gross
/// plus VAT; that is a valid outcome, not an error.
#[allow(clippy::too_many_arguments)]
pub fn claim_amounts(
    contract_net: Decimal,
    percentage: Decimal,
    vat_rate: i32,
    withholding_rate: Decimal,
    retention_rate: Decimal,
    advance_deduction: Decimal,
    other_deductions: Decimal,
) -> ClaimAmounts {
    let gross = round_currency(contract_net * percentage / Decimal::ONE_HUNDRED);
    let vat = round_currency(gross * effective_vat_rate(vat_rate) / Decimal::ONE_HUNDRED);
    let withholding = round_currency(gross * withholding_rate / Decimal::ONE_HUNDRED);
    let retention = round_currency(gross * retention_rate / Decimal::ONE_HUNDRED);
    let receivable = gross + vat;
    let deductions = withholding + retention + advance_deduction + other_deductions;
    ClaimAmounts {
        gross,
        vat,
        withholding,
        retention,
        net_payable: round_currency(receivable - deductions),
    }
}

/// Remaining claimable percentage for an order, floored at zero.
pub fn remaining_headroom(prior_total: Decimal) -> Decimal {
    let remaining = Decimal::ONE_HUNDRED - prior_total;
    if remaining < Decimal::ZERO {
        Decimal::ZERO
    } else {
        round_currency(remaining)
    }
}

/// Plan a FIFO allocation of `amount` over the open dues, in order.
///
/// Returns the per-due payments (zero where nothing was allocated) and the
/// unallocated remainder. Dues that are not positive are skipped.
pub fn plan_allocations(amount: Decimal, dues: &[Decimal]) -> (Vec<Decimal>, Decimal) {
    let mut remaining = amount;
    let mut payments = Vec::with_capacity(dues.len());

    for &due in dues {
        if remaining <= Decimal::ZERO || due <= Decimal::ZERO {
            payments.push(Decimal::ZERO);
            continue;
        }
        let pay = if remaining >= due { due } else { remaining };
        payments.push(pay);
        remaining -= pay;
    }

    (payments, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_half_up_at_two_decimals() {
        assert_eq!(round_currency(dec("1.005")), dec("1.01"));
        assert_eq!(round_currency(dec("1.004")), dec("1.00"));
        assert_eq!(round_currency(dec("2.675")), dec("2.68"));
    }

    #[test]
    fn rounds_rates_at_four_decimals() {
        assert_eq!(round_rate(dec("34.28455")), dec("34.2846"));
        assert_eq!(round_rate(dec("34.28454")), dec("34.2845"));
    }

    #[test]
    fn exempt_vat_is_zero() {
        assert_eq!(effective_vat_rate(VAT_EXEMPT), Decimal::ZERO);
        assert_eq!(effective_vat_rate(20), dec("20"));
    }

    #[test]
    fn exclusive_breakdown_adds_vat_on_top() {
        let b = vat_breakdown(dec("10"), dec("1000"), 20, false);
        assert_eq!(b.net, dec("10000"));
        assert_eq!(b.vat, dec("2000"));
        assert_eq!(b.gross, dec("12000"));
    }

    #[test]
    fn inclusive_breakdown_backs_net_out_of_gross() {
        let b = vat_breakdown(dec("1"), dec("120"), 20, true);
        assert_eq!(b.gross, dec("120"));
        assert_eq!(round_currency(b.net), dec("100.00"));
        assert_eq!(round_currency(b.vat), dec("20.00"));
    }

    #[test]
    fn exempt_breakdown_has_no_vat_either_way() {
        let inclusive = vat_breakdown(dec("3"), dec("50"), VAT_EXEMPT, true);
        let exclusive = vat_breakdown(dec("3"), dec("50"), VAT_EXEMPT, false);
        assert_eq!(inclusive.gross, dec("150"));
        assert_eq!(inclusive.vat, Decimal::ZERO);
        assert_eq!(exclusive.gross, dec("150"));
        assert_eq!(exclusive.vat, Decimal::ZERO);
    }

    /// The worked settlement example: 10 x 1000 USD, VAT 20 exclusive, rate 30.
    #[test]
    fn local_conversion_matches_reference_figures() {
        let b = vat_breakdown(dec("10"), dec("1000"), 20, false);
        let local = to_local(&b, dec("30"));
        assert_eq!(local.net, dec("300000.00"));
        assert_eq!(local.vat, dec("60000.00"));
        assert_eq!(local.gross, dec("360000.00"));
    }

    #[test]
    fn converted_triple_always_reconciles() {
        // An awkward rate that forces rounding on both ends.
        let b = vat_breakdown(dec("7"), dec("333.33"), 20, false);
        let local = to_local(&b, dec("34.2857"));
        assert_eq!(local.net + local.vat, local.gross);
    }

    #[test]
    fn net_unit_price_strips_included_vat() {
        assert_eq!(round_currency(net_unit_price(dec("120"), 20, true)), dec("100.00"));
        assert_eq!(net_unit_price(dec("120"), 20, false), dec("120"));
    }

    /// 50% claim on a 300000 TRY contract, stopaj 5, teminat 10.
    #[test]
    fn claim_amounts_match_reference_figures() {
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
        assert_eq!(amounts.net_payable, dec("189000.00"));
    }

    #[test]
    fn claim_net_payable_may_go_negative() {
        let amounts = claim_amounts(
            dec("1000"),
            dec("10"),
            20,
            Decimal::ZERO,
            Decimal::ZERO,
            dec("500"),
            Decimal::ZERO,
        );
        // 100 gross + 20 VAT - 500 advance
        assert_eq!(amounts.net_payable, dec("-380.00"));
    }

    #[test]
    fn headroom_floors_at_zero() {
        assert_eq!(remaining_headroom(dec("60")), dec("40.00"));
        assert_eq!(remaining_headroom(dec("100")), Decimal::ZERO);
        assert_eq!(remaining_headroom(dec("120")), Decimal::ZERO);
    }

    /// Payment of 500 against dues 300 and 400: A fully paid, B partial.
    #[test]
    fn fifo_allocation_matches_reference_scenario() {
        let (payments, remainder) = plan_allocations(dec("500"), &[dec("300"), dec("400")]);
        assert_eq!(payments, vec![dec("300"), dec("200")]);
        assert_eq!(remainder, Decimal::ZERO);
    }

    #[test]
    fn overpayment_leaves_an_advance() {
        let (payments, remainder) = plan_allocations(dec("1000"), &[dec("300"), dec("400")]);
        assert_eq!(payments, vec![dec("300"), dec("400")]);
        assert_eq!(remainder, dec("300"));
    }

    #[test]
    fn settled_and_negative_dues_are_skipped() {
        let (payments, remainder) =
            plan_allocations(dec("100"), &[Decimal::ZERO, dec("-50"), dec("80")]);
        assert_eq!(payments, vec![Decimal::ZERO, Decimal::ZERO, dec("80")]);
        assert_eq!(remainder, dec("20"));
    }
}
