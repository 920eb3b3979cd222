//! Basis-point arithmetic shared by the signal and execution layers.

use rust_decimal::Decimal;

const BPS_DENOMINATOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Convert a basis-point figure into a plain ratio (5 bps -> 0.0005).
pub fn bps_to_ratio(bps: Decimal) -> Decimal {
    bps / BPS_DENOMINATOR
}

/// Scale `value` up (positive bps) or down (negative bps).
pub fn apply_bps(value: Decimal, bps: Decimal) -> Decimal {
    value * (Decimal::ONE + bps_to_ratio(bps))
}

/// Express the relative move from `reference` to `value` in basis points.
pub fn ratio_as_bps(value: Decimal, reference: Decimal) -> Decimal {
    (value - reference) / reference * BPS_DENOMINATOR
}
