//! Fixed-point U256 arithmetic for collateral and health factor math.
//!
//! All USD values and health factors are WAD (18-decimal) fixed point.
//! Percentages are whole numbers over [`PERCENT_DENOMINATOR`].

use alloy::primitives::U256;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Scale factor lifting an 8-decimal feed answer to WAD (1e10)
pub const ADDITIONAL_FEED_PRECISION: U256 = U256::from_limbs([10_000_000_000u64, 0, 0, 0]);

/// Denominator for whole-number percentages (100 = 100%)
pub const PERCENT_DENOMINATOR: U256 = U256::from_limbs([100u64, 0, 0, 0]);

/// Largest health factor an indebted account can have.
pub const MAX_FINITE_HF: U256 = U256::from_limbs([u64::MAX - 1, u64::MAX, u64::MAX, u64::MAX]);

/// Power of 10 as U256.
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// `a * b / denominator`, `None` on overflow or a zero denominator.
#[inline(always)]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    a.checked_mul(b).map(|product| product / denominator)
}

/// `a * b / denominator`, saturating at `U256::MAX` on overflow.
#[inline(always)]
pub fn mul_div_saturating(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::MAX;
    }
    match a.checked_mul(b) {
        Some(product) => product / denominator,
        None => U256::MAX,
    }
}

/// Apply a whole-number percentage.
/// Returns: value * pct / 100
///
/// Example: apply_percent(1000, 10) = 100
#[inline(always)]
pub fn apply_percent(value: U256, pct: u8) -> Option<U256> {
    mul_div(value, U256::from(pct), PERCENT_DENOMINATOR)
}

/// Calculate health factor in WAD (18 decimals).
/// HF = (collateral_adjusted * 10^18) / debt
///
/// Returns U256::MAX if and only if debt is zero; an overflowing result
/// with nonzero debt is clamped to `MAX_FINITE_HF`.
#[inline(always)]
pub fn calculate_hf_wad(collateral_adjusted_wad: U256, debt_wad: U256) -> U256 {
    if debt_wad.is_zero() {
        return U256::MAX;
    }
    mul_div_saturating(collateral_adjusted_wad, WAD, debt_wad).min(MAX_FINITE_HF)
}

/// Check if health factor is under the floor.
#[inline(always)]
pub fn is_below_floor(hf_wad: U256, floor_wad: U256) -> bool {
    hf_wad < floor_wad
}

/// Convert WAD (18 decimals) to f64.
/// Use only for display/logging, not for computation.
#[inline(always)]
pub fn wad_to_f64(wad: U256) -> f64 {
    if wad <= U256::from(u128::MAX) {
        let value: u128 = wad.to();
        value as f64 / 1e18
    } else {
        wad.to_string().parse::<f64>().unwrap_or(f64::MAX) / 1e18
    }
}

/// Convert f64 to WAD (18 decimals).
/// Use for converting user input to U256.
#[inline(always)]
pub fn f64_to_wad(value: f64) -> U256 {
    if value <= 0.0 || !value.is_finite() {
        return U256::ZERO;
    }
    U256::from((value * 1e18) as u128)
}

/// Decimal places resolved in f64 before scaling up in U256.
const F64_FIXED_DECIMALS: u8 = 18;

/// Convert f64 to a fixed-point integer with `decimals` places.
///
/// Places beyond 18 are added in U256. `None` if the scaled value does not
/// fit in a u128 at 18 places.
#[inline(always)]
pub fn f64_to_fixed(value: f64, decimals: u8) -> Option<U256> {
    if value <= 0.0 || !value.is_finite() {
        return Some(U256::ZERO);
    }
    let places = decimals.min(F64_FIXED_DECIMALS);
    let scaled = (value * 10f64.powi(places as i32)).round();
    if scaled >= u128::MAX as f64 {
        return None;
    }
    U256::from(scaled as u128).checked_mul(pow10(decimals - places))
}

/// Render a health factor for logs ("max" for debt-free accounts).
pub fn format_hf(hf_wad: U256) -> String {
    if hf_wad == U256::MAX {
        "max".to_string()
    } else {
        format!("{:.4}", wad_to_f64(hf_wad))
    }
}
