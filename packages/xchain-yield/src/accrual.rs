//! Yield accrual
//!
//! Simple (non-compounding) interest on the deposited principal:
//!
//! ```text
//! accrued = principal * rate_bps * elapsed_secs / (10_000 * SECONDS_PER_YEAR)
//! ```
//!
//! Computed in 128-bit integers and truncated toward zero.

/// Basis points in 100%
pub const BPS_DENOMINATOR: u128 = 10_000;

/// 365-day year
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 3600;

/// Yield accrued on `principal` at `rate_bps` over `elapsed_secs`.
///
/// Returns zero for an empty position, a zero rate, or a non-positive
/// interval. Saturates at `u64::MAX`.
pub fn accrued_yield(principal: u64, elapsed_secs: i64, rate_bps: u64) -> u64 {
    if principal == 0 || rate_bps == 0 || elapsed_secs <= 0 {
        return 0;
    }
    // Any numerator past u128 divides to well above u64::MAX.
    let Some(numerator) = (principal as u128)
        .checked_mul(rate_bps as u128)
        .and_then(|v| v.checked_mul(elapsed_secs as u128))
    else {
        return u64::MAX;
    };
    let value = numerator / (BPS_DENOMINATOR * SECONDS_PER_YEAR);
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Annual percentage rate in basis points rendered as a percentage string,
/// e.g. `520` -> `"5.20%"`.
pub fn format_bps(rate_bps: u64) -> String {
    format!("{}.{:02}%", rate_bps / 100, rate_bps % 100)
}
