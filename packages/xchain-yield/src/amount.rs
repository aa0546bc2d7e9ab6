//! Decimal amount conversion
//!
//! Converts between human-readable decimal strings ("100.5") and
//! fixed-point base units (`100_500_000` at 6 decimals). Parsing is exact
//! integer arithmetic: excess fractional digits are truncated, never
//! rounded, so a user is never credited more than they typed.
//!
//! The decimal count is a property of the token mint and is always passed
//! in explicitly. There is no default.

use crate::error::{ClientError, ClientResult};

/// Largest supported decimal count. `10^18` still leaves headroom in a
/// `u64` for amounts above one whole token.
pub const MAX_DECIMALS: u8 = 18;

/// Amount codec bound to one token's decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountCodec {
    decimals: u8,
}

impl AmountCodec {
    pub fn new(decimals: u8) -> ClientResult<Self> {
        if decimals > MAX_DECIMALS {
            return Err(ClientError::invalid_amount(format!(
                "decimals {} exceeds maximum {}",
                decimals, MAX_DECIMALS
            )));
        }
        Ok(Self { decimals })
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Parse a decimal string into base units.
    pub fn parse(&self, text: &str) -> ClientResult<u64> {
        parse_amount(text, self.decimals)
    }

    /// Parse and additionally require a strictly positive amount.
    pub fn parse_positive(&self, text: &str) -> ClientResult<u64> {
        let amount = self.parse(text)?;
        if amount == 0 {
            return Err(ClientError::invalid_amount("amount must be greater than zero"));
        }
        Ok(amount)
    }

    /// Format base units with exactly `decimals` fractional digits.
    pub fn format(&self, base_units: u64) -> String {
        format_amount(base_units, self.decimals)
    }
}

/// Parse `text` as a non-negative decimal number scaled by `10^decimals`.
///
/// Accepts surrounding whitespace, digits, and at most one
/// `.`. Signs, exponents, and non-finite spellings are rejected.
pub fn parse_amount(text: &str, decimals: u8) -> ClientResult<u64> {
    if decimals > MAX_DECIMALS {
        return Err(ClientError::invalid_amount(format!(
            "decimals {} exceeds maximum {}",
            decimals, MAX_DECIMALS
        )));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ClientError::invalid_amount("empty amount"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ClientError::invalid_amount(format!("'{}' has no digits", text)));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ClientError::invalid_amount(format!(
            "'{}' is not a non-negative decimal number",
            text
        )));
    }

    let scale = 10u128.pow(decimals as u32);
    let overflow = || ClientError::invalid_amount(format!("'{}' exceeds the maximum amount", text));

    let mut whole_value: u128 = 0;
    for digit in whole.bytes() {
        whole_value = whole_value
            .checked_mul(10)
            .and_then(|v| v.checked_add((digit - b'0') as u128))
            .ok_or_else(overflow)?;
    }

    // Truncate: only the first `decimals` fractional digits count.
    let kept = &fraction[..fraction.len().min(decimals as usize)];
    let mut fraction_value: u128 = 0;
    for digit in kept.bytes() {
        fraction_value = fraction_value * 10 + (digit - b'0') as u128;
    }
    fraction_value *= 10u128.pow((decimals as usize - kept.len()) as u32);

    let total = whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(overflow)?;

    u64::try_from(total).map_err(|_| overflow())
}

/// Format base units as a decimal string with exactly `decimals`
/// zero-padded fractional digits.
pub fn format_amount(base_units: u64, decimals: u8) -> String {
    if decimals == 0 {
        return base_units.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let value = base_units as u128;
    format!(
        "{}.{:0width$}",
        value / scale,
        value % scale,
        width = decimals as usize
    )
}
