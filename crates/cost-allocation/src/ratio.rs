//! Parser for user-typed allocation ratios such as `"50/2"` or `"0.75"`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Reasons a ratio text could not be turned into a factor.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatioError {
    #[error("ratio is empty")]
    Empty,
    /// A side of the ratio is not a number.
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("ratio denominator is zero")]
    ZeroDenominator,
    /// Factors are non-negative.
    #[error("ratio {0} is negative")]
    Negative(Decimal),
    #[error("ratio is out of range")]
    Overflow,
}

/// Parse `numerator/denominator`, splitting on the first `/`.
///
/// Text without a `/` is a bare numerator over one. Each side may be a plain
/// decimal or scientific notation, surrounded by whitespace.
pub fn parse_ratio(text: &str) -> Result<Decimal, RatioError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RatioError::Empty);
    }
    let (num, den) = match text.split_once('/') {
        Some((num, den)) => (parse_number(num)?, parse_number(den)?),
        None => (parse_number(text)?, Decimal::ONE),
    };
    if den.is_zero() {
        return Err(RatioError::ZeroDenominator);
    }
    let ratio = num.checked_div(den).ok_or(RatioError::Overflow)?;
    if ratio < Decimal::ZERO {
        return Err(RatioError::Negative(ratio));
    }
    Ok(ratio)
}

fn parse_number(token: &str) -> Result<Decimal, RatioError> {
    let token = token.trim();
    Decimal::from_str(token)
        .or_else(|_| Decimal::from_scientific(token))
        .map_err(|_| RatioError::NotANumber(token.to_string()))
}
