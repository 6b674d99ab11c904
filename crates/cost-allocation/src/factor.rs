//! Allocation factor resolution shared by the secondary and final stages.

use crate::ratio::{parse_ratio, RatioError};
use cost_core::safe_div;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a step obtains its allocation factor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "ratio")]
pub enum FactorMode {
    /// Amount to distribute divided by the sum of the bases.
    #[default]
    Automatic,
    /// A typed ratio, independent of the bases.
    Manual(String),
}

impl FactorMode {
    pub fn manual(ratio: impl Into<String>) -> Self {
        FactorMode::Manual(ratio.into())
    }
}

/// A factor together with how it was obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFactor {
    pub factor: Decimal,
    /// The amount and base sum behind an automatic factor.
    pub amount: Decimal,
    pub base_sum: Decimal,
    pub manual: bool,
    /// Set when a manual ratio could not be parsed and the factor fell back to zero.
    pub advisory: Option<RatioError>,
}

impl ResolvedFactor {
    /// Replace the factor by zero, keeping `error` as the advisory.
    pub fn fall_back(&mut self, error: RatioError) {
        warn!(factor = %self.factor, %error, "allocation factor rejected; using factor 0");
        self.factor = Decimal::ZERO;
        self.advisory = Some(error);
    }
}

/// Resolve a factor for distributing `amount` over bases summing to `base_sum`.
///
/// An automatic factor with no bases is zero. A manual ratio that fails to
/// parse also yields zero, with the parse error kept as an advisory.
pub fn resolve_factor(mode: &FactorMode, amount: Decimal, base_sum: Decimal) -> ResolvedFactor {
    match mode {
        FactorMode::Automatic => ResolvedFactor {
            factor: safe_div(amount, base_sum),
            amount,
            base_sum,
            manual: false,
            advisory: None,
        },
        FactorMode::Manual(text) => {
            let (factor, advisory) = match parse_ratio(text) {
                Ok(f) => (f, None),
                Err(e) => {
                    warn!(ratio = %text, error = %e, "manual ratio rejected; using factor 0");
                    (Decimal::ZERO, Some(e))
                }
            };
            ResolvedFactor {
                factor,
                amount,
                base_sum,
                manual: true,
                advisory,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn automatic_divides_amount_by_bases() {
        let f = resolve_factor(&FactorMode::Automatic, d(300), d(30));
        assert_eq!(f.factor, d(10));
        assert!(!f.manual);
        assert!(f.advisory.is_none());
    }

    #[test]
    fn automatic_without_bases_is_zero() {
        let f = resolve_factor(&FactorMode::Automatic, d(300), Decimal::ZERO);
        assert_eq!(f.factor, Decimal::ZERO);
        assert!(f.advisory.is_none());
    }

    #[test]
    fn manual_ignores_bases() {
        let f = resolve_factor(&FactorMode::manual("50/2"), d(300), d(30));
        assert_eq!(f.factor, d(25));
        assert!(f.manual);
    }

    #[test]
    fn malformed_manual_ratio_falls_back_to_zero() {
        let f = resolve_factor(&FactorMode::manual("abc"), d(300), d(30));
        assert_eq!(f.factor, Decimal::ZERO);
        assert_eq!(f.advisory, Some(RatioError::NotANumber("abc".to_string())));
    }

    #[test]
    fn fall_back_zeroes_and_records() {
        let mut f = resolve_factor(&FactorMode::manual("1e20"), d(300), d(30));
        assert_eq!(f.factor, Decimal::from_scientific("1e20").unwrap());
        f.fall_back(RatioError::Overflow);
        assert_eq!(f.factor, Decimal::ZERO);
        assert_eq!(f.advisory, Some(RatioError::Overflow));
        assert!(f.manual);
    }

    #[test]
    fn mode_serde_shape() {
        let m: FactorMode = serde_json::from_str(r#"{"mode":"manual","ratio":"1/4"}"#).unwrap();
        assert_eq!(m, FactorMode::manual("1/4"));
        let a: FactorMode = serde_json::from_str(r#"{"mode":"automatic"}"#).unwrap();
        assert_eq!(a, FactorMode::Automatic);
    }
}
