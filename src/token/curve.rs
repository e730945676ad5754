// ============================================================================
// Token Curves - Vision Reserve Token
// ============================================================================
//
// Two interchangeable mint/burn curves, chosen when the token is built.
//
// LINEAR:
//   tokens  = reserve deposited
//   reserve = tokens burned
//
// BANCOR (continuous, reserve ratio r in (0, 1]):
//   tokens  = S * ((1 + d / R) ^ r - 1)
//   reserve = R * (1 - (1 - t / S) ^ (1 / r))
//
// where S = current supply, R = current reserve balance.
// The exit fee is applied by the token, not the curve.
//
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};
use crate::math;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenCurve {
    Linear,
    Bancor { reserve_ratio: Decimal },
}

impl Default for TokenCurve {
    fn default() -> Self {
        TokenCurve::Linear
    }
}

impl fmt::Display for TokenCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCurve::Linear => write!(f, "linear"),
            TokenCurve::Bancor { reserve_ratio } => write!(f, "bancor(r={})", reserve_ratio),
        }
    }
}

impl TokenCurve {
    pub fn bancor(reserve_ratio: Decimal) -> Result<Self> {
        let curve = TokenCurve::Bancor { reserve_ratio };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> Result<()> {
        if let TokenCurve::Bancor { reserve_ratio } = self {
            if *reserve_ratio <= Decimal::ZERO || *reserve_ratio > Decimal::ONE {
                return Err(EngineError::Config(format!(
                    "reserve ratio must be in (0, 1], got {}",
                    reserve_ratio
                )));
            }
        }
        Ok(())
    }

    /// Whether the curve can price a mint before any seed liquidity exists
    pub fn needs_seed(&self) -> bool {
        matches!(self, TokenCurve::Bancor { .. })
    }

    /// Tokens issued for depositing `deposit` reserve, before rounding.
    pub fn purchase_return(&self, supply: Decimal, reserve: Decimal, deposit: Decimal) -> Result<Decimal> {
        if deposit <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "reserve deposit must be positive, got {}",
                deposit
            )));
        }
        match self {
            TokenCurve::Linear => Ok(deposit),
            TokenCurve::Bancor { reserve_ratio } => {
                if supply.is_zero() {
                    return Err(EngineError::precondition("bonding curve has no supply"));
                }
                if reserve.is_zero() {
                    return Err(EngineError::precondition(
                        "bonding curve has no reserve balance",
                    ));
                }
                // S * ((1 + d/R)^r - 1)
                let growth = math::add(Decimal::ONE, math::div(deposit, reserve)?)?;
                let scaled = math::pow(growth, *reserve_ratio)?;
                math::mul(supply, math::sub(scaled, Decimal::ONE)?)
            }
        }
    }

    /// Reserve released for burning `tokens`, before fee and rounding.
    pub fn sale_return(&self, supply: Decimal, reserve: Decimal, tokens: Decimal) -> Result<Decimal> {
        if tokens <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "token amount must be positive, got {}",
                tokens
            )));
        }
        if tokens > supply {
            return Err(EngineError::invariant(format!(
                "burning {} exceeds total supply {}",
                tokens, supply
            )));
        }
        match self {
            TokenCurve::Linear => Ok(tokens),
            TokenCurve::Bancor { reserve_ratio } => {
                if tokens == supply {
                    return Ok(reserve);
                }
                // R * (1 - (1 - t/S)^(1/r))
                let remaining = math::sub(Decimal::ONE, math::div(tokens, supply)?)?;
                let exponent = math::div(Decimal::ONE, *reserve_ratio)?;
                let kept = math::pow(remaining, exponent)?;
                math::mul(reserve, math::sub(Decimal::ONE, kept)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_linear_is_one_to_one() {
        let curve = TokenCurve::Linear;
        assert_eq!(curve.purchase_return(dec!(0), dec!(0), dec!(5000)).unwrap(), dec!(5000));
        assert_eq!(curve.sale_return(dec!(5000), dec!(5000), dec!(5000)).unwrap(), dec!(5000));
    }

    #[test]
    fn test_bancor_rejects_empty_reserve() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        let err = curve.purchase_return(dec!(1000), Decimal::ZERO, dec!(10)).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionViolation(_)));
    }

    #[test]
    fn test_bancor_rejects_non_positive_deposit() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        assert!(curve.purchase_return(dec!(1000), dec!(1000), Decimal::ZERO).is_err());
        assert!(curve.purchase_return(dec!(1000), dec!(1000), dec!(-1)).is_err());
    }

    #[test]
    fn test_bancor_full_ratio_matches_linear_growth() {
        // r = 1: tokens = S * d / R
        let curve = TokenCurve::bancor(Decimal::ONE).unwrap();
        let out = curve.purchase_return(dec!(1000), dec!(500), dec!(50)).unwrap();
        assert_eq!(out, dec!(100));
    }

    #[test]
    fn test_bancor_purchase_is_increasing_in_deposit() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        let small = curve.purchase_return(dec!(1000), dec!(1000), dec!(10)).unwrap();
        let large = curve.purchase_return(dec!(1000), dec!(1000), dec!(20)).unwrap();
        assert!(small > Decimal::ZERO);
        assert!(large > small);
        // A half-ratio curve gives fewer tokens than the linear rate.
        assert!(large < dec!(20));
    }

    #[test]
    fn test_bancor_sale_of_whole_supply_returns_whole_reserve() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        assert_eq!(curve.sale_return(dec!(1000), dec!(400), dec!(1000)).unwrap(), dec!(400));
    }

    #[test]
    fn test_sale_beyond_supply_is_invariant_error() {
        let curve = TokenCurve::Linear;
        let err = curve.sale_return(dec!(10), dec!(10), dec!(11)).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        assert!(TokenCurve::bancor(Decimal::ZERO).is_err());
        assert!(TokenCurve::bancor(dec!(1.5)).is_err());
    }
}
