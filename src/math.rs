// ============================================================================
// Checked Arithmetic - Vision Engine
// ============================================================================
//
// Every quantity in the engine (reserve asset, Vision tokens, outcome shares,
// yield) is a `Decimal` quantised to AMOUNT_SCALE places.
//
// Rounding rule:
//   - amounts paid TO an account round toward zero
//   - amounts charged FROM an account round away from zero
//
// Nothing here wraps or saturates silently: overflow is an error.
//
// ============================================================================

use rust_decimal::prelude::MathematicalOps;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, Result};

/// Decimal places kept on every stored amount
pub const AMOUNT_SCALE: u32 = 8;

pub type Amount = Decimal;

pub fn add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or(EngineError::ArithmeticOverflow("add"))
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or(EngineError::ArithmeticOverflow("sub"))
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b).ok_or(EngineError::ArithmeticOverflow("mul"))
}

pub fn div(a: Decimal, b: Decimal) -> Result<Decimal> {
    if b.is_zero() {
        return Err(EngineError::ArithmeticOverflow("div by zero"));
    }
    a.checked_div(b).ok_or(EngineError::ArithmeticOverflow("div"))
}

/// `base ^ exp` for a fractional exponent.
pub fn pow(base: Decimal, exp: Decimal) -> Result<Decimal> {
    if base.is_sign_negative() && !base.is_zero() {
        return Err(EngineError::ArithmeticOverflow("pow of negative base"));
    }
    if exp == Decimal::ONE {
        return Ok(base);
    }
    base.checked_powd(exp).ok_or(EngineError::ArithmeticOverflow("pow"))
}

/// `10 ^ n` as an exact decimal.
pub fn pow10(n: u32) -> Result<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..n {
        acc = mul(acc, Decimal::TEN)?;
    }
    Ok(acc)
}

/// Subtraction that must stay non-negative; a negative result means some
/// bookkeeping went wrong upstream.
pub fn sub_nonneg(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    let out = sub(a, b)?;
    if out.is_sign_negative() && !out.is_zero() {
        return Err(EngineError::invariant(format!("{} would go negative", what)));
    }
    Ok(out)
}

/// Quantise an amount the engine pays out.
pub fn round_down(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
}

/// Quantise an amount the engine charges.
pub fn round_up(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::AwayFromZero)
}

/// Reject zero, negative, or sub-precision amounts.
pub fn ensure_positive(amount: Decimal, what: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!(
            "{} must be positive, got {}",
            what, amount
        )));
    }
    if round_down(amount) != amount {
        return Err(EngineError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            what, AMOUNT_SCALE
        )));
    }
    Ok(())
}

pub fn ensure_non_negative(amount: Decimal, what: &str) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!(
            "{} must not be negative, got {}",
            what, amount
        )));
    }
    Ok(())
}
