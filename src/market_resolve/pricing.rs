// ============================================================================
// Position Pricing
// ============================================================================
//
// A market prices new outcome shares with a pluggable strategy chosen when
// the registry is built. Both strategies price an outcome purely from its own
// circulating supply, through a cumulative cost function C(s):
//
//   cost(s, a) = C(s + a) - C(s)
//
// so the total paid depends only on the final supply, never on how the
// purchases were split, and the marginal price grows with supply.
//
// QUADRATIC:  C(s) = base * s + slope * s^3
//             unit price p(s) = base + 3 * slope * s^2
//
// BANCOR:     virtual supply S0, virtual reserve R0, ratio r
//             C(s) = R0 * ((S0 + s) / S0) ^ (1/r) - R0
//             return(s, d) = S * ((1 + d / R) ^ r - 1),  S = S0 + s, R = R0 + C(s)
//
// ============================================================================

use rust_decimal::Decimal;
use std::fmt;

use crate::error::{EngineError, Result};
use crate::math;

/// Binary-search steps when inverting a cost curve
const SEARCH_STEPS: usize = 96;

pub trait PricingStrategy: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Cost of raising an outcome's supply from `supply` to `supply + amount`.
    fn compute_cost(&self, supply: Decimal, amount: Decimal) -> Result<Decimal>;

    /// Shares a `deposit` buys at `supply`.
    fn compute_purchase_return(&self, supply: Decimal, deposit: Decimal) -> Result<Decimal>;
}

fn validate_inputs(supply: Decimal, amount: Decimal, what: &str) -> Result<()> {
    math::ensure_non_negative(supply, "outcome supply")?;
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!("{} must be positive, got {}", what, amount)));
    }
    Ok(())
}

/// Largest quantised `a` with `cost(supply, a) <= deposit`.
fn invert_cost<S: PricingStrategy + ?Sized>(strategy: &S, supply: Decimal, deposit: Decimal, upper: Decimal) -> Result<Decimal> {
    let mut lo = Decimal::ZERO;
    let mut hi = math::round_down(upper);
    let step = Decimal::new(1, math::AMOUNT_SCALE);

    for _ in 0..SEARCH_STEPS {
        if math::sub(hi, lo)? <= step {
            break;
        }
        let mid = math::round_down(math::div(math::add(lo, hi)?, Decimal::TWO)?);
        if mid <= lo {
            break;
        }
        if strategy.compute_cost(supply, mid)? <= deposit {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    if hi > Decimal::ZERO && strategy.compute_cost(supply, hi)? <= deposit {
        return Ok(hi);
    }
    Ok(lo)
}

// ============================================================================
// QUADRATIC COST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadraticCost {
    base_price: Decimal,
    slope: Decimal,
}

impl QuadraticCost {
    pub fn new(base_price: Decimal, slope: Decimal) -> Result<Self> {
        if base_price <= Decimal::ZERO {
            return Err(EngineError::Config(format!("base price must be positive, got {}", base_price)));
        }
        if slope <= Decimal::ZERO {
            return Err(EngineError::Config(format!("slope must be positive, got {}", slope)));
        }
        Ok(Self { base_price, slope })
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn slope(&self) -> Decimal {
        self.slope
    }

    fn cumulative(&self, supply: Decimal) -> Result<Decimal> {
        let cubed = math::mul(math::mul(supply, supply)?, supply)?;
        math::add(math::mul(self.base_price, supply)?, math::mul(self.slope, cubed)?)
    }
}

impl PricingStrategy for QuadraticCost {
    fn name(&self) -> &'static str {
        "quadratic"
    }

    fn compute_cost(&self, supply: Decimal, amount: Decimal) -> Result<Decimal> {
        validate_inputs(supply, amount, "share amount")?;
        let before = self.cumulative(supply)?;
        let after = self.cumulative(math::add(supply, amount)?)?;
        Ok(math::round_up(math::sub(after, before)?))
    }

    fn compute_purchase_return(&self, supply: Decimal, deposit: Decimal) -> Result<Decimal> {
        validate_inputs(supply, deposit, "deposit")?;
        // every unit costs at least the base price
        let upper = math::div(deposit, self.base_price)?;
        invert_cost(self, supply, deposit, upper)
    }
}

// ============================================================================
// BANCOR PRICING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BancorPricing {
    reserve_ratio: Decimal,
    virtual_supply: Decimal,
    virtual_reserve: Decimal,
}

impl BancorPricing {
    pub fn new(reserve_ratio: Decimal, virtual_supply: Decimal, virtual_reserve: Decimal) -> Result<Self> {
        if reserve_ratio <= Decimal::ZERO || reserve_ratio > Decimal::ONE {
            return Err(EngineError::Config(format!(
                "reserve ratio must be in (0, 1], got {}",
                reserve_ratio
            )));
        }
        if virtual_supply <= Decimal::ZERO || virtual_reserve <= Decimal::ZERO {
            return Err(EngineError::Config(
                "virtual supply and reserve must be positive".to_string(),
            ));
        }
        Ok(Self {
            reserve_ratio,
            virtual_supply,
            virtual_reserve,
        })
    }

    pub fn reserve_ratio(&self) -> Decimal {
        self.reserve_ratio
    }

    /// Reserve backing `supply` real shares on top of the virtual supply
    fn reserve_at(&self, supply: Decimal) -> Result<Decimal> {
        let growth = math::div(math::add(self.virtual_supply, supply)?, self.virtual_supply)?;
        let exponent = math::div(Decimal::ONE, self.reserve_ratio)?;
        math::mul(self.virtual_reserve, math::pow(growth, exponent)?)
    }
}

impl PricingStrategy for BancorPricing {
    fn name(&self) -> &'static str {
        "bancor"
    }

    fn compute_cost(&self, supply: Decimal, amount: Decimal) -> Result<Decimal> {
        validate_inputs(supply, amount, "share amount")?;
        let before = self.reserve_at(supply)?;
        let after = self.reserve_at(math::add(supply, amount)?)?;
        let cost = math::round_up(math::sub(after, before)?);
        if cost <= Decimal::ZERO {
            return Err(EngineError::invariant("bancor cost did not increase"));
        }
        Ok(cost)
    }

    fn compute_purchase_return(&self, supply: Decimal, deposit: Decimal) -> Result<Decimal> {
        validate_inputs(supply, deposit, "deposit")?;
        let total_supply = math::add(self.virtual_supply, supply)?;
        let reserve = self.reserve_at(supply)?;
        let growth = math::add(Decimal::ONE, math::div(deposit, reserve)?)?;
        let estimate = math::mul(total_supply, math::sub(math::pow(growth, self.reserve_ratio)?, Decimal::ONE)?)?;
        let estimate = math::round_down(estimate);

        // pow is approximate; make sure the quoted shares never cost more
        // than the deposit
        if estimate > Decimal::ZERO && self.compute_cost(supply, estimate)? <= deposit {
            return Ok(estimate);
        }
        invert_cost(self, supply, deposit, estimate.max(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quadratic() -> QuadraticCost {
        QuadraticCost::new(dec!(1), dec!(0.001)).unwrap()
    }

    #[test]
    fn test_quadratic_known_costs() {
        let q = quadratic();
        // C(10) - C(0) = 10 + 0.001 * 1000
        assert_eq!(q.compute_cost(dec!(0), dec!(10)).unwrap(), dec!(11));
        // C(20) - C(10) = 10 + 0.001 * 7000
        assert_eq!(q.compute_cost(dec!(10), dec!(10)).unwrap(), dec!(17));
    }

    #[test]
    fn test_quadratic_marginal_cost_increases() {
        let q = quadratic();
        let mut supply = Decimal::ZERO;
        let mut last = Decimal::ZERO;
        for _ in 0..5 {
            let unit = q.compute_cost(supply, dec!(1)).unwrap();
            assert!(unit > last);
            last = unit;
            supply += dec!(7);
        }
    }

    #[test]
    fn test_quadratic_path_independent() {
        let q = quadratic();
        let one_shot = q.compute_cost(dec!(0), dec!(30)).unwrap();
        let split = q.compute_cost(dec!(0), dec!(10)).unwrap()
            + q.compute_cost(dec!(10), dec!(5)).unwrap()
            + q.compute_cost(dec!(15), dec!(15)).unwrap();
        assert_eq!(one_shot, split);
    }

    #[test]
    fn test_quadratic_purchase_return_inverts_cost() {
        let q = quadratic();
        let shares = q.compute_purchase_return(dec!(0), dec!(11)).unwrap();
        assert_eq!(shares, dec!(10));

        let partial = q.compute_purchase_return(dec!(10), dec!(5)).unwrap();
        assert!(partial > Decimal::ZERO);
        assert!(q.compute_cost(dec!(10), partial).unwrap() <= dec!(5));
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let q = quadratic();
        assert!(matches!(
            q.compute_cost(dec!(0), Decimal::ZERO),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(q.compute_purchase_return(dec!(0), dec!(-1)).is_err());
    }

    #[test]
    fn test_bancor_marginal_cost_increases() {
        let b = BancorPricing::new(dec!(0.5), dec!(100), dec!(100)).unwrap();
        let first = b.compute_cost(dec!(0), dec!(10)).unwrap();
        let second = b.compute_cost(dec!(10), dec!(10)).unwrap();
        assert!(first > Decimal::ZERO);
        assert!(second > first);
    }

    #[test]
    fn test_bancor_return_never_overcharges() {
        let b = BancorPricing::new(dec!(0.5), dec!(100), dec!(100)).unwrap();
        let shares = b.compute_purchase_return(dec!(25), dec!(40)).unwrap();
        assert!(shares > Decimal::ZERO);
        assert!(b.compute_cost(dec!(25), shares).unwrap() <= dec!(40));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(QuadraticCost::new(Decimal::ZERO, dec!(1)).is_err());
        assert!(BancorPricing::new(dec!(2), dec!(1), dec!(1)).is_err());
        assert!(BancorPricing::new(dec!(0.5), Decimal::ZERO, dec!(1)).is_err());
    }
}
