// ============================================================================
// Stake Pool
// ============================================================================
//
// One phase of the yield offering. A pool pays a fixed reward per second per
// unit of principal while its schedule is running:
//
//   accrued = reward_per_second * elapsed * principal
//   elapsed = min(now, end) - max(last_accrual, start)
//
// Accrual is per depositor and linear; other depositors never dilute it.
//
// Changes are planned first and applied second, so a failed check never
// leaves a position half-updated.
//
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::host::AccountId;
use crate::math;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub principal: Decimal,
    /// Accrual baseline, unix seconds
    pub last_accrual: i64,
}

/// A position change computed but not yet applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub account: AccountId,
    pub position: Position,
    pub total_principal: Decimal,
    /// Yield settled by this change
    pub accrued: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    id: usize,
    reward_per_second: Decimal,
    start: i64,
    end: i64,
    total_principal: Decimal,
    positions: HashMap<AccountId, Position>,
}

impl Pool {
    pub fn new(id: usize, reward_per_second: Decimal, start: i64, end: i64) -> Result<Self> {
        if start >= end {
            return Err(EngineError::Config(format!(
                "pool {} schedule must end after it starts ({} >= {})",
                id, start, end
            )));
        }
        math::ensure_non_negative(reward_per_second, "reward per second")?;
        Ok(Self {
            id,
            reward_per_second,
            start,
            end,
            total_principal: Decimal::ZERO,
            positions: HashMap::new(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn reward_per_second(&self) -> Decimal {
        self.reward_per_second
    }

    /// (start, end) in unix seconds
    pub fn schedule(&self) -> (i64, i64) {
        (self.start, self.end)
    }

    pub fn total_principal(&self) -> Decimal {
        self.total_principal
    }

    pub fn principal_of(&self, account: &str) -> Decimal {
        self.positions
            .get(account)
            .map(|p| p.principal)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn position(&self, account: &str) -> Option<&Position> {
        self.positions.get(account)
    }

    pub fn depositors(&self) -> usize {
        self.positions.values().filter(|p| !p.principal.is_zero()).count()
    }

    /// Yield `account` has earned since its baseline, rounded down.
    pub fn pending(&self, account: &str, now: i64) -> Result<Decimal> {
        match self.positions.get(account) {
            Some(position) => self.accrued_for(position, now),
            None => Ok(Decimal::ZERO),
        }
    }

    fn accrued_for(&self, position: &Position, now: i64) -> Result<Decimal> {
        if position.principal.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let from = position.last_accrual.max(self.start);
        let to = now.min(self.end);
        if to <= from {
            return Ok(Decimal::ZERO);
        }
        let elapsed = Decimal::from(to - from);
        let accrued = math::mul(math::mul(self.reward_per_second, elapsed)?, position.principal)?;
        Ok(math::round_down(accrued))
    }

    pub fn plan_deposit(&self, account: &str, amount: Decimal, now: i64) -> Result<PositionUpdate> {
        math::ensure_positive(amount, "deposit")?;
        if now >= self.end {
            return Err(EngineError::precondition(format!(
                "pool {} closed at {}",
                self.id, self.end
            )));
        }
        let current = self.positions.get(account).copied().unwrap_or_default();
        let accrued = self.accrued_for(&current, now)?;
        Ok(PositionUpdate {
            account: account.to_string(),
            position: Position {
                principal: math::add(current.principal, amount)?,
                last_accrual: now,
            },
            total_principal: math::add(self.total_principal, amount)?,
            accrued,
        })
    }

    pub fn plan_withdraw(&self, account: &str, amount: Decimal, now: i64) -> Result<PositionUpdate> {
        math::ensure_positive(amount, "withdrawal")?;
        let current = self.positions.get(account).copied().unwrap_or_default();
        if amount > current.principal {
            return Err(EngineError::InsufficientBalance(format!(
                "{} has {} principal in pool {}, cannot withdraw {}",
                account, current.principal, self.id, amount
            )));
        }
        let accrued = self.accrued_for(&current, now)?;
        Ok(PositionUpdate {
            account: account.to_string(),
            position: Position {
                principal: math::sub(current.principal, amount)?,
                last_accrual: now,
            },
            total_principal: math::sub_nonneg(self.total_principal, amount, "pool principal")?,
            accrued,
        })
    }

    /// Accrual settled at `now` with principal unchanged.
    pub fn plan_settle(&self, account: &str, now: i64) -> Result<Option<PositionUpdate>> {
        let Some(current) = self.positions.get(account).copied() else {
            return Ok(None);
        };
        let accrued = self.accrued_for(&current, now)?;
        Ok(Some(PositionUpdate {
            account: account.to_string(),
            position: Position {
                principal: current.principal,
                last_accrual: now,
            },
            total_principal: self.total_principal,
            accrued,
        }))
    }

    pub fn apply(&mut self, update: PositionUpdate) {
        self.total_principal = update.total_principal;
        self.positions.insert(update.account, update.position);
    }

    /// Add principal; returns the yield settled on the old principal.
    pub fn deposit(&mut self, account: &str, amount: Decimal, now: i64) -> Result<Decimal> {
        let update = self.plan_deposit(account, amount, now)?;
        let accrued = update.accrued;
        self.apply(update);
        Ok(accrued)
    }

    /// Remove principal; returns the yield settled before the reduction.
    pub fn withdraw(&mut self, account: &str, amount: Decimal, now: i64) -> Result<Decimal> {
        let update = self.plan_withdraw(account, amount, now)?;
        let accrued = update.accrued;
        self.apply(update);
        Ok(accrued)
    }
}
