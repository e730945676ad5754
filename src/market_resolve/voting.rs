// ============================================================================
// Vote Book - Reality Markets
// ============================================================================
//
// Voters lock Vision behind an outcome as a directional bet. Locked amounts
// are returned in full once voting has completed (the market is finalized).
//
// Per-outcome totals are cumulative: withdrawing a lock does not lower the
// total that decided the leader.
//
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::host::AccountId;
use crate::math;
use crate::shares::Outcome;

/// One recorded vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub market_index: u64,
    pub account: AccountId,
    pub outcome: Outcome,
    pub amount: Decimal,
    pub cast_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct VoteBook {
    locked: HashMap<(u64, AccountId), [Decimal; 3]>,
    totals: HashMap<u64, [Decimal; 3]>,
    history: Vec<Vote>,
}

impl VoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative amount ever locked behind `outcome` in a market
    pub fn total_for(&self, market_index: u64, outcome: Outcome) -> Decimal {
        self.totals
            .get(&market_index)
            .map(|t| t[outcome.offset()])
            .unwrap_or(Decimal::ZERO)
    }

    /// Amounts `account` still has locked, indexed by `Outcome::offset`
    pub fn locked_of(&self, market_index: u64, account: &str) -> [Decimal; 3] {
        self.locked
            .get(&(market_index, account.to_string()))
            .copied()
            .unwrap_or([Decimal::ZERO; 3])
    }

    pub fn locked_total(&self, market_index: u64, account: &str) -> Result<Decimal> {
        self.locked_of(market_index, account)
            .into_iter()
            .try_fold(Decimal::ZERO, math::add)
    }

    pub fn history(&self) -> &[Vote] {
        &self.history
    }

    /// Validate a lock without recording it.
    pub fn check_record(&self, market_index: u64, account: &str, outcome: Outcome, amount: Decimal) -> Result<()> {
        math::ensure_positive(amount, "vote amount")?;
        math::add(self.locked_of(market_index, account)[outcome.offset()], amount)?;
        math::add(self.total_for(market_index, outcome), amount)?;
        Ok(())
    }

    pub fn record(&mut self, vote: Vote) -> Result<()> {
        self.check_record(vote.market_index, &vote.account, vote.outcome, vote.amount)?;
        let slot = vote.outcome.offset();

        let locked = self
            .locked
            .entry((vote.market_index, vote.account.clone()))
            .or_insert([Decimal::ZERO; 3]);
        locked[slot] = math::add(locked[slot], vote.amount)?;

        let totals = self.totals.entry(vote.market_index).or_insert([Decimal::ZERO; 3]);
        totals[slot] = math::add(totals[slot], vote.amount)?;

        self.history.push(vote);
        Ok(())
    }

    /// Remove every lock `account` holds in a market and return the sum.
    pub fn release(&mut self, market_index: u64, account: &str) -> Result<Decimal> {
        let total = self.locked_total(market_index, account)?;
        if total.is_zero() {
            return Err(EngineError::AuthorizationViolation(format!(
                "{} has no locked votes in market {}",
                account, market_index
            )));
        }
        self.locked.remove(&(market_index, account.to_string()));
        Ok(total)
    }
}
