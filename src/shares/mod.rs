// ============================================================================
// Shares Module - Vision Prediction Markets
// ============================================================================
//
// Outcome shares represent a claim on one resolution of a market.
// Every market has exactly three: INVALID, NO, YES.
//
// Share ids come from one counter owned by the market registry, so a market's
// three ids are consecutive and no two markets ever share an id.
//
// Core Invariant:
//   for every share id, sum of account balances == total supply
//
// The OutcomeBook is the only place that changes share balances; credit and
// debit keep the invariant, `audit` checks it.
//
// ============================================================================

pub mod mint;
pub mod redeem;

pub use mint::*;
pub use redeem::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{EngineError, Result};
use crate::host::AccountId;
use crate::math;

// ============================================================================
// OUTCOME
// ============================================================================

/// One of the three ternary resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Invalid,
    No,
    Yes,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Invalid, Outcome::No, Outcome::Yes];

    /// Position of this outcome's share inside a market's id triple
    pub fn offset(self) -> usize {
        match self {
            Outcome::Invalid => 0,
            Outcome::No => 1,
            Outcome::Yes => 2,
        }
    }

    /// Vote ids: -1 = invalid, 0 = no, 1 = yes
    pub fn from_vote_id(id: i64) -> Option<Outcome> {
        match id {
            -1 => Some(Outcome::Invalid),
            0 => Some(Outcome::No),
            1 => Some(Outcome::Yes),
            _ => None,
        }
    }

    pub fn vote_id(self) -> i64 {
        match self {
            Outcome::Invalid => -1,
            Outcome::No => 0,
            Outcome::Yes => 1,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Invalid => "invalid",
            Outcome::No => "no",
            Outcome::Yes => "yes",
        };
        write!(f, "{}", s)
    }
}

/// Global outcome-share id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShareId(pub u64);

impl ShareId {
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "share#{}", self.0)
    }
}

/// The three share ids of one market, indexed by `Outcome::offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTriple(pub [ShareId; 3]);

impl ShareTriple {
    pub fn get(&self, outcome: Outcome) -> ShareId {
        self.0[outcome.offset()]
    }

    pub fn outcome_of(&self, share: ShareId) -> Option<Outcome> {
        Outcome::ALL.into_iter().find(|o| self.get(*o) == share)
    }

    pub fn ids(&self) -> [ShareId; 3] {
        self.0
    }
}

/// Registry-owned, monotonically increasing share-id source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareIndexCounter {
    next: u64,
}

impl ShareIndexCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id that would be handed out
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Three consecutive ids: invalid, no, yes.
    pub fn allocate_triple(&mut self) -> Result<ShareTriple> {
        let first = self.next;
        let end = first
            .checked_add(3)
            .ok_or(EngineError::ArithmeticOverflow("share index counter"))?;
        self.next = end;
        Ok(ShareTriple([ShareId(first), ShareId(first + 1), ShareId(first + 2)]))
    }
}

// ============================================================================
// OUTCOME BOOK
// ============================================================================

/// Statistics for the share system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareStats {
    pub total_shares_minted: Decimal,
    pub total_shares_burned: Decimal,
    pub unique_holders: usize,
}

/// Supply and per-account balances of every outcome share
#[derive(Debug, Clone, Default)]
pub struct OutcomeBook {
    supplies: HashMap<ShareId, Decimal>,
    balances: HashMap<(ShareId, AccountId), Decimal>,
    holders: HashMap<AccountId, usize>,
    pub stats: ShareStats,
}

impl OutcomeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, share: ShareId, account: &str) -> Decimal {
        self.balances
            .get(&(share, account.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_supply(&self, share: ShareId) -> Decimal {
        self.supplies.get(&share).copied().unwrap_or(Decimal::ZERO)
    }

    /// Holders of a share with a non-zero balance
    pub fn holders_of(&self, share: ShareId) -> Vec<(&str, Decimal)> {
        let mut out: Vec<(&str, Decimal)> = self
            .balances
            .iter()
            .filter(|((s, _), b)| *s == share && !b.is_zero())
            .map(|((_, a), b)| (a.as_str(), *b))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Check that `account` holds `amount` of `share`.
    pub fn ensure_balance(&self, share: ShareId, account: &str, amount: Decimal) -> Result<()> {
        let held = self.balance_of(share, account);
        if held < amount {
            return Err(EngineError::InsufficientBalance(format!(
                "{} holds {} of {}, needs {}",
                account, held, share, amount
            )));
        }
        Ok(())
    }

    /// Check that crediting `amount` would not overflow, without applying it.
    pub fn check_credit(&self, share: ShareId, account: &str, amount: Decimal) -> Result<()> {
        math::ensure_non_negative(amount, "share credit")?;
        math::add(self.balance_of(share, account), amount)?;
        math::add(self.total_supply(share), amount)?;
        math::add(self.stats.total_shares_minted, amount)?;
        Ok(())
    }

    pub fn credit(&mut self, share: ShareId, account: &str, amount: Decimal) -> Result<()> {
        math::ensure_non_negative(amount, "share credit")?;
        let new_balance = math::add(self.balance_of(share, account), amount)?;
        let new_supply = math::add(self.total_supply(share), amount)?;
        let new_minted = math::add(self.stats.total_shares_minted, amount)?;

        let key = (share, account.to_string());
        if !self.balances.contains_key(&key) {
            *self.holders.entry(account.to_string()).or_insert(0) += 1;
            self.stats.unique_holders = self.holders.len();
        }
        self.balances.insert(key, new_balance);
        self.supplies.insert(share, new_supply);
        self.stats.total_shares_minted = new_minted;
        Ok(())
    }

    pub fn debit(&mut self, share: ShareId, account: &str, amount: Decimal) -> Result<()> {
        math::ensure_non_negative(amount, "share debit")?;
        self.ensure_balance(share, account, amount)?;
        let new_balance = math::sub(self.balance_of(share, account), amount)?;
        let new_supply = math::sub_nonneg(self.total_supply(share), amount, "share supply")?;
        let new_burned = math::add(self.stats.total_shares_burned, amount)?;

        self.balances.insert((share, account.to_string()), new_balance);
        self.supplies.insert(share, new_supply);
        self.stats.total_shares_burned = new_burned;
        Ok(())
    }

    /// Verify the supply invariant for one share.
    pub fn audit(&self, share: ShareId) -> Result<()> {
        let mut sum = Decimal::ZERO;
        for ((s, _), b) in &self.balances {
            if *s == share {
                sum = math::add(sum, *b)?;
            }
        }
        let supply = self.total_supply(share);
        if sum != supply {
            return Err(EngineError::invariant(format!(
                "{} balances sum to {} but supply is {}",
                share, sum, supply
            )));
        }
        Ok(())
    }
}
