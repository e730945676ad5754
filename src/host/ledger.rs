//! In-memory Ledger
//!
//! Keeps balances, allowances and supplies for any number of assets and an
//! audit trail of every movement. Used by tests and by embedders that do not
//! have a ledger of their own.
//!
//! Each mutating call validates first and writes second, so a failed call
//! leaves the ledger untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{AssetId, Ledger};
use crate::error::{EngineError, Result};
use crate::math;

// ============================================================================
// TRANSACTION RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxType {
    Mint,
    Burn,
    Transfer,
    Approve,
}

/// A single ledger movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub tx_type: TxType,
    pub asset: AssetId,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Decimal,
    /// Sequence number of this movement
    pub block: u64,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerTransaction {
    fn new(tx_type: TxType, asset: &AssetId, from: Option<&str>, to: Option<&str>, amount: Decimal, block: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            asset: asset.clone(),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            amount,
            block,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_transactions: usize,
    pub mints: usize,
    pub burns: usize,
    pub transfers: usize,
    pub approvals: usize,
    pub accounts: usize,
    pub assets: usize,
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(AssetId, String), Decimal>,
    allowances: HashMap<(AssetId, String, String), Decimal>,
    supplies: HashMap<AssetId, Decimal>,
    transactions: Vec<LedgerTransaction>,
    block: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[LedgerTransaction] {
        &self.transactions
    }

    pub fn recent_transactions(&self, limit: usize) -> Vec<&LedgerTransaction> {
        self.transactions.iter().rev().take(limit).collect()
    }

    /// Movements touching an account, oldest first
    pub fn transactions_for(&self, account: &str) -> Vec<&LedgerTransaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.from.as_deref() == Some(account) || tx.to.as_deref() == Some(account))
            .collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let count = |t: TxType| self.transactions.iter().filter(|tx| tx.tx_type == t).count();
        let mut accounts: Vec<&str> = self.balances.keys().map(|(_, a)| a.as_str()).collect();
        accounts.sort_unstable();
        accounts.dedup();

        LedgerStats {
            total_transactions: self.transactions.len(),
            mints: count(TxType::Mint),
            burns: count(TxType::Burn),
            transfers: count(TxType::Transfer),
            approvals: count(TxType::Approve),
            accounts: accounts.len(),
            assets: self.supplies.len(),
        }
    }

    fn record(&mut self, tx_type: TxType, asset: &AssetId, from: Option<&str>, to: Option<&str>, amount: Decimal) {
        self.block += 1;
        let tx = LedgerTransaction::new(tx_type, asset, from, to, amount, self.block);
        self.transactions.push(tx);
    }

    fn key(asset: &AssetId, account: &str) -> (AssetId, String) {
        (asset.clone(), account.to_string())
    }

    fn validate_amount(amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!("negative ledger amount {}", amount)));
        }
        Ok(())
    }

    /// Compute both sides of a move before writing either.
    fn plan_move(&self, asset: &AssetId, from: &str, to: &str, amount: Decimal) -> Result<(Decimal, Decimal)> {
        Self::validate_amount(amount)?;
        let from_balance = self.balance_of(asset, from);
        if from_balance < amount {
            return Err(EngineError::InsufficientBalance(format!(
                "{} holds {} {}, needs {}",
                from, from_balance, asset, amount
            )));
        }
        let new_from = math::sub(from_balance, amount)?;
        let new_to = if from == to {
            from_balance
        } else {
            math::add(self.balance_of(asset, to), amount)?
        };
        Ok((new_from, new_to))
    }

    fn apply_move(&mut self, asset: &AssetId, from: &str, to: &str, new_from: Decimal, new_to: Decimal) {
        if from == to {
            return;
        }
        self.balances.insert(Self::key(asset, from), new_from);
        self.balances.insert(Self::key(asset, to), new_to);
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, asset: &AssetId, account: &str) -> Decimal {
        self.balances
            .get(&Self::key(asset, account))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn total_supply(&self, asset: &AssetId) -> Decimal {
        self.supplies.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    fn allowance(&self, asset: &AssetId, owner: &str, spender: &str) -> Decimal {
        self.allowances
            .get(&(asset.clone(), owner.to_string(), spender.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn approve(&mut self, asset: &AssetId, owner: &str, spender: &str, amount: Decimal) -> Result<()> {
        Self::validate_amount(amount)?;
        self.allowances
            .insert((asset.clone(), owner.to_string(), spender.to_string()), amount);
        self.record(TxType::Approve, asset, Some(owner), Some(spender), amount);
        Ok(())
    }

    fn transfer(&mut self, asset: &AssetId, from: &str, to: &str, amount: Decimal) -> Result<()> {
        let (new_from, new_to) = self.plan_move(asset, from, to, amount)?;
        self.apply_move(asset, from, to, new_from, new_to);
        self.record(TxType::Transfer, asset, Some(from), Some(to), amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &str,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<()> {
        let allowed = self.allowance(asset, from, spender);
        if allowed < amount {
            return Err(EngineError::InsufficientAllowance(format!(
                "{} approved {} {} to {}, needs {}",
                from, allowed, asset, spender, amount
            )));
        }
        let new_allowance = math::sub(allowed, amount)?;
        let (new_from, new_to) = self.plan_move(asset, from, to, amount)?;

        self.allowances
            .insert((asset.clone(), from.to_string(), spender.to_string()), new_allowance);
        self.apply_move(asset, from, to, new_from, new_to);
        self.record(TxType::Transfer, asset, Some(from), Some(to), amount);
        Ok(())
    }

    fn mint(&mut self, asset: &AssetId, to: &str, amount: Decimal) -> Result<()> {
        Self::validate_amount(amount)?;
        let new_supply = math::add(self.total_supply(asset), amount)?;
        let new_balance = math::add(self.balance_of(asset, to), amount)?;

        self.supplies.insert(asset.clone(), new_supply);
        self.balances.insert(Self::key(asset, to), new_balance);
        self.record(TxType::Mint, asset, None, Some(to), amount);
        Ok(())
    }

    fn burn(&mut self, asset: &AssetId, from: &str, amount: Decimal) -> Result<()> {
        Self::validate_amount(amount)?;
        let balance = self.balance_of(asset, from);
        if balance < amount {
            return Err(EngineError::InsufficientBalance(format!(
                "{} holds {} {}, cannot burn {}",
                from, balance, asset, amount
            )));
        }
        let new_balance = math::sub(balance, amount)?;
        let new_supply = math::sub_nonneg(self.total_supply(asset), amount, "ledger supply")?;

        self.supplies.insert(asset.clone(), new_supply);
        self.balances.insert(Self::key(asset, from), new_balance);
        self.record(TxType::Burn, asset, Some(from), None, amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn weth() -> AssetId {
        AssetId::new("WETH")
    }

    #[test]
    fn test_mint_and_transfer() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&weth(), "alice", dec!(10000)).unwrap();
        ledger.transfer(&weth(), "alice", "bob", dec!(5000)).unwrap();

        assert_eq!(ledger.balance_of(&weth(), "alice"), dec!(5000));
        assert_eq!(ledger.balance_of(&weth(), "bob"), dec!(5000));
        assert_eq!(ledger.total_supply(&weth()), dec!(10000));
    }

    #[test]
    fn test_transfer_insufficient_balance_has_no_effect() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&weth(), "alice", dec!(10)).unwrap();

        let err = ledger.transfer(&weth(), "alice", "bob", dec!(11)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance(_)));
        assert_eq!(ledger.balance_of(&weth(), "alice"), dec!(10));
        assert_eq!(ledger.balance_of(&weth(), "bob"), Decimal::ZERO);
        assert_eq!(ledger.stats().transfers, 0);
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&weth(), "alice", dec!(10)).unwrap();
        ledger.approve(&weth(), "alice", "monitor", dec!(6)).unwrap();

        ledger.transfer_from(&weth(), "monitor", "alice", "monitor", dec!(4)).unwrap();
        assert_eq!(ledger.allowance(&weth(), "alice", "monitor"), dec!(2));

        let err = ledger
            .transfer_from(&weth(), "monitor", "alice", "monitor", dec!(3))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientAllowance(_)));
        assert_eq!(ledger.balance_of(&weth(), "alice"), dec!(6));
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&weth(), "alice", dec!(10)).unwrap();
        ledger.transfer(&weth(), "alice", "alice", dec!(7)).unwrap();
        assert_eq!(ledger.balance_of(&weth(), "alice"), dec!(10));
    }

    #[test]
    fn test_burn_reduces_supply() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&weth(), "alice", dec!(10)).unwrap();
        ledger.burn(&weth(), "alice", dec!(4)).unwrap();
        assert_eq!(ledger.total_supply(&weth()), dec!(6));

        assert!(ledger.burn(&weth(), "alice", dec!(7)).is_err());
        assert_eq!(ledger.total_supply(&weth()), dec!(6));
    }

    #[test]
    fn test_audit_trail() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&weth(), "alice", dec!(10)).unwrap();
        ledger.transfer(&weth(), "alice", "bob", dec!(1)).unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.mints, 1);
        assert_eq!(stats.accounts, 2);
        assert_eq!(ledger.transactions_for("bob").len(), 1);
        assert_eq!(ledger.recent_transactions(1)[0].tx_type, TxType::Transfer);
        assert_eq!(ledger.transactions()[1].block, 2);
    }
}
