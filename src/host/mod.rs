// ============================================================================
// Host Module - Vision Engine
// ============================================================================
//
// The engine never owns balances, time, or event storage. It talks to the
// hosting environment through three collaborators:
//
//   - Ledger:    balances, allowances, mint/burn for every asset
//   - Clock:     monotonically nondecreasing unix seconds
//   - EventSink: structured records for external observers
//
// `Host` bundles one of each and is passed by `&mut` into every operation.
// The in-process implementations below are used by tests and embedders.
//
// ============================================================================

pub mod clock;
pub mod events;
pub mod ledger;

pub use clock::*;
pub use events::*;
pub use ledger::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};

/// Account identity as known to the ledger
pub type AccountId = String;

/// Asset symbol as known to the ledger (e.g. "WETH", "VISION")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(symbol: impl Into<String>) -> Self {
        AssetId(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Balance keeper for the reserve asset and every token the engine touches.
pub trait Ledger {
    fn balance_of(&self, asset: &AssetId, account: &str) -> Decimal;

    fn total_supply(&self, asset: &AssetId) -> Decimal;

    fn allowance(&self, asset: &AssetId, owner: &str, spender: &str) -> Decimal;

    fn approve(&mut self, asset: &AssetId, owner: &str, spender: &str, amount: Decimal) -> Result<()>;

    fn transfer(&mut self, asset: &AssetId, from: &str, to: &str, amount: Decimal) -> Result<()>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &str,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<()>;

    fn mint(&mut self, asset: &AssetId, to: &str, amount: Decimal) -> Result<()>;

    fn burn(&mut self, asset: &AssetId, from: &str, amount: Decimal) -> Result<()>;
}

/// Read-only time source.
pub trait Clock {
    fn now(&self) -> i64;
}

pub trait EventSink {
    fn emit(&mut self, event: EngineEvent);
}

// ============================================================================
// HOST
// ============================================================================

/// The collaborators one call runs against
pub struct Host {
    pub ledger: Box<dyn Ledger>,
    pub clock: Box<dyn Clock>,
    pub events: Box<dyn EventSink>,
}

impl Host {
    pub fn new(
        ledger: impl Ledger + 'static,
        clock: impl Clock + 'static,
        events: impl EventSink + 'static,
    ) -> Self {
        Self {
            ledger: Box::new(ledger),
            clock: Box::new(clock),
            events: Box::new(events),
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn emit(&mut self, event: EngineEvent) {
        self.events.emit(event);
    }

    /// Check that `custody` could pull `amount` of `asset` from `owner`
    /// right now, without moving anything.
    pub fn ensure_can_pull(&self, asset: &AssetId, owner: &str, custody: &str, amount: Decimal) -> Result<()> {
        let allowed = self.ledger.allowance(asset, owner, custody);
        if allowed < amount {
            return Err(EngineError::InsufficientAllowance(format!(
                "{} approved {} {} to {}, needs {}",
                owner, allowed, asset, custody, amount
            )));
        }
        let balance = self.ledger.balance_of(asset, owner);
        if balance < amount {
            return Err(EngineError::InsufficientBalance(format!(
                "{} holds {} {}, needs {}",
                owner, balance, asset, amount
            )));
        }
        Ok(())
    }

    /// Pull `amount` of `asset` from `owner` into `custody`.
    pub fn pull(&mut self, asset: &AssetId, owner: &str, custody: &str, amount: Decimal) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger.transfer_from(asset, custody, owner, custody, amount)
    }

    /// Check that `custody` holds at least `amount` of `asset` to pay out.
    pub fn ensure_custody_covers(&self, asset: &AssetId, custody: &str, amount: Decimal) -> Result<()> {
        let held = self.ledger.balance_of(asset, custody);
        if held < amount {
            return Err(EngineError::invariant(format!(
                "custody {} holds {} {}, owes {}",
                custody, held, asset, amount
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").field("now", &self.clock.now()).finish()
    }
}
