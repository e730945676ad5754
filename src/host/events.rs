// ============================================================================
// Engine Events
// ============================================================================
//
// Structured records emitted for external observers. The engine only emits;
// storing or displaying them is the sink's business.
//
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use super::EventSink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    // === Reserve token ===
    TokenSeeded {
        account: String,
        reserve_in: Decimal,
        tokens_out: Decimal,
    },
    TokenMinted {
        account: String,
        reserve_in: Decimal,
        tokens_out: Decimal,
    },
    TokenBurned {
        account: String,
        tokens_in: Decimal,
        reserve_out: Decimal,
        fee: Decimal,
    },

    // === Markets ===
    MarketCreated {
        index: u64,
        invalid_index: u64,
        no_index: u64,
        yes_index: u64,
        stake: Decimal,
    },
    PositionBought {
        account: String,
        stake: Decimal,
        market_index: u64,
        share_index: u64,
        shares: Decimal,
    },
    MarketFinalized {
        index: u64,
        outcome: u64,
    },
    Redeemed {
        account: String,
        amount: Decimal,
    },
    StakeReclaimed {
        index: u64,
        account: String,
        amount: Decimal,
    },
    CompleteSetsMinted {
        index: u64,
        account: String,
        amount: Decimal,
    },
    CompleteSetsRedeemed {
        index: u64,
        account: String,
        amount: Decimal,
    },
    VoteCast {
        index: u64,
        account: String,
        outcome: i64,
        amount: Decimal,
    },
    VotesWithdrawn {
        index: u64,
        account: String,
        amount: Decimal,
    },

    // === Yield offering ===
    YieldFunded {
        account: String,
        amount: Decimal,
    },
    YieldDeposited {
        pool: usize,
        account: String,
        amount: Decimal,
    },
    YieldWithdrawn {
        pool: usize,
        account: String,
        amount: Decimal,
        accrued: Decimal,
    },
    YieldRedeemed {
        account: String,
        amount: Decimal,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::TokenSeeded { .. } => "TokenSeeded",
            EngineEvent::TokenMinted { .. } => "TokenMinted",
            EngineEvent::TokenBurned { .. } => "TokenBurned",
            EngineEvent::MarketCreated { .. } => "MarketCreated",
            EngineEvent::PositionBought { .. } => "PositionBought",
            EngineEvent::MarketFinalized { .. } => "MarketFinalized",
            EngineEvent::Redeemed { .. } => "Redeemed",
            EngineEvent::StakeReclaimed { .. } => "StakeReclaimed",
            EngineEvent::CompleteSetsMinted { .. } => "CompleteSetsMinted",
            EngineEvent::CompleteSetsRedeemed { .. } => "CompleteSetsRedeemed",
            EngineEvent::VoteCast { .. } => "VoteCast",
            EngineEvent::VotesWithdrawn { .. } => "VotesWithdrawn",
            EngineEvent::YieldFunded { .. } => "YieldFunded",
            EngineEvent::YieldDeposited { .. } => "YieldDeposited",
            EngineEvent::YieldWithdrawn { .. } => "YieldWithdrawn",
            EngineEvent::YieldRedeemed { .. } => "YieldRedeemed",
        }
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// Keeps every event in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<EngineEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<EngineEvent> {
        self.events().pop()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: EngineEvent) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Writes every event to the tracing subscriber as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: EngineEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "vision_monitor::events", event = event.name(), %json),
            Err(e) => tracing::warn!(target: "vision_monitor::events", event = event.name(), error = %e, "event not serializable"),
        }
    }
}
