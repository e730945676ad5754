/// Vision Monitor token-economics engine
/// Exports all modules for use as a library crate

pub mod config;
pub mod error;
pub mod host;
pub mod market_resolve;
pub mod math;
pub mod shares;
pub mod telemetry;
pub mod token;
pub mod yield_offering;

pub use config::{EngineConfig, PricingConfig};
pub use error::{EngineError, Result};
pub use math::{Amount, AMOUNT_SCALE};

// Re-export from host (collaborators)
pub use host::{
    AccountId, AssetId, Clock, EngineEvent, EventSink, Host, InMemoryLedger, Ledger, LedgerStats,
    LedgerTransaction, ManualClock, RecordingSink, SystemClock, TracingSink, TxType,
};

// Re-export from token (reserve token)
pub use token::{BurnQuote, ReserveToken, TokenCurve};

// Re-export from shares (outcome share system)
pub use shares::{Outcome, OutcomeBook, ShareId, ShareIndexCounter, ShareStats, ShareTriple};

// Re-export from market_resolve (markets & resolution)
pub use market_resolve::{
    BancorPricing, Market, MarketKind, MarketRegistry, MarketState, MarketStats, PricingStrategy,
    QuadraticCost, Vote, VoteBook, DEFAULT_DISPUTE_WINDOW_SECS,
};

// Re-export from yield_offering (stake pools)
pub use yield_offering::{Pool, Position, PositionUpdate, YieldDistributor, POOL_COUNT};

pub use telemetry::init_tracing;
