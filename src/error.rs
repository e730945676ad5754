//! Error types for the Vision engine

use thiserror::Error;

/// Every failure a core operation can return.
///
/// Operations check and compute everything before their first write, so an
/// `Err` always means the call had no effect.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EngineError {
    // === Call rejected by the state machine or a time window ===
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    // === Checked-arithmetic guards on balances ===
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Insufficient allowance: {0}")]
    InsufficientAllowance(String),

    // === Caller lacks the position the action needs ===
    #[error("Unauthorized: {0}")]
    AuthorizationViolation(String),

    // === Internal, should be unreachable ===
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        EngineError::PreconditionViolation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        EngineError::InvariantViolation(msg.into())
    }

    /// The fixed message carried by message-bearing variants.
    pub fn message(&self) -> Option<&str> {
        match self {
            EngineError::PreconditionViolation(m)
            | EngineError::InsufficientBalance(m)
            | EngineError::InsufficientAllowance(m)
            | EngineError::AuthorizationViolation(m)
            | EngineError::InvariantViolation(m)
            | EngineError::InvalidAmount(m)
            | EngineError::NotFound(m)
            | EngineError::Config(m) => Some(m.as_str()),
            EngineError::ArithmeticOverflow(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
