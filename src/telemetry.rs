//! Tracing bootstrap

use tracing::Level;

use crate::error::{EngineError, Result};

pub fn parse_level(level: &str) -> Result<Level> {
    level
        .trim()
        .parse::<Level>()
        .map_err(|_| EngineError::Config(format!("unknown log level: {}", level)))
}

/// Install a `fmt` subscriber at `level`. Fails if one is already installed.
pub fn init_tracing(level: &str) -> Result<()> {
    let level = parse_level(level)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| EngineError::Config(format!("tracing already initialised: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), Level::WARN);
        assert!(parse_level("loud").is_err());
    }
}
