//! Engine configuration
//!
//! Defaults, JSON, or environment (`.env` honoured). Every source goes
//! through `validate` before the engine is built from it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::market_resolve::{BancorPricing, PricingStrategy, QuadraticCost, DEFAULT_DISPUTE_WINDOW_SECS};
use crate::token::TokenCurve;

/// How outcome shares are priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingConfig {
    Quadratic {
        base_price: Decimal,
        slope: Decimal,
    },
    Bancor {
        reserve_ratio: Decimal,
        virtual_supply: Decimal,
        virtual_reserve: Decimal,
    },
}

impl PricingConfig {
    pub fn default_quadratic() -> Self {
        PricingConfig::Quadratic {
            base_price: dec!(1),
            slope: dec!(0.001),
        }
    }

    pub fn default_bancor() -> Self {
        PricingConfig::Bancor {
            reserve_ratio: dec!(0.5),
            virtual_supply: dec!(100),
            virtual_reserve: dec!(100),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::default_quadratic()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub reserve_asset: String,
    pub token_asset: String,
    pub token_curve: TokenCurve,
    pub exit_fee: Decimal,
    pub dispute_window_secs: i64,
    pub pricing: PricingConfig,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reserve_asset: "WETH".to_string(),
            token_asset: "VISION".to_string(),
            token_curve: TokenCurve::Linear,
            exit_fee: dec!(0.01),
            dispute_window_secs: DEFAULT_DISPUTE_WINDOW_SECS,
            pricing: PricingConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load `.env` if present, then apply `VISION_*` overrides to the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(asset) = lookup("VISION_RESERVE_ASSET") {
            config.reserve_asset = asset;
        }
        if let Some(asset) = lookup("VISION_TOKEN_ASSET") {
            config.token_asset = asset;
        }
        if let Some(fee) = lookup("VISION_EXIT_FEE") {
            config.exit_fee = parse_decimal("VISION_EXIT_FEE", &fee)?;
        }
        if let Some(window) = lookup("VISION_DISPUTE_WINDOW_SECS") {
            config.dispute_window_secs = window.trim().parse().map_err(|_| {
                EngineError::Config(format!("VISION_DISPUTE_WINDOW_SECS is not an integer: {}", window))
            })?;
        }
        if let Some(ratio) = lookup("VISION_RESERVE_RATIO") {
            config.token_curve = TokenCurve::Bancor {
                reserve_ratio: parse_decimal("VISION_RESERVE_RATIO", &ratio)?,
            };
        }
        if let Some(pricing) = lookup("VISION_PRICING") {
            config.pricing = match pricing.trim().to_lowercase().as_str() {
                "quadratic" => PricingConfig::default_quadratic(),
                "bancor" => PricingConfig::default_bancor(),
                other => {
                    return Err(EngineError::Config(format!("unknown VISION_PRICING: {}", other)));
                }
            };
        }
        if let Some(level) = lookup("VISION_LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reserve_asset.is_empty() || self.token_asset.is_empty() {
            return Err(EngineError::Config("asset symbols must not be empty".to_string()));
        }
        if self.reserve_asset == self.token_asset {
            return Err(EngineError::Config(format!(
                "reserve and token asset must differ, both are {}",
                self.token_asset
            )));
        }
        if self.exit_fee < Decimal::ZERO || self.exit_fee >= Decimal::ONE {
            return Err(EngineError::Config(format!(
                "exit fee must be in [0, 1), got {}",
                self.exit_fee
            )));
        }
        if self.dispute_window_secs <= 0 {
            return Err(EngineError::Config(format!(
                "dispute window must be positive, got {}",
                self.dispute_window_secs
            )));
        }
        self.token_curve.validate()?;
        self.build_pricing()?;
        crate::telemetry::parse_level(&self.log_level)?;
        Ok(())
    }

    pub fn token_curve(&self) -> Result<TokenCurve> {
        self.token_curve.validate()?;
        Ok(self.token_curve)
    }

    pub fn build_pricing(&self) -> Result<Box<dyn PricingStrategy>> {
        let strategy: Box<dyn PricingStrategy> = match self.pricing {
            PricingConfig::Quadratic { base_price, slope } => Box::new(QuadraticCost::new(base_price, slope)?),
            PricingConfig::Bancor {
                reserve_ratio,
                virtual_supply,
                virtual_reserve,
            } => Box::new(BancorPricing::new(reserve_ratio, virtual_supply, virtual_reserve)?),
        };
        Ok(strategy)
    }
}

fn parse_decimal(key: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| EngineError::Config(format!("{} is not a decimal ({}): {}", key, e, raw)))
}
