// ============================================================================
// Reserve Token Module - Vision
// ============================================================================
//
// Vision is a utility token minted against a reserve asset (WETH) and burned
// back into it along a bonding curve.
//
// Flow:
//   mint:  depositor approves WETH -> WETH pulled into custody -> Vision minted
//   burn:  holder approves Vision  -> Vision pulled and burned  -> WETH paid out
//
// The exit fee is kept in the reserve, so every outstanding Vision stays
// backed by at least its curve price.
//
// ============================================================================

pub mod curve;

pub use curve::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::host::{AccountId, AssetId, EngineEvent, Host};
use crate::math;

/// Breakdown of a burn before it happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnQuote {
    /// Reserve released by the curve
    pub gross: Decimal,
    /// Exit fee retained in the reserve
    pub fee: Decimal,
    /// Reserve paid to the holder
    pub net: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveToken {
    reserve_asset: AssetId,
    token_asset: AssetId,
    /// Ledger account holding the reserve
    custody: AccountId,
    curve: TokenCurve,
    exit_fee: Decimal,
    total_supply: Decimal,
    reserve_balance: Decimal,
    fees_collected: Decimal,
}

impl ReserveToken {
    pub fn new(
        reserve_asset: AssetId,
        token_asset: AssetId,
        custody: impl Into<AccountId>,
        curve: TokenCurve,
        exit_fee: Decimal,
    ) -> Result<Self> {
        curve.validate()?;
        if exit_fee < Decimal::ZERO || exit_fee >= Decimal::ONE {
            return Err(EngineError::Config(format!(
                "exit fee must be in [0, 1), got {}",
                exit_fee
            )));
        }
        if reserve_asset == token_asset {
            return Err(EngineError::Config(
                "reserve asset and token asset must differ".to_string(),
            ));
        }

        Ok(Self {
            reserve_asset,
            token_asset,
            custody: custody.into(),
            curve,
            exit_fee,
            total_supply: Decimal::ZERO,
            reserve_balance: Decimal::ZERO,
            fees_collected: Decimal::ZERO,
        })
    }

    pub fn reserve_asset(&self) -> &AssetId {
        &self.reserve_asset
    }

    pub fn token_asset(&self) -> &AssetId {
        &self.token_asset
    }

    pub fn custody(&self) -> &str {
        &self.custody
    }

    pub fn curve(&self) -> TokenCurve {
        self.curve
    }

    pub fn exit_fee(&self) -> Decimal {
        self.exit_fee
    }

    pub fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    pub fn reserve_balance(&self) -> Decimal {
        self.reserve_balance
    }

    pub fn fees_collected(&self) -> Decimal {
        self.fees_collected
    }

    /// Vision a holder owns, as recorded by the ledger
    pub fn balance_of(&self, host: &Host, account: &str) -> Decimal {
        host.ledger.balance_of(&self.token_asset, account)
    }

    // ========================================================================
    // QUOTES
    // ========================================================================

    pub fn quote_mint(&self, reserve_amount: Decimal) -> Result<Decimal> {
        math::ensure_positive(reserve_amount, "reserve amount")?;
        let tokens = math::round_down(self.curve.purchase_return(
            self.total_supply,
            self.reserve_balance,
            reserve_amount,
        )?);
        if tokens.is_zero() {
            return Err(EngineError::InvalidAmount(format!(
                "deposit of {} mints nothing",
                reserve_amount
            )));
        }
        Ok(tokens)
    }

    pub fn quote_burn(&self, token_amount: Decimal) -> Result<BurnQuote> {
        math::ensure_positive(token_amount, "token amount")?;
        let gross = math::round_down(self.curve.sale_return(
            self.total_supply,
            self.reserve_balance,
            token_amount,
        )?);
        let fee = math::round_up(math::mul(gross, self.exit_fee)?).min(gross);
        let net = math::sub(gross, fee)?;
        if gross > self.reserve_balance {
            return Err(EngineError::invariant(format!(
                "burn releases {} but reserve holds {}",
                gross, self.reserve_balance
            )));
        }
        Ok(BurnQuote { gross, fee, net })
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Bootstrap the curve with supply and reserve. Allowed whenever the
    /// supply is zero; reserve left behind by exit fees is kept.
    pub fn seed(
        &mut self,
        host: &mut Host,
        seeder: &str,
        reserve_amount: Decimal,
        initial_supply: Decimal,
    ) -> Result<Decimal> {
        if !self.total_supply.is_zero() {
            return Err(EngineError::precondition("token already seeded"));
        }
        math::ensure_positive(reserve_amount, "seed reserve")?;
        math::ensure_positive(initial_supply, "seed supply")?;
        if self.curve == TokenCurve::Linear && reserve_amount != initial_supply {
            return Err(EngineError::precondition(
                "linear curve must be seeded one to one",
            ));
        }
        let new_reserve = math::add(self.reserve_balance, reserve_amount)?;
        host.ensure_can_pull(&self.reserve_asset, seeder, &self.custody, reserve_amount)?;

        host.pull(&self.reserve_asset, seeder, &self.custody, reserve_amount)?;
        host.ledger.mint(&self.token_asset, seeder, initial_supply)?;

        self.total_supply = initial_supply;
        self.reserve_balance = new_reserve;

        info!(seeder, %reserve_amount, %initial_supply, reserve = %new_reserve, curve = %self.curve, "reserve token seeded");
        host.emit(EngineEvent::TokenSeeded {
            account: seeder.to_string(),
            reserve_in: reserve_amount,
            tokens_out: initial_supply,
        });
        Ok(initial_supply)
    }

    /// Deposit `reserve_amount` of the reserve asset, receive Vision.
    pub fn mint(&mut self, host: &mut Host, depositor: &str, reserve_amount: Decimal) -> Result<Decimal> {
        let tokens = self.quote_mint(reserve_amount)?;
        let new_supply = math::add(self.total_supply, tokens)?;
        let new_reserve = math::add(self.reserve_balance, reserve_amount)?;
        host.ensure_can_pull(&self.reserve_asset, depositor, &self.custody, reserve_amount)?;

        host.pull(&self.reserve_asset, depositor, &self.custody, reserve_amount)?;
        host.ledger.mint(&self.token_asset, depositor, tokens)?;

        self.total_supply = new_supply;
        self.reserve_balance = new_reserve;

        info!(depositor, %reserve_amount, %tokens, supply = %self.total_supply, "vision minted");
        host.emit(EngineEvent::TokenMinted {
            account: depositor.to_string(),
            reserve_in: reserve_amount,
            tokens_out: tokens,
        });
        Ok(tokens)
    }

    /// Burn `token_amount` Vision, receive the reserve asset minus the exit fee.
    pub fn burn(&mut self, host: &mut Host, holder: &str, token_amount: Decimal) -> Result<Decimal> {
        math::ensure_positive(token_amount, "token amount")?;
        let held = self.balance_of(host, holder);
        if token_amount > held {
            return Err(EngineError::InsufficientBalance(format!(
                "{} holds {} {}, cannot burn {}",
                holder, held, self.token_asset, token_amount
            )));
        }
        let quote = self.quote_burn(token_amount)?;
        debug!(holder, %token_amount, gross = %quote.gross, fee = %quote.fee, "burn quoted");

        let new_supply = math::sub_nonneg(self.total_supply, token_amount, "vision supply")?;
        let new_reserve = math::sub_nonneg(self.reserve_balance, quote.net, "reserve balance")?;
        let new_fees = math::add(self.fees_collected, quote.fee)?;
        host.ensure_can_pull(&self.token_asset, holder, &self.custody, token_amount)?;
        host.ensure_custody_covers(&self.reserve_asset, &self.custody, quote.net)?;

        host.pull(&self.token_asset, holder, &self.custody, token_amount)?;
        host.ledger.burn(&self.token_asset, &self.custody, token_amount)?;
        if !quote.net.is_zero() {
            host.ledger
                .transfer(&self.reserve_asset, &self.custody, holder, quote.net)?;
        }

        self.total_supply = new_supply;
        self.reserve_balance = new_reserve;
        self.fees_collected = new_fees;

        info!(holder, %token_amount, reserve_out = %quote.net, fee = %quote.fee, "vision burned");
        host.emit(EngineEvent::TokenBurned {
            account: holder.to_string(),
            tokens_in: token_amount,
            reserve_out: quote.net,
            fee: quote.fee,
        });
        Ok(quote.net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{InMemoryLedger, ManualClock, RecordingSink};
    use rust_decimal_macros::dec;

    const MONITOR: &str = "monitor";

    fn setup(curve: TokenCurve, fee: Decimal) -> (Host, ReserveToken) {
        let mut host = Host::new(InMemoryLedger::new(), ManualClock::new(0), RecordingSink::new());
        let token = ReserveToken::new(
            AssetId::new("WETH"),
            AssetId::new("VISION"),
            MONITOR,
            curve,
            fee,
        )
        .unwrap();
        host.ledger.mint(token.reserve_asset(), "alice", dec!(10000)).unwrap();
        host.ledger
            .approve(token.reserve_asset(), "alice", MONITOR, dec!(10000))
            .unwrap();
        host.ledger
            .approve(token.token_asset(), "alice", MONITOR, dec!(100000))
            .unwrap();
        (host, token)
    }

    #[test]
    fn test_linear_mint_is_one_to_one() {
        let (mut host, mut token) = setup(TokenCurve::Linear, Decimal::ZERO);
        let minted = token.mint(&mut host, "alice", dec!(2500)).unwrap();

        assert_eq!(minted, dec!(2500));
        assert_eq!(token.total_supply(), dec!(2500));
        assert_eq!(token.reserve_balance(), dec!(2500));
        assert_eq!(host.ledger.balance_of(token.reserve_asset(), MONITOR), dec!(2500));
        assert_eq!(token.balance_of(&host, "alice"), dec!(2500));
    }

    #[test]
    fn test_linear_round_trip_without_fee() {
        let (mut host, mut token) = setup(TokenCurve::Linear, Decimal::ZERO);
        let minted = token.mint(&mut host, "alice", dec!(1234.5)).unwrap();
        let back = token.burn(&mut host, "alice", minted).unwrap();

        assert_eq!(back, dec!(1234.5));
        assert_eq!(token.total_supply(), Decimal::ZERO);
        assert_eq!(host.ledger.balance_of(token.reserve_asset(), "alice"), dec!(10000));
    }

    #[test]
    fn test_linear_round_trip_with_exit_fee() {
        let (mut host, mut token) = setup(TokenCurve::Linear, dec!(0.01));
        token.mint(&mut host, "alice", dec!(1000)).unwrap();
        let back = token.burn(&mut host, "alice", dec!(1000)).unwrap();

        assert_eq!(back, dec!(990));
        assert_eq!(token.fees_collected(), dec!(10));
        // fee stays in the reserve
        assert_eq!(token.reserve_balance(), dec!(10));
        assert_eq!(host.ledger.balance_of(token.reserve_asset(), MONITOR), dec!(10));
    }

    #[test]
    fn test_burn_more_than_balance_fails_without_effect() {
        let (mut host, mut token) = setup(TokenCurve::Linear, Decimal::ZERO);
        token.mint(&mut host, "alice", dec!(100)).unwrap();

        let err = token.burn(&mut host, "alice", dec!(101)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance(_)));
        assert_eq!(token.total_supply(), dec!(100));
        assert_eq!(token.balance_of(&host, "alice"), dec!(100));
    }

    #[test]
    fn test_mint_without_allowance_fails_without_effect() {
        let (mut host, mut token) = setup(TokenCurve::Linear, Decimal::ZERO);
        host.ledger.mint(token.reserve_asset(), "bob", dec!(50)).unwrap();

        let err = token.mint(&mut host, "bob", dec!(50)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientAllowance(_)));
        assert_eq!(token.total_supply(), Decimal::ZERO);
        assert_eq!(host.ledger.balance_of(token.reserve_asset(), "bob"), dec!(50));
    }

    #[test]
    fn test_mint_rejects_non_positive() {
        let (mut host, mut token) = setup(TokenCurve::Linear, Decimal::ZERO);
        assert!(matches!(
            token.mint(&mut host, "alice", Decimal::ZERO),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(token.mint(&mut host, "alice", dec!(-5)).is_err());
    }

    #[test]
    fn test_bancor_requires_seed() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        let (mut host, mut token) = setup(curve, Decimal::ZERO);

        let err = token.mint(&mut host, "alice", dec!(10)).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionViolation(_)));

        token.seed(&mut host, "alice", dec!(1000), dec!(1000)).unwrap();
        assert!(token.seed(&mut host, "alice", dec!(1), dec!(1)).is_err());

        let first = token.mint(&mut host, "alice", dec!(100)).unwrap();
        let second = token.mint(&mut host, "alice", dec!(100)).unwrap();
        assert!(first > Decimal::ZERO);
        // price rises as the reserve grows
        assert!(second < first);
    }

    #[test]
    fn test_bancor_burn_never_drains_more_than_reserve() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        let (mut host, mut token) = setup(curve, dec!(0.01));
        token.seed(&mut host, "alice", dec!(1000), dec!(1000)).unwrap();
        let minted = token.mint(&mut host, "alice", dec!(500)).unwrap();

        let out = token.burn(&mut host, "alice", minted).unwrap();
        assert!(out > Decimal::ZERO);
        assert!(out < dec!(500));
        assert!(token.reserve_balance() >= Decimal::ZERO);
        assert_eq!(
            host.ledger.balance_of(token.reserve_asset(), MONITOR),
            token.reserve_balance()
        );
    }

    #[test]
    fn test_bancor_round_trip_returns_deposit_minus_fee() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        let (mut host, mut token) = setup(curve, dec!(0.01));
        token.seed(&mut host, "alice", dec!(1000), dec!(1000)).unwrap();

        let minted = token.mint(&mut host, "alice", dec!(500)).unwrap();
        let back = token.burn(&mut host, "alice", minted).unwrap();

        // 500 in, 1% exit fee on the way out
        assert!((back - dec!(495)).abs() < dec!(0.001), "got {}", back);
        assert_eq!(token.total_supply(), dec!(1000));
        assert_eq!(
            host.ledger.balance_of(token.reserve_asset(), MONITOR),
            token.reserve_balance()
        );
    }

    #[test]
    fn test_bancor_reseeds_after_full_burn() {
        let curve = TokenCurve::bancor(dec!(0.5)).unwrap();
        let (mut host, mut token) = setup(curve, dec!(0.01));
        token.seed(&mut host, "alice", dec!(1000), dec!(1000)).unwrap();

        let out = token.burn(&mut host, "alice", dec!(1000)).unwrap();
        assert_eq!(out, dec!(990));
        assert_eq!(token.total_supply(), Decimal::ZERO);
        assert_eq!(token.reserve_balance(), dec!(10));

        match token.mint(&mut host, "alice", dec!(10)).unwrap_err() {
            EngineError::PreconditionViolation(msg) => assert!(msg.contains("no supply")),
            other => panic!("unexpected error: {:?}", other),
        }

        token.seed(&mut host, "alice", dec!(100), dec!(100)).unwrap();
        // the fee left behind stays in the reserve
        assert_eq!(token.reserve_balance(), dec!(110));
        assert_eq!(token.total_supply(), dec!(100));

        let minted = token.mint(&mut host, "alice", dec!(10)).unwrap();
        assert!(minted > Decimal::ZERO);
        assert_eq!(host.ledger.balance_of(token.reserve_asset(), MONITOR), dec!(120));
        assert_eq!(token.reserve_balance(), dec!(120));
    }

    #[test]
    fn test_linear_seed_must_match() {
        let (mut host, mut token) = setup(TokenCurve::Linear, Decimal::ZERO);
        let err = token.seed(&mut host, "alice", dec!(10), dec!(20)).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionViolation(_)));
    }

    #[test]
    fn test_rejects_bad_exit_fee() {
        let result = ReserveToken::new(
            AssetId::new("WETH"),
            AssetId::new("VISION"),
            MONITOR,
            TokenCurve::Linear,
            dec!(1),
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
