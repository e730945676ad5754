// ============================================================================
// Markets & Registry - Vision Prediction Markets
// ============================================================================
//
// Every market is ternary (INVALID / NO / YES) and resolves without an
// oracle, king-of-the-hill style:
//
//   Open --stake--> Leading(outcome, since) --finalize--> Finalized(outcome)
//     |
//     +--creator reclaims an untouched market--> Abandoned
//
// A stake-changing call that leaves one outcome strictly ahead of the other
// two makes it the leader; `since` only moves when the leader changes.
// `finalize_market` succeeds once now >= end_time and the leader has held for
// the whole dispute window. There is no timer.
//
// Two kinds of market share the registry's share-id counter:
//
//   POSITIONS (create_market):
//     buy shares at a curve price; pool = creator stake + every purchase cost;
//     winners split the pool pro rata.
//
//   REALITY (create_reality_market):
//     1 Vision -> complete set; voters lock Vision behind an outcome; the
//     outcome with most votes leads; winning shares redeem 1:1 against the
//     complete-set collateral; the creator's bond is returned after resolution.
//
// All Vision the registry holds sits in its custody account on the ledger.
//
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use super::pricing::PricingStrategy;
use super::voting::{Vote, VoteBook};
use crate::error::{EngineError, Result};
use crate::host::{AccountId, AssetId, EngineEvent, Host};
use crate::math;
use crate::shares::{
    credit_complete_sets, debit_complete_sets, pro_rata_payout, Outcome, OutcomeBook, ShareId,
    ShareIndexCounter, ShareTriple,
};

pub const ERR_END_TIME_PAST: &str = "end time in the past";
pub const ERR_NOT_FINALIZED: &str = "Market not finalized.";
pub const ERR_NOT_REDEEMABLE: &str = "Selected token is not redeemable";
pub const ERR_NO_WINNING_STAKE: &str = "User has no stake in the winning outcome";
pub const ERR_VOTE_NOT_COMPLETED: &str = "vote not completed";
pub const ERR_NOT_OPEN: &str = "market not open";
pub const ERR_ALREADY_FINALIZED: &str = "market already finalized";

/// One week
pub const DEFAULT_DISPUTE_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

// ============================================================================
// MARKET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    /// Priced purchases, pro-rata pool payout
    Positions,
    /// Complete sets and voting, 1:1 payout
    Reality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MarketState {
    Open,
    Leading { outcome: Outcome, since: i64 },
    Finalized { outcome: Outcome },
    Abandoned,
}

impl MarketState {
    /// Still accepting stakes
    pub fn is_open(&self) -> bool {
        matches!(self, MarketState::Open | MarketState::Leading { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn winner(&self) -> Option<Outcome> {
        match self {
            MarketState::Finalized { outcome } => Some(*outcome),
            _ => None,
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketState::Open => write!(f, "open"),
            MarketState::Leading { outcome, since } => write!(f, "leading({} since {})", outcome, since),
            MarketState::Finalized { outcome } => write!(f, "finalized({})", outcome),
            MarketState::Abandoned => write!(f, "abandoned"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub index: u64,
    pub question: String,
    pub end_time: i64,
    pub creator: AccountId,
    pub creator_stake: Decimal,
    pub shares: ShareTriple,
    pub kind: MarketKind,
    pub state: MarketState,
    pub created_at: i64,

    /// Value staked behind each outcome: purchase costs or locked votes
    pub staked: [Decimal; 3],

    /// Creator stake plus every purchase cost
    pub pool: Decimal,
    /// Part of the pool not yet paid to winners
    pub remaining_pool: Decimal,
    /// Winning shares not yet redeemed
    pub remaining_winning_supply: Decimal,

    /// Vision backing outstanding complete sets
    pub collateral: Decimal,

    pub purchases: u64,
    pub stake_reclaimed: bool,
}

impl Market {
    pub fn current_leader(&self) -> Option<Outcome> {
        match self.state {
            MarketState::Leading { outcome, .. } | MarketState::Finalized { outcome } => Some(outcome),
            _ => None,
        }
    }

    pub fn leader_since(&self) -> Option<i64> {
        match self.state {
            MarketState::Leading { since, .. } => Some(since),
            _ => None,
        }
    }

    pub fn share(&self, outcome: Outcome) -> ShareId {
        self.shares.get(outcome)
    }

    pub fn staked_on(&self, outcome: Outcome) -> Decimal {
        self.staked[outcome.offset()]
    }

    pub fn outcome_of(&self, share: ShareId) -> Result<Outcome> {
        self.shares.outcome_of(share).ok_or_else(|| {
            EngineError::NotFound(format!("{} is not an outcome of market {}", share, self.index))
        })
    }

    pub fn ensure_open(&self) -> Result<()> {
        if !self.state.is_open() {
            return Err(EngineError::precondition(ERR_NOT_OPEN));
        }
        Ok(())
    }

    fn ensure_kind(&self, kind: MarketKind, action: &str) -> Result<()> {
        if self.kind != kind {
            return Err(EngineError::precondition(format!(
                "{} not offered on {:?} market {}",
                action, self.kind, self.index
            )));
        }
        Ok(())
    }

    /// Earliest time an untouched market can be abandoned
    pub fn dispute_deadline(&self, dispute_window: i64) -> Result<i64> {
        self.end_time
            .checked_add(dispute_window)
            .ok_or(EngineError::ArithmeticOverflow("dispute deadline"))
    }

    /// Stakes and state after `amount` more is staked behind `outcome` at `now`.
    fn restake(&self, outcome: Outcome, amount: Decimal, now: i64) -> Result<([Decimal; 3], MarketState)> {
        let mut staked = self.staked;
        let slot = outcome.offset();
        staked[slot] = math::add(staked[slot], amount)?;

        let ahead = Outcome::ALL
            .into_iter()
            .filter(|o| *o != outcome)
            .all(|o| staked[slot] > staked[o.offset()]);

        let state = match self.state {
            MarketState::Leading { outcome: current, .. } if current == outcome => self.state,
            _ if ahead => MarketState::Leading { outcome, since: now },
            unchanged => unchanged,
        };
        Ok((staked, state))
    }
}

/// Summary of one market for observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStats {
    pub index: u64,
    pub kind: MarketKind,
    pub state: MarketState,
    pub pool: Decimal,
    pub staked: [Decimal; 3],
    pub supplies: [Decimal; 3],
    pub collateral: Decimal,
    pub purchases: u64,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug)]
pub struct MarketRegistry {
    token_asset: AssetId,
    custody: AccountId,
    dispute_window: i64,
    pricing: Box<dyn PricingStrategy>,
    markets: Vec<Market>,
    counter: ShareIndexCounter,
    book: OutcomeBook,
    votes: VoteBook,
}

impl MarketRegistry {
    pub fn new(
        token_asset: AssetId,
        custody: impl Into<AccountId>,
        dispute_window: i64,
        pricing: Box<dyn PricingStrategy>,
    ) -> Result<Self> {
        if dispute_window <= 0 {
            return Err(EngineError::Config(format!(
                "dispute window must be positive, got {}",
                dispute_window
            )));
        }
        Ok(Self {
            token_asset,
            custody: custody.into(),
            dispute_window,
            pricing,
            markets: Vec::new(),
            counter: ShareIndexCounter::new(),
            book: OutcomeBook::new(),
            votes: VoteBook::new(),
        })
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn token_asset(&self) -> &AssetId {
        &self.token_asset
    }

    pub fn custody(&self) -> &str {
        &self.custody
    }

    pub fn dispute_window(&self) -> i64 {
        self.dispute_window
    }

    pub fn pricing(&self) -> &dyn PricingStrategy {
        self.pricing.as_ref()
    }

    pub fn book(&self) -> &OutcomeBook {
        &self.book
    }

    pub fn next_share_index(&self) -> u64 {
        self.counter.peek()
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn market(&self, index: u64) -> Result<&Market> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.markets.get(i))
            .ok_or_else(|| EngineError::NotFound(format!("market {}", index)))
    }

    fn market_mut(&mut self, index: u64) -> Result<&mut Market> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.markets.get_mut(i))
            .ok_or_else(|| EngineError::NotFound(format!("market {}", index)))
    }

    pub fn share_balance(&self, share: ShareId, account: &str) -> Decimal {
        self.book.balance_of(share, account)
    }

    pub fn share_supply(&self, share: ShareId) -> Decimal {
        self.book.total_supply(share)
    }

    /// Cumulative votes behind `outcome_id` (-1 invalid, 0 no, 1 yes).
    pub fn total_votes_for_outcome(&self, market_index: u64, outcome_id: i64) -> Result<Decimal> {
        self.market(market_index)?;
        let outcome = parse_vote_id(outcome_id)?;
        Ok(self.votes.total_for(market_index, outcome))
    }

    /// Votes `account` still has locked, indexed by `Outcome::offset`
    pub fn votes_of(&self, market_index: u64, account: &str) -> [Decimal; 3] {
        self.votes.locked_of(market_index, account)
    }

    pub fn vote_history(&self) -> &[Vote] {
        self.votes.history()
    }

    pub fn market_stats(&self, market_index: u64) -> Result<MarketStats> {
        let market = self.market(market_index)?;
        let ids = market.shares.ids();
        Ok(MarketStats {
            index: market.index,
            kind: market.kind,
            state: market.state,
            pool: market.pool,
            staked: market.staked,
            supplies: ids.map(|s| self.book.total_supply(s)),
            collateral: market.collateral,
            purchases: market.purchases,
        })
    }

    /// Cost of `amount` more shares of `share` at its current supply.
    pub fn quote_cost(&self, market_index: u64, share: ShareId, amount: Decimal) -> Result<Decimal> {
        let market = self.market(market_index)?;
        market.outcome_of(share)?;
        self.pricing.compute_cost(self.book.total_supply(share), amount)
    }

    // ========================================================================
    // CREATION
    // ========================================================================

    /// Open a positions market, locking `stake` Vision from `creator`.
    pub fn create_market(
        &mut self,
        host: &mut Host,
        creator: &str,
        question: &str,
        end_time: i64,
        stake: Decimal,
    ) -> Result<u64> {
        self.open_market(host, creator, question, end_time, stake, MarketKind::Positions)
    }

    /// Open a complete-set/voting market, locking `stake` Vision as a bond.
    pub fn create_reality_market(
        &mut self,
        host: &mut Host,
        creator: &str,
        question: &str,
        end_time: i64,
        stake: Decimal,
    ) -> Result<u64> {
        self.open_market(host, creator, question, end_time, stake, MarketKind::Reality)
    }

    fn open_market(
        &mut self,
        host: &mut Host,
        creator: &str,
        question: &str,
        end_time: i64,
        stake: Decimal,
        kind: MarketKind,
    ) -> Result<u64> {
        let now = host.now();
        if end_time <= now {
            warn!(creator, end_time, now, "market rejected: end time in the past");
            return Err(EngineError::precondition(ERR_END_TIME_PAST));
        }
        math::ensure_positive(stake, "creator stake")?;
        let index = u64::try_from(self.markets.len())
            .map_err(|_| EngineError::ArithmeticOverflow("market index"))?;
        let mut counter = self.counter.clone();
        let shares = counter.allocate_triple()?;
        host.ensure_can_pull(&self.token_asset, creator, &self.custody, stake)?;

        host.pull(&self.token_asset, creator, &self.custody, stake)?;
        self.counter = counter;

        let pool = match kind {
            MarketKind::Positions => stake,
            MarketKind::Reality => Decimal::ZERO,
        };
        self.markets.push(Market {
            index,
            question: question.to_string(),
            end_time,
            creator: creator.to_string(),
            creator_stake: stake,
            shares,
            kind,
            state: MarketState::Open,
            created_at: now,
            staked: [Decimal::ZERO; 3],
            pool,
            remaining_pool: Decimal::ZERO,
            remaining_winning_supply: Decimal::ZERO,
            collateral: Decimal::ZERO,
            purchases: 0,
            stake_reclaimed: false,
        });

        let ids = shares.ids();
        info!(index, ?kind, creator, %stake, end_time, question, "market created");
        host.emit(EngineEvent::MarketCreated {
            index,
            invalid_index: ids[0].index(),
            no_index: ids[1].index(),
            yes_index: ids[2].index(),
            stake,
        });
        Ok(index)
    }

    // ========================================================================
    // POSITIONS
    // ========================================================================

    /// Buy `amount` shares of `share`, paying the curve cost. Returns the cost.
    pub fn buy_position(
        &mut self,
        host: &mut Host,
        buyer: &str,
        market_index: u64,
        share: ShareId,
        amount: Decimal,
    ) -> Result<Decimal> {
        math::ensure_positive(amount, "share amount")?;
        let (outcome, supply) = self.position_target(market_index, share)?;
        let cost = self.pricing.compute_cost(supply, amount)?;
        debug!(market_index, %share, %supply, %amount, %cost, pricing = self.pricing.name(), "position quoted");

        self.execute_purchase(host, buyer, market_index, outcome, amount, cost)?;
        Ok(cost)
    }

    /// Spend at most `deposit` on `share`. Returns the shares bought.
    pub fn buy_with_deposit(
        &mut self,
        host: &mut Host,
        buyer: &str,
        market_index: u64,
        share: ShareId,
        deposit: Decimal,
    ) -> Result<Decimal> {
        math::ensure_positive(deposit, "deposit")?;
        let (outcome, supply) = self.position_target(market_index, share)?;
        let shares = self.pricing.compute_purchase_return(supply, deposit)?;
        if shares <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "deposit {} buys no shares of {}",
                deposit, share
            )));
        }
        let cost = self.pricing.compute_cost(supply, shares)?;
        if cost > deposit {
            return Err(EngineError::invariant(format!(
                "{} shares cost {}, more than deposit {}",
                shares, cost, deposit
            )));
        }
        debug!(market_index, %share, %deposit, %shares, %cost, "deposit converted to shares");

        self.execute_purchase(host, buyer, market_index, outcome, shares, cost)?;
        Ok(shares)
    }

    fn position_target(&self, market_index: u64, share: ShareId) -> Result<(Outcome, Decimal)> {
        let market = self.market(market_index)?;
        market.ensure_kind(MarketKind::Positions, "positions")?;
        market.ensure_open()?;
        let outcome = market.outcome_of(share)?;
        Ok((outcome, self.book.total_supply(share)))
    }

    fn execute_purchase(
        &mut self,
        host: &mut Host,
        buyer: &str,
        market_index: u64,
        outcome: Outcome,
        shares: Decimal,
        cost: Decimal,
    ) -> Result<()> {
        let now = host.now();
        let market = self.market(market_index)?;
        let share = market.share(outcome);
        let previous_leader = market.current_leader();
        let (staked, state) = market.restake(outcome, cost, now)?;
        let pool = math::add(market.pool, cost)?;
        let purchases = market
            .purchases
            .checked_add(1)
            .ok_or(EngineError::ArithmeticOverflow("purchase count"))?;
        self.book.check_credit(share, buyer, shares)?;
        host.ensure_can_pull(&self.token_asset, buyer, &self.custody, cost)?;

        host.pull(&self.token_asset, buyer, &self.custody, cost)?;
        self.book.credit(share, buyer, shares)?;

        let market = self.market_mut(market_index)?;
        market.staked = staked;
        market.state = state;
        market.pool = pool;
        market.purchases = purchases;

        if market.current_leader() != previous_leader {
            info!(market_index, leader = %outcome, since = now, "leader changed");
        }
        info!(market_index, buyer, %outcome, %shares, %cost, pool = %pool, "position bought");
        host.emit(EngineEvent::PositionBought {
            account: buyer.to_string(),
            stake: cost,
            market_index,
            share_index: share.index(),
            shares,
        });
        Ok(())
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// Finalize on the current leader once the end time has passed and the
    /// leader has held for the dispute window. Anyone may call.
    pub fn finalize_market(&mut self, host: &mut Host, market_index: u64) -> Result<Outcome> {
        let now = host.now();
        let window = self.dispute_window;
        let market = self.market(market_index)?;
        let (outcome, since) = match market.state {
            MarketState::Finalized { .. } => return Err(EngineError::precondition(ERR_ALREADY_FINALIZED)),
            MarketState::Abandoned => return Err(EngineError::precondition(ERR_NOT_OPEN)),
            MarketState::Open => {
                warn!(market_index, now, "finalize rejected: no leader");
                return Err(EngineError::precondition(ERR_NOT_FINALIZED));
            }
            MarketState::Leading { outcome, since } => (outcome, since),
        };
        let held = now
            .checked_sub(since)
            .ok_or(EngineError::ArithmeticOverflow("leader hold time"))?;
        if now < market.end_time || held < window {
            warn!(market_index, now, end_time = market.end_time, held, window, "finalize rejected");
            return Err(EngineError::precondition(ERR_NOT_FINALIZED));
        }
        let share = market.share(outcome);
        let winning_supply = self.book.total_supply(share);

        let market = self.market_mut(market_index)?;
        market.state = MarketState::Finalized { outcome };
        market.remaining_pool = market.pool;
        market.remaining_winning_supply = winning_supply;

        info!(market_index, %outcome, pool = %market.pool, %winning_supply, "market finalized");
        host.emit(EngineEvent::MarketFinalized {
            index: market_index,
            outcome: share.index(),
        });
        Ok(outcome)
    }

    /// Burn the caller's whole winning balance for its payout.
    pub fn withdraw_winning_stake(
        &mut self,
        host: &mut Host,
        account: &str,
        market_index: u64,
        share: ShareId,
    ) -> Result<Decimal> {
        let market = self.market(market_index)?;
        let winner = market
            .state
            .winner()
            .ok_or_else(|| EngineError::precondition(ERR_NOT_FINALIZED))?;
        if market.shares.outcome_of(share) != Some(winner) {
            warn!(market_index, account, %share, %winner, "redeem rejected: losing share");
            return Err(EngineError::precondition(ERR_NOT_REDEEMABLE));
        }
        let balance = self.book.balance_of(share, account);
        if balance.is_zero() {
            return Err(EngineError::AuthorizationViolation(ERR_NO_WINNING_STAKE.to_string()));
        }

        let (payout, remaining_pool, collateral) = match market.kind {
            MarketKind::Positions => {
                let owed = pro_rata_payout(balance, market.remaining_pool, market.remaining_winning_supply)?;
                let left = math::sub_nonneg(market.remaining_pool, owed, "remaining pool")?;
                (owed, left, market.collateral)
            }
            MarketKind::Reality => {
                let left = math::sub_nonneg(market.collateral, balance, "complete set collateral")?;
                (balance, market.remaining_pool, left)
            }
        };
        let remaining_supply =
            math::sub_nonneg(market.remaining_winning_supply, balance, "remaining winning supply")?;
        host.ensure_custody_covers(&self.token_asset, &self.custody, payout)?;

        if !payout.is_zero() {
            host.ledger
                .transfer(&self.token_asset, &self.custody, account, payout)?;
        }
        self.book.debit(share, account, balance)?;

        let market = self.market_mut(market_index)?;
        market.remaining_pool = remaining_pool;
        market.remaining_winning_supply = remaining_supply;
        market.collateral = collateral;

        info!(market_index, account, shares = %balance, %payout, remaining_pool = %remaining_pool, "winning stake withdrawn");
        host.emit(EngineEvent::Redeemed {
            account: account.to_string(),
            amount: payout,
        });
        Ok(payout)
    }

    /// Return the creator's stake.
    ///
    /// A positions market qualifies only if nobody bought in by the end of
    /// the dispute window; it is then abandoned. A reality market qualifies
    /// once finalized, or once abandoned the same way if nobody voted.
    pub fn reclaim_stake(&mut self, host: &mut Host, caller: &str, market_index: u64) -> Result<Decimal> {
        let now = host.now();
        let market = self.market(market_index)?;
        if caller != market.creator {
            return Err(EngineError::AuthorizationViolation(format!(
                "{} did not create market {}",
                caller, market_index
            )));
        }
        if market.stake_reclaimed {
            return Err(EngineError::precondition("stake already reclaimed"));
        }
        let deadline = market.dispute_deadline(self.dispute_window)?;
        let next_state = match (market.kind, market.state) {
            (MarketKind::Reality, MarketState::Finalized { .. }) => market.state,
            (MarketKind::Positions, MarketState::Finalized { .. }) => {
                return Err(EngineError::precondition("stake is part of the market pool"));
            }
            (_, MarketState::Open) if now >= deadline => MarketState::Abandoned,
            _ => return Err(EngineError::precondition(ERR_NOT_FINALIZED)),
        };
        let stake = market.creator_stake;
        host.ensure_custody_covers(&self.token_asset, &self.custody, stake)?;

        host.ledger
            .transfer(&self.token_asset, &self.custody, caller, stake)?;

        let market = self.market_mut(market_index)?;
        market.state = next_state;
        market.stake_reclaimed = true;
        if market.kind == MarketKind::Positions {
            market.pool = Decimal::ZERO;
        }

        info!(market_index, creator = caller, %stake, state = %next_state, "creator stake reclaimed");
        host.emit(EngineEvent::StakeReclaimed {
            index: market_index,
            account: caller.to_string(),
            amount: stake,
        });
        Ok(stake)
    }

    // ========================================================================
    // COMPLETE SETS
    // ========================================================================

    /// Lock `amount` Vision for `amount` of each outcome share.
    pub fn mint_complete_sets(
        &mut self,
        host: &mut Host,
        account: &str,
        market_index: u64,
        amount: Decimal,
    ) -> Result<()> {
        math::ensure_positive(amount, "complete set amount")?;
        let market = self.market(market_index)?;
        market.ensure_kind(MarketKind::Reality, "complete sets")?;
        market.ensure_open()?;
        let triple = market.shares;
        let collateral = math::add(market.collateral, amount)?;
        for share in triple.ids() {
            self.book.check_credit(share, account, amount)?;
        }
        host.ensure_can_pull(&self.token_asset, account, &self.custody, amount)?;

        host.pull(&self.token_asset, account, &self.custody, amount)?;
        credit_complete_sets(&mut self.book, &triple, account, amount)?;
        self.market_mut(market_index)?.collateral = collateral;

        info!(market_index, account, %amount, %collateral, "complete sets minted");
        host.emit(EngineEvent::CompleteSetsMinted {
            index: market_index,
            account: account.to_string(),
            amount,
        });
        Ok(())
    }

    /// Burn `amount` of each outcome share for `amount` Vision. Allowed in
    /// any state.
    pub fn redeem_complete_sets(
        &mut self,
        host: &mut Host,
        account: &str,
        market_index: u64,
        amount: Decimal,
    ) -> Result<()> {
        math::ensure_positive(amount, "complete set amount")?;
        let market = self.market(market_index)?;
        market.ensure_kind(MarketKind::Reality, "complete sets")?;
        let triple = market.shares;
        for share in triple.ids() {
            self.book.ensure_balance(share, account, amount)?;
        }
        let collateral = math::sub_nonneg(market.collateral, amount, "complete set collateral")?;
        let remaining_supply = match market.state {
            MarketState::Finalized { .. } => {
                math::sub_nonneg(market.remaining_winning_supply, amount, "remaining winning supply")?
            }
            _ => market.remaining_winning_supply,
        };
        host.ensure_custody_covers(&self.token_asset, &self.custody, amount)?;

        host.ledger
            .transfer(&self.token_asset, &self.custody, account, amount)?;
        debit_complete_sets(&mut self.book, &triple, account, amount)?;
        let market = self.market_mut(market_index)?;
        market.collateral = collateral;
        market.remaining_winning_supply = remaining_supply;

        info!(market_index, account, %amount, %collateral, "complete sets redeemed");
        host.emit(EngineEvent::CompleteSetsRedeemed {
            index: market_index,
            account: account.to_string(),
            amount,
        });
        Ok(())
    }

    // ========================================================================
    // VOTING
    // ========================================================================

    /// Lock `amount` Vision behind `outcome_id` (-1 invalid, 0 no, 1 yes).
    pub fn vote(
        &mut self,
        host: &mut Host,
        voter: &str,
        market_index: u64,
        outcome_id: i64,
        amount: Decimal,
    ) -> Result<()> {
        let outcome = parse_vote_id(outcome_id)?;
        let now = host.now();
        let market = self.market(market_index)?;
        market.ensure_kind(MarketKind::Reality, "voting")?;
        market.ensure_open()?;
        self.votes.check_record(market_index, voter, outcome, amount)?;
        let previous_leader = market.current_leader();
        let (staked, state) = market.restake(outcome, amount, now)?;
        host.ensure_can_pull(&self.token_asset, voter, &self.custody, amount)?;

        host.pull(&self.token_asset, voter, &self.custody, amount)?;
        self.votes.record(Vote {
            market_index,
            account: voter.to_string(),
            outcome,
            amount,
            cast_at: now,
        })?;
        let market = self.market_mut(market_index)?;
        market.staked = staked;
        market.state = state;

        if market.current_leader() != previous_leader {
            info!(market_index, leader = %outcome, since = now, "leader changed");
        }
        info!(market_index, voter, %outcome, %amount, "vote cast");
        host.emit(EngineEvent::VoteCast {
            index: market_index,
            account: voter.to_string(),
            outcome: outcome_id,
            amount,
        });
        Ok(())
    }

    /// Return every lock `voter` holds once voting has completed.
    pub fn withdraw_votes(&mut self, host: &mut Host, voter: &str, market_index: u64) -> Result<Decimal> {
        let market = self.market(market_index)?;
        if market.state.is_open() {
            return Err(EngineError::precondition(ERR_VOTE_NOT_COMPLETED));
        }
        let amount = self.votes.locked_total(market_index, voter)?;
        if amount.is_zero() {
            return Err(EngineError::AuthorizationViolation(format!(
                "{} has no locked votes in market {}",
                voter, market_index
            )));
        }
        host.ensure_custody_covers(&self.token_asset, &self.custody, amount)?;

        host.ledger
            .transfer(&self.token_asset, &self.custody, voter, amount)?;
        self.votes.release(market_index, voter)?;

        info!(market_index, voter, %amount, "votes withdrawn");
        host.emit(EngineEvent::VotesWithdrawn {
            index: market_index,
            account: voter.to_string(),
            amount,
        });
        Ok(amount)
    }
}

fn parse_vote_id(outcome_id: i64) -> Result<Outcome> {
    Outcome::from_vote_id(outcome_id)
        .ok_or_else(|| EngineError::precondition(format!("unknown outcome id {}", outcome_id)))
}
