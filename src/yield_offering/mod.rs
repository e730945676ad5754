// ============================================================================
// Yield Offering Module - Vision Incentives
// ============================================================================
//
// Four sequential stake pools with a decaying reward rate:
//
//   schedule: t1 < t2 <= t3 < t4 <= t5 < t6 <= t7 < t8
//   pool i runs over [t(2i-1), t(2i)]
//   rate_i = base_hourly_supply / 3600 / 10^(i-1)   (Vision per second per unit)
//
// Depositors stake the stake asset (WETH) into a pool and earn Vision.
// Settled yield collects in a claimable balance; `redeem` pays it out of the
// reward reserve the distributor was funded with.
//
// ============================================================================

pub mod pool;

pub use pool::*;

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::host::{AccountId, AssetId, EngineEvent, Host};
use crate::math;

pub const POOL_COUNT: usize = 4;
pub const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone)]
pub struct YieldDistributor {
    stake_asset: AssetId,
    reward_asset: AssetId,
    custody: AccountId,
    base_hourly_supply: Decimal,
    pools: Vec<Pool>,
    claimable: HashMap<AccountId, Decimal>,
    reward_reserve: Decimal,
    total_redeemed: Decimal,
}

impl YieldDistributor {
    pub fn new(
        stake_asset: AssetId,
        reward_asset: AssetId,
        custody: impl Into<AccountId>,
        schedule: [i64; 2 * POOL_COUNT],
        base_hourly_supply: Decimal,
    ) -> Result<Self> {
        if stake_asset == reward_asset {
            return Err(EngineError::Config(format!(
                "stake and reward asset must differ, both are {}",
                stake_asset
            )));
        }
        if base_hourly_supply <= Decimal::ZERO {
            return Err(EngineError::Config(format!(
                "base hourly supply must be positive, got {}",
                base_hourly_supply
            )));
        }
        if schedule.windows(2).any(|w| w[0] > w[1]) {
            return Err(EngineError::Config(format!(
                "schedule must be increasing: {:?}",
                schedule
            )));
        }

        let base_rate = math::div(base_hourly_supply, Decimal::from(SECONDS_PER_HOUR))?;
        let mut pools = Vec::with_capacity(POOL_COUNT);
        for (i, phase) in schedule.chunks_exact(2).enumerate() {
            let decay = math::pow10(i as u32)?;
            let rate = math::div(base_rate, decay)?;
            pools.push(Pool::new(i + 1, rate, phase[0], phase[1])?);
        }

        info!(
            %stake_asset,
            %reward_asset,
            %base_hourly_supply,
            start = schedule[0],
            end = schedule[2 * POOL_COUNT - 1],
            "yield offering configured"
        );
        Ok(Self {
            stake_asset,
            reward_asset,
            custody: custody.into(),
            base_hourly_supply,
            pools,
            claimable: HashMap::new(),
            reward_reserve: Decimal::ZERO,
            total_redeemed: Decimal::ZERO,
        })
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn stake_asset(&self) -> &AssetId {
        &self.stake_asset
    }

    pub fn reward_asset(&self) -> &AssetId {
        &self.reward_asset
    }

    pub fn custody(&self) -> &str {
        &self.custody
    }

    pub fn base_hourly_supply(&self) -> Decimal {
        self.base_hourly_supply
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Pools are numbered 1 to 4.
    pub fn pool(&self, id: usize) -> Result<&Pool> {
        id.checked_sub(1)
            .and_then(|i| self.pools.get(i))
            .ok_or_else(|| EngineError::NotFound(format!("pool {}", id)))
    }

    fn pool_mut(&mut self, id: usize) -> Result<&mut Pool> {
        id.checked_sub(1)
            .and_then(|i| self.pools.get_mut(i))
            .ok_or_else(|| EngineError::NotFound(format!("pool {}", id)))
    }

    /// Vision available to pay claims
    pub fn reward_reserve(&self) -> Decimal {
        self.reward_reserve
    }

    pub fn total_redeemed(&self) -> Decimal {
        self.total_redeemed
    }

    /// Settled but unredeemed yield
    pub fn claimable_of(&self, account: &str) -> Decimal {
        self.claimable.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    /// Claimable plus everything accrued across all pools up to now.
    pub fn balance_of(&self, host: &Host, account: &str) -> Result<Decimal> {
        let now = host.now();
        let mut total = self.claimable_of(account);
        for pool in &self.pools {
            total = math::add(total, pool.pending(account, now)?)?;
        }
        Ok(total)
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Move `amount` Vision from `funder` into the reward reserve.
    pub fn fund(&mut self, host: &mut Host, funder: &str, amount: Decimal) -> Result<()> {
        math::ensure_positive(amount, "funding")?;
        let reserve = math::add(self.reward_reserve, amount)?;
        host.ensure_can_pull(&self.reward_asset, funder, &self.custody, amount)?;

        host.pull(&self.reward_asset, funder, &self.custody, amount)?;
        self.reward_reserve = reserve;

        info!(funder, %amount, reserve = %reserve, "yield offering funded");
        host.emit(EngineEvent::YieldFunded {
            account: funder.to_string(),
            amount,
        });
        Ok(())
    }

    pub fn deposit(&mut self, host: &mut Host, account: &str, pool_id: usize, amount: Decimal) -> Result<()> {
        let now = host.now();
        let update = self.pool(pool_id)?.plan_deposit(account, amount, now)?;
        let claim = math::add(self.claimable_of(account), update.accrued)?;
        host.ensure_can_pull(&self.stake_asset, account, &self.custody, amount)?;

        host.pull(&self.stake_asset, account, &self.custody, amount)?;
        let accrued = update.accrued;
        self.pool_mut(pool_id)?.apply(update);
        self.claimable.insert(account.to_string(), claim);

        info!(pool = pool_id, account, %amount, %accrued, "stake deposited");
        host.emit(EngineEvent::YieldDeposited {
            pool: pool_id,
            account: account.to_string(),
            amount,
        });
        Ok(())
    }

    /// Return `amount` principal after settling what it earned.
    pub fn withdraw(&mut self, host: &mut Host, account: &str, pool_id: usize, amount: Decimal) -> Result<Decimal> {
        let now = host.now();
        let update = self.pool(pool_id)?.plan_withdraw(account, amount, now)?;
        let claim = math::add(self.claimable_of(account), update.accrued)?;
        host.ensure_custody_covers(&self.stake_asset, &self.custody, amount)?;

        host.ledger
            .transfer(&self.stake_asset, &self.custody, account, amount)?;
        let accrued = update.accrued;
        self.pool_mut(pool_id)?.apply(update);
        self.claimable.insert(account.to_string(), claim);

        info!(pool = pool_id, account, %amount, %accrued, "stake withdrawn");
        host.emit(EngineEvent::YieldWithdrawn {
            pool: pool_id,
            account: account.to_string(),
            amount,
            accrued,
        });
        Ok(accrued)
    }

    /// Pay out everything `account` has earned. Nothing owed is a no-op.
    pub fn redeem(&mut self, host: &mut Host, account: &str) -> Result<Decimal> {
        let now = host.now();
        let mut updates = Vec::with_capacity(POOL_COUNT);
        let mut owed = self.claimable_of(account);
        for pool in &self.pools {
            if let Some(update) = pool.plan_settle(account, now)? {
                owed = math::add(owed, update.accrued)?;
                updates.push((pool.id(), update));
            }
        }
        debug!(account, %owed, now, "yield settled for redeem");
        if owed.is_zero() {
            return Ok(Decimal::ZERO);
        }
        if owed > self.reward_reserve {
            return Err(EngineError::InsufficientBalance(format!(
                "reward reserve holds {}, {} is owed {}",
                self.reward_reserve, account, owed
            )));
        }
        let reserve = math::sub_nonneg(self.reward_reserve, owed, "reward reserve")?;
        let redeemed = math::add(self.total_redeemed, owed)?;
        host.ensure_custody_covers(&self.reward_asset, &self.custody, owed)?;

        host.ledger
            .transfer(&self.reward_asset, &self.custody, account, owed)?;
        for (id, update) in updates {
            self.pool_mut(id)?.apply(update);
        }
        self.claimable.remove(account);
        self.reward_reserve = reserve;
        self.total_redeemed = redeemed;

        info!(account, amount = %owed, reserve = %reserve, "yield redeemed");
        host.emit(EngineEvent::YieldRedeemed {
            account: account.to_string(),
            amount: owed,
        });
        Ok(owed)
    }
}
