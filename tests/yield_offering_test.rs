//! Yield offering tests: four decaying pools staked with WETH, paid in Vision

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vision_monitor::{
    AssetId, EngineError, EngineEvent, Host, InMemoryLedger, ManualClock, RecordingSink, YieldDistributor,
};

const STARTER: &str = "starter";
const STAKER1: &str = "staker1";
const STAKER2: &str = "staker2";
const OFFERING: &str = "offering";

const T0: i64 = 1_600_000_000;
const DT: i64 = 5_000;
const HOUR: i64 = 3_600;

struct Setup {
    host: Host,
    clock: ManualClock,
    events: RecordingSink,
    offering: YieldDistributor,
    weth: AssetId,
    vision: AssetId,
}

fn setup() -> Setup {
    let clock = ManualClock::new(T0);
    let events = RecordingSink::new();
    let mut host = Host::new(InMemoryLedger::new(), clock.clone(), events.clone());
    let weth = AssetId::new("WETH");
    let vision = AssetId::new("VISION");

    let offering = YieldDistributor::new(
        weth.clone(),
        vision.clone(),
        OFFERING,
        [
            T0,
            T0 + 2 * DT,
            T0 + 3 * DT,
            T0 + 4 * DT,
            T0 + 5 * DT,
            T0 + 6 * DT,
            T0 + 7 * DT,
            T0 + 8 * DT,
        ],
        dec!(1000),
    )
    .unwrap();

    host.ledger.mint(&weth, STARTER, dec!(10)).unwrap();
    for staker in [STAKER1, STAKER2] {
        host.ledger.transfer(&weth, STARTER, staker, dec!(5)).unwrap();
        host.ledger.approve(&weth, staker, OFFERING, dec!(5)).unwrap();
    }
    host.ledger.mint(&vision, STARTER, dec!(100000)).unwrap();
    host.ledger.approve(&vision, STARTER, OFFERING, dec!(100000)).unwrap();

    Setup {
        host,
        clock,
        events,
        offering,
        weth,
        vision,
    }
}

#[test]
fn test_pools_decay_by_one_order_of_magnitude() {
    let s = setup();
    let pools = s.offering.pools();
    assert_eq!(pools.len(), 4);
    for pair in pools.windows(2) {
        assert!(pair[0].reward_per_second() > pair[1].reward_per_second());
        let ratio = pair[0].reward_per_second() / pair[1].reward_per_second();
        assert!((ratio - dec!(10)).abs() < dec!(0.000001));
    }
    assert_eq!(s.offering.pool(2).unwrap().schedule(), (T0 + 3 * DT, T0 + 4 * DT));
}

#[test]
fn test_balance_is_rate_times_time_times_principal() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(2)).unwrap();
    s.clock.advance(HOUR);

    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(2000));
    assert_eq!(s.offering.balance_of(&s.host, STAKER2).unwrap(), Decimal::ZERO);
    assert_eq!(s.host.ledger.balance_of(&s.weth, OFFERING), dec!(2));
}

#[test]
fn test_depositors_accrue_independently() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(1)).unwrap();
    s.offering.deposit(&mut s.host, STAKER2, 1, dec!(5)).unwrap();
    s.clock.advance(HOUR);

    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(1000));
    assert_eq!(s.offering.balance_of(&s.host, STAKER2).unwrap(), dec!(5000));
    assert_eq!(s.offering.pool(1).unwrap().total_principal(), dec!(6));
}

#[test]
fn test_withdrawn_principal_stops_earning() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(2)).unwrap();
    s.clock.advance(HOUR);

    let accrued = s.offering.withdraw(&mut s.host, STAKER1, 1, dec!(2)).unwrap();
    assert_eq!(accrued, dec!(2000));
    assert_eq!(s.host.ledger.balance_of(&s.weth, STAKER1), dec!(5));
    assert_eq!(
        s.events.last(),
        Some(EngineEvent::YieldWithdrawn {
            pool: 1,
            account: STAKER1.to_string(),
            amount: dec!(2),
            accrued: dec!(2000),
        })
    );

    s.clock.advance(HOUR);
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(2000));
}

#[test]
fn test_withdraw_more_than_principal_rejected() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(2)).unwrap();
    s.clock.advance(HOUR);

    let err = s.offering.withdraw(&mut s.host, STAKER1, 1, dec!(3)).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));
    assert_eq!(s.offering.pool(1).unwrap().principal_of(STAKER1), dec!(2));
    assert_eq!(s.host.ledger.balance_of(&s.weth, STAKER1), dec!(3));
    assert!(s.offering.withdraw(&mut s.host, STAKER2, 1, dec!(1)).is_err());
}

#[test]
fn test_accrual_capped_at_pool_end() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(1)).unwrap();
    s.clock.set(T0 + 4 * DT);

    // pool 1 ran for 2 * DT seconds
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(2777.77777777));

    let err = s.offering.deposit(&mut s.host, STAKER2, 1, dec!(1)).unwrap_err();
    assert!(matches!(err, EngineError::PreconditionViolation(_)));
}

#[test]
fn test_early_deposit_accrues_from_pool_start() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 2, dec!(1)).unwrap();
    s.clock.set(T0 + 3 * DT);
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), Decimal::ZERO);

    s.clock.advance(HOUR);
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(100));
}

#[test]
fn test_redeem_pays_vision_once() {
    let mut s = setup();
    s.offering.fund(&mut s.host, STARTER, dec!(5000)).unwrap();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(2)).unwrap();
    s.clock.advance(HOUR);

    assert_eq!(s.offering.redeem(&mut s.host, STAKER1).unwrap(), dec!(2000));
    assert_eq!(s.host.ledger.balance_of(&s.vision, STAKER1), dec!(2000));
    assert_eq!(s.offering.reward_reserve(), dec!(3000));
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), Decimal::ZERO);

    // nothing new accrued in the same second
    assert_eq!(s.offering.redeem(&mut s.host, STAKER1).unwrap(), Decimal::ZERO);
    assert_eq!(s.offering.total_redeemed(), dec!(2000));

    // principal keeps earning after a redeem
    s.clock.advance(HOUR);
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(2000));
}

#[test]
fn test_redeem_beyond_reserve_changes_nothing() {
    let mut s = setup();
    s.offering.fund(&mut s.host, STARTER, dec!(500)).unwrap();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(1)).unwrap();
    s.clock.advance(HOUR);

    let err = s.offering.redeem(&mut s.host, STAKER1).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));
    assert_eq!(s.offering.reward_reserve(), dec!(500));
    assert_eq!(s.host.ledger.balance_of(&s.vision, STAKER1), Decimal::ZERO);
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), dec!(1000));
}

#[test]
fn test_balance_sums_across_pools() {
    let mut s = setup();
    s.offering.deposit(&mut s.host, STAKER1, 1, dec!(1)).unwrap();
    s.offering.deposit(&mut s.host, STAKER1, 2, dec!(1)).unwrap();
    s.clock.set(T0 + 3 * DT + HOUR);

    // pool 1 fully elapsed (2 * DT), pool 2 one hour in
    let expected = dec!(2777.77777777) + dec!(100);
    assert_eq!(s.offering.balance_of(&s.host, STAKER1).unwrap(), expected);
}
