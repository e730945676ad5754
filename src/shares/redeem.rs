// ============================================================================
// Share Redemption - Vision Prediction Markets
// ============================================================================
//
// Two Redemption Types:
//
// 1. COMPLETE SET REDEMPTION (anytime):
//    1 INVALID + 1 NO + 1 YES -> 1 Vision
//    The inverse of minting.
//
// 2. RESOLUTION REDEMPTION (after finalization):
//    Winning shares are burned for a slice of the market pool.
//
//    owed = balance * remaining_pool / remaining_winning_supply
//
//    Both remainders shrink after each redemption, so the last holder to
//    redeem receives exactly what is left and the sum of all payouts equals
//    the pool. Rounding only ever favours the pool.
//
// ============================================================================

use rust_decimal::Decimal;

use super::{OutcomeBook, ShareTriple};
use crate::error::{EngineError, Result};
use crate::math;

/// Burn `amount` of each share in `triple` from `account`.
///
/// Caller pays out the collateral.
pub fn debit_complete_sets(
    book: &mut OutcomeBook,
    triple: &ShareTriple,
    account: &str,
    amount: Decimal,
) -> Result<()> {
    math::ensure_positive(amount, "complete set amount")?;
    for share in triple.ids() {
        book.ensure_balance(share, account, amount)?;
    }
    for share in triple.ids() {
        book.debit(share, account, amount)?;
    }
    Ok(())
}

/// Pro-rata slice of what is left in a pool for `balance` winning shares.
pub fn pro_rata_payout(balance: Decimal, remaining_pool: Decimal, remaining_supply: Decimal) -> Result<Decimal> {
    if balance <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    if balance > remaining_supply {
        return Err(EngineError::invariant(format!(
            "winning balance {} exceeds remaining supply {}",
            balance, remaining_supply
        )));
    }
    if balance == remaining_supply {
        return Ok(remaining_pool);
    }
    let owed = math::round_down(math::div(math::mul(balance, remaining_pool)?, remaining_supply)?);
    Ok(owed.min(remaining_pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shares::{credit_complete_sets, ShareId};
    use rust_decimal_macros::dec;

    fn triple() -> ShareTriple {
        ShareTriple([ShareId(3), ShareId(4), ShareId(5)])
    }

    #[test]
    fn test_redeem_burns_one_of_each() {
        let mut book = OutcomeBook::new();
        credit_complete_sets(&mut book, &triple(), "alice", dec!(10)).unwrap();
        debit_complete_sets(&mut book, &triple(), "alice", dec!(4)).unwrap();

        for share in triple().ids() {
            assert_eq!(book.balance_of(share, "alice"), dec!(6));
        }
    }

    #[test]
    fn test_redeem_needs_every_leg() {
        let mut book = OutcomeBook::new();
        credit_complete_sets(&mut book, &triple(), "alice", dec!(10)).unwrap();
        book.debit(ShareId(5), "alice", dec!(8)).unwrap();

        let err = debit_complete_sets(&mut book, &triple(), "alice", dec!(3)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance(_)));
        assert_eq!(book.balance_of(ShareId(3), "alice"), dec!(10));
    }

    #[test]
    fn test_pro_rata_split_sums_to_pool() {
        let pool = dec!(100);
        let supply = dec!(3);

        let first = pro_rata_payout(dec!(1), pool, supply).unwrap();
        let second = pro_rata_payout(dec!(2), pool - first, supply - dec!(1)).unwrap();

        assert_eq!(first, dec!(33.33333333));
        assert_eq!(first + second, pool);
    }

    #[test]
    fn test_pro_rata_zero_balance_pays_nothing() {
        assert_eq!(pro_rata_payout(Decimal::ZERO, dec!(10), dec!(5)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_pro_rata_rejects_balance_above_supply() {
        assert!(pro_rata_payout(dec!(6), dec!(10), dec!(5)).is_err());
    }
}
