// ============================================================================
// Complete Set Minting - Vision Prediction Markets
// ============================================================================
//
// Core Mechanic:
//   1 Vision -> 1 INVALID share + 1 NO share + 1 YES share
//
// A complete set is a fully hedged position: whatever the resolution, exactly
// one of the three shares pays out one Vision. The collateral stays in the
// registry's custody until the set or the winning share is redeemed.
//
// ============================================================================

use rust_decimal::Decimal;

use super::{OutcomeBook, ShareTriple};
use crate::error::Result;
use crate::math;

/// Credit `amount` of each share in `triple` to `account`.
///
/// Caller is responsible for having taken the collateral.
pub fn credit_complete_sets(
    book: &mut OutcomeBook,
    triple: &ShareTriple,
    account: &str,
    amount: Decimal,
) -> Result<()> {
    math::ensure_positive(amount, "complete set amount")?;
    // dry-run each credit so a failure on the third share cannot leave the
    // first two applied
    for share in triple.ids() {
        book.check_credit(share, account, amount)?;
    }
    for share in triple.ids() {
        book.credit(share, account, amount)?;
    }
    Ok(())
}
