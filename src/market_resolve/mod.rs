// ============================================================================
// Market Resolve Module - Core Market Logic
// ============================================================================
//
// This module contains the prediction market functionality:
//   - pricing: pluggable cost curves for outcome shares
//   - markets: market lifecycle, registry, dispute-window resolution, payouts
//   - voting: vote locks for complete-set (reality) markets
//
// ============================================================================

pub mod markets;
pub mod pricing;
pub mod voting;

pub use markets::*;
pub use pricing::*;
pub use voting::*;
