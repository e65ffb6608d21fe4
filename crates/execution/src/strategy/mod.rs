//! Strategy execution.
//!
//! Deploys the strategy asset into single-sided positions and frees it for
//! withdrawals.

/// Caller authorization.
pub mod access;
/// Strategy entry points.
pub mod executor;
/// Deploy, free and consolidation logic.
pub mod rebalance;

pub use access::{AccessControl, AllowList, Role};
pub use executor::Strategy;
pub use rebalance::{FreeOutcome, Rebalancer};
