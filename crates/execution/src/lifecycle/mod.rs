//! Position lifecycle tracking.
//!
//! Tracks the notifications emitted by the manager:
//! - Position opening and liquidity changes
//! - Fee collections and closes
//! - Consolidating swaps and surplus redeploys
//! - Custody transfers

mod events;
mod tracker;

pub use events::*;
pub use tracker::*;
