//! Positions and the operations that move them.

/// Positions held for external owners.
pub mod custody;
/// Append-only position ledger.
pub mod ledger;
/// Registry and router operations.
pub mod ops;

pub use custody::{CustodyBook, DepositRecord};
pub use ledger::PositionLedger;
pub use ops::{IncreaseOutcome, OpenOutcome, PositionOps, WithdrawOutcome};
