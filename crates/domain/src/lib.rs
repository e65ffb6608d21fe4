//! Domain types and pure math for the concentrated liquidity position manager.
//!
//! This crate has no I/O and no async code:
//! - Tick bounding relative to a pool's tick spacing
//! - Optimal range selection for single-sided deposits
//! - Tick to price conversion and liquidity amount math
//! - Position, pool reference and deposit side value types

/// Common enums.
pub mod enums;
/// Domain error type.
pub mod error;
/// Tick and liquidity math.
pub mod math;
/// Pool reference.
pub mod pool;
/// Position records.
pub mod position;
/// Range selection for single-sided deposits.
pub mod range;
/// Token addresses.
pub mod token;

pub use enums::{DepositSide, PositionStatus};
pub use error::{DomainError, Result};
pub use pool::PoolReference;
pub use position::{Position, PositionId};
pub use range::{TickRange, optimal_range, optimal_range_with_width};
pub use token::Address;
