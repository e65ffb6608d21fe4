//! Tick range selection for single-sided deposits.
//!
//! A token0-only position sits strictly above the current tick and a
//! token1-only position strictly below it, so the deposit initially holds
//! only the supplied token.

use crate::enums::DepositSide;
use crate::error::{DomainError, Result};
use crate::math::tick_math::{bound, validate_spacing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default range width, in units of tick spacing.
pub const DEFAULT_RANGE_WIDTH_SPACINGS: u32 = 100;

/// A non-empty `[lower, upper]` tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

impl TickRange {
    /// Creates a range, rejecting `lower >= upper` as degenerate.
    pub fn new(lower: i32, upper: i32) -> Result<Self> {
        if lower >= upper {
            return Err(DomainError::DegenerateRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Whether the position would be active at `tick` (`lower <= tick < upper`).
    pub fn contains(&self, tick: i32) -> bool {
        self.lower <= tick && tick < self.upper
    }

    pub fn width(&self) -> i64 {
        i64::from(self.upper) - i64::from(self.lower)
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Computes the range for a single-sided deposit with the default width of
/// 100 tick spacings.
///
/// # Errors
///
/// - [`DomainError::InvalidTokenAmount`] unless exactly one amount is non-zero.
/// - [`DomainError::InvalidTickSpacing`] if `tick_spacing <= 0`.
/// - [`DomainError::DegenerateRange`] if bounding collapses the range.
pub fn optimal_range(amount0: u128, amount1: u128, current_tick: i32, tick_spacing: i32) -> Result<TickRange> {
    optimal_range_with_width(
        amount0,
        amount1,
        current_tick,
        tick_spacing,
        DEFAULT_RANGE_WIDTH_SPACINGS,
    )
}

/// Same as [`optimal_range`] with a configurable width in tick spacings.
pub fn optimal_range_with_width(
    amount0: u128,
    amount1: u128,
    current_tick: i32,
    tick_spacing: i32,
    width_spacings: u32,
) -> Result<TickRange> {
    let side = DepositSide::from_amounts(amount0, amount1)?;
    let spacing = i64::from(validate_spacing(tick_spacing)?);
    let base_range = spacing * i64::from(width_spacings);
    let current = i64::from(current_tick);

    let (lower, upper) = match side {
        DepositSide::Token0 => (current + spacing, current + base_range),
        DepositSide::Token1 => (current - base_range, current - spacing),
    };

    TickRange::new(bound(lower, tick_spacing)?, bound(upper, tick_spacing)?)
}
