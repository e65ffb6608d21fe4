/// Liquidity and token amount conversions.
pub mod concentrated_liquidity;
/// Tick to price conversions.
pub mod price_tick;
/// Tick bounding relative to tick spacing.
pub mod tick_math;

pub use tick_math::{MAX_TICK, MIN_TICK, bound};
