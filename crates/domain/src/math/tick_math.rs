//! Tick bounding relative to a pool's tick spacing.
//!
//! Ticks are rounded toward zero to a multiple of the spacing, matching
//! integer division semantics, then clamped into the usable tick domain.

use crate::error::{DomainError, Result};

/// Minimum tick supported by the pool (Uniswap v3 standard).
pub const MIN_TICK: i32 = -887_272;

/// Maximum tick supported by the pool (Uniswap v3 standard).
pub const MAX_TICK: i32 = 887_272;

/// Rejects zero and negative spacings.
pub fn validate_spacing(tick_spacing: i32) -> Result<i32> {
    if tick_spacing <= 0 {
        return Err(DomainError::InvalidTickSpacing(tick_spacing));
    }
    Ok(tick_spacing)
}

/// Smallest multiple of `tick_spacing` that is still `>= MIN_TICK`.
pub fn min_usable_tick(tick_spacing: i32) -> Result<i32> {
    let spacing = validate_spacing(tick_spacing)?;
    Ok((MIN_TICK / spacing) * spacing)
}

/// Largest multiple of `tick_spacing` that is still `<= MAX_TICK`.
pub fn max_usable_tick(tick_spacing: i32) -> Result<i32> {
    let spacing = validate_spacing(tick_spacing)?;
    Ok((MAX_TICK / spacing) * spacing)
}

/// Rounds `tick` toward zero to a multiple of `tick_spacing` and clamps it
/// into `[MIN_TICK, MAX_TICK]`.
///
/// The input is taken as `i64` so callers can offset a tick by a multiple of
/// the spacing without overflowing before the clamp. The clamp targets the
/// usable bounds, so the result is always a multiple of the spacing.
///
/// # Errors
///
/// Returns [`DomainError::InvalidTickSpacing`] if `tick_spacing <= 0`.
pub fn bound(tick: i64, tick_spacing: i32) -> Result<i32> {
    let lower = i64::from(min_usable_tick(tick_spacing)?);
    let upper = i64::from(max_usable_tick(tick_spacing)?);
    let spacing = i64::from(tick_spacing);

    // i64 division truncates toward zero, which is the required rounding.
    let rounded = (tick / spacing) * spacing;
    let clamped = rounded.clamp(lower, upper);

    i32::try_from(clamped).map_err(|_| DomainError::Overflow("bounded tick exceeds i32"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bound_truncates_toward_zero() {
        assert_eq!(bound(1060, 60).unwrap(), 1020);
        assert_eq!(bound(7000, 60).unwrap(), 6960);
        // Floor division would give -120 and -60 here.
        assert_eq!(bound(-61, 60).unwrap(), -60);
        assert_eq!(bound(-59, 60).unwrap(), 0);
        assert_eq!(bound(-5000, 60).unwrap(), -4980);
    }

    #[test]
    fn test_bound_clamps_to_usable_ticks() {
        assert_eq!(bound(i64::from(MAX_TICK) + 10_000, 60).unwrap(), 887_220);
        assert_eq!(bound(i64::from(MIN_TICK) - 10_000, 60).unwrap(), -887_220);
        assert_eq!(bound(i64::from(MAX_TICK), 1).unwrap(), MAX_TICK);
        assert_eq!(bound(i64::from(MIN_TICK), 1).unwrap(), MIN_TICK);
    }

    #[test]
    fn test_bound_rejects_non_positive_spacing() {
        assert_eq!(bound(100, 0), Err(DomainError::InvalidTickSpacing(0)));
        assert_eq!(bound(100, -10), Err(DomainError::InvalidTickSpacing(-10)));
    }

    #[test]
    fn test_spacing_wider_than_domain_collapses_to_zero() {
        assert_eq!(bound(500_000, 1_000_000).unwrap(), 0);
        assert_eq!(bound(-500_000, 1_000_000).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_bound_is_aligned_and_in_domain(
            tick in -2_000_000i64..2_000_000i64,
            spacing in 1i32..20_000i32,
        ) {
            let bounded = bound(tick, spacing).unwrap();
            prop_assert_eq!(bounded % spacing, 0);
            prop_assert!((MIN_TICK..=MAX_TICK).contains(&bounded));
        }

        #[test]
        fn prop_bound_never_moves_away_from_zero(
            tick in i64::from(MIN_TICK)..=i64::from(MAX_TICK),
            spacing in 1i32..20_000i32,
        ) {
            let bounded = i64::from(bound(tick, spacing).unwrap());
            prop_assert!(bounded.abs() <= tick.abs());
        }
    }
}
