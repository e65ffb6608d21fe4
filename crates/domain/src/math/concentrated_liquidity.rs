//! Liquidity and token amount conversions over a tick range.
//!
//! All inputs are square-root prices as `Decimal`. Results are rounded down
//! and every intermediate step is checked, since `Decimal` arithmetic panics
//! on overflow.

use crate::error::{DomainError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

fn ordered(sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> Result<(Decimal, Decimal)> {
    if sqrt_price_a <= Decimal::ZERO || sqrt_price_b <= Decimal::ZERO {
        return Err(DomainError::InvalidPrice("sqrt price must be positive"));
    }
    Ok(if sqrt_price_a < sqrt_price_b {
        (sqrt_price_a, sqrt_price_b)
    } else {
        (sqrt_price_b, sqrt_price_a)
    })
}

fn from_u128(value: u128, what: &'static str) -> Result<Decimal> {
    Decimal::from_u128(value).ok_or(DomainError::Overflow(what))
}

fn to_u128(value: Decimal, what: &'static str) -> Result<u128> {
    value.floor().to_u128().ok_or(DomainError::Overflow(what))
}

/// Amount of token0 (x) backing `liquidity` between two prices.
/// delta_x = L * (sqrt(P_b) - sqrt(P_a)) / (sqrt(P_a) * sqrt(P_b))
pub fn get_amount0_delta(liquidity: u128, sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> Result<u128> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    let den = lower
        .checked_mul(upper)
        .ok_or(DomainError::Overflow("amount0 denominator"))?;
    let factor = (upper - lower)
        .checked_div(den)
        .ok_or(DomainError::Overflow("amount0 factor"))?;
    let amount = from_u128(liquidity, "liquidity")?
        .checked_mul(factor)
        .ok_or(DomainError::Overflow("amount0"))?;
    to_u128(amount, "amount0")
}

/// Amount of token1 (y) backing `liquidity` between two prices.
/// delta_y = L * (sqrt(P_b) - sqrt(P_a))
pub fn get_amount1_delta(liquidity: u128, sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> Result<u128> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    let amount = from_u128(liquidity, "liquidity")?
        .checked_mul(upper - lower)
        .ok_or(DomainError::Overflow("amount1"))?;
    to_u128(amount, "amount1")
}

/// Liquidity provided by `amount0` over a price range.
/// L = amount0 * sqrt(P_a) * sqrt(P_b) / (sqrt(P_b) - sqrt(P_a))
pub fn get_liquidity_for_amount0(amount0: u128, sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> Result<u128> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    let den = upper - lower;
    if den.is_zero() {
        return Err(DomainError::InvalidPrice("range too small"));
    }
    let num = from_u128(amount0, "amount0")?
        .checked_mul(lower)
        .and_then(|v| v.checked_mul(upper))
        .ok_or(DomainError::Overflow("liquidity0 numerator"))?;
    let liquidity = num
        .checked_div(den)
        .ok_or(DomainError::Overflow("liquidity0"))?;
    to_u128(liquidity, "liquidity0")
}

/// Liquidity provided by `amount1` over a price range.
/// L = amount1 / (sqrt(P_b) - sqrt(P_a))
pub fn get_liquidity_for_amount1(amount1: u128, sqrt_price_a: Decimal, sqrt_price_b: Decimal) -> Result<u128> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    let den = upper - lower;
    if den.is_zero() {
        return Err(DomainError::InvalidPrice("range too small"));
    }
    let liquidity = from_u128(amount1, "amount1")?
        .checked_div(den)
        .ok_or(DomainError::Overflow("liquidity1"))?;
    to_u128(liquidity, "liquidity1")
}

/// Maximum liquidity mintable from the given amounts at the current price.
///
/// Below the range only token0 counts, above it only token1, and inside the
/// range the smaller of the two liquidities wins.
pub fn get_liquidity_for_amounts(
    sqrt_price_current: Decimal,
    sqrt_price_lower: Decimal,
    sqrt_price_upper: Decimal,
    amount0: u128,
    amount1: u128,
) -> Result<u128> {
    let (lower, upper) = ordered(sqrt_price_lower, sqrt_price_upper)?;
    if sqrt_price_current <= lower {
        get_liquidity_for_amount0(amount0, lower, upper)
    } else if sqrt_price_current < upper {
        let l0 = get_liquidity_for_amount0(amount0, sqrt_price_current, upper)?;
        let l1 = get_liquidity_for_amount1(amount1, lower, sqrt_price_current)?;
        Ok(l0.min(l1))
    } else {
        get_liquidity_for_amount1(amount1, lower, upper)
    }
}

/// Token amounts backing `liquidity` at the current price.
pub fn get_amounts_for_liquidity(
    sqrt_price_current: Decimal,
    sqrt_price_lower: Decimal,
    sqrt_price_upper: Decimal,
    liquidity: u128,
) -> Result<(u128, u128)> {
    let (lower, upper) = ordered(sqrt_price_lower, sqrt_price_upper)?;
    if sqrt_price_current <= lower {
        Ok((get_amount0_delta(liquidity, lower, upper)?, 0))
    } else if sqrt_price_current < upper {
        Ok((
            get_amount0_delta(liquidity, sqrt_price_current, upper)?,
            get_amount1_delta(liquidity, lower, sqrt_price_current)?,
        ))
    } else {
        Ok((0, get_amount1_delta(liquidity, lower, upper)?))
    }
}
