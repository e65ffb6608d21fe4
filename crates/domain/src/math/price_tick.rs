use crate::error::{DomainError, Result};
use crate::math::tick_math::{MAX_TICK, MIN_TICK};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

const BASE: f64 = 1.0001;

/// Returns the price of token0 in token1 at a given tick.
/// P = 1.0001 ^ tick
///
/// The price itself only fits a `Decimal` for |tick| up to about 665_000.
/// Use [`quote_at_tick`] to convert amounts anywhere in the tick domain.
pub fn tick_to_price(tick: i32) -> Result<Decimal> {
    check_tick(tick)?;
    Decimal::from_f64(BASE.powi(tick)).ok_or(DomainError::InvalidPrice("price out of range"))
}

/// Returns the square root of the price at a given tick.
/// sqrt(P) = 1.0001 ^ (tick / 2)
pub fn sqrt_price_at_tick(tick: i32) -> Result<Decimal> {
    check_tick(tick)?;
    let sqrt = BASE.powf(f64::from(tick) / 2.0);
    Decimal::from_f64(sqrt).ok_or(DomainError::InvalidPrice("sqrt price out of range"))
}

/// Converts `amount` of one pool token into the other at the price of
/// `tick`: token0 into token1 when `zero_for_one`, token1 into token0
/// otherwise.
///
/// The square root price is applied twice rather than the price once, so
/// the conversion succeeds whenever the result is representable.
///
/// # Errors
///
/// Returns [`DomainError::Overflow`] if the converted amount does not fit.
pub fn quote_at_tick(amount: Decimal, tick: i32, zero_for_one: bool) -> Result<Decimal> {
    let sqrt = sqrt_price_at_tick(tick)?;
    if sqrt.is_zero() {
        return Err(DomainError::InvalidPrice("sqrt price out of range"));
    }
    let quoted = if zero_for_one {
        amount.checked_mul(sqrt).and_then(|v| v.checked_mul(sqrt))
    } else {
        amount.checked_div(sqrt).and_then(|v| v.checked_div(sqrt))
    };
    quoted.ok_or(DomainError::Overflow("quote at tick"))
}

/// Returns the tick closest to a given price.
/// tick = log_1.0001(P)
pub fn price_to_tick(price: Decimal) -> Result<i32> {
    if price <= Decimal::ZERO {
        return Err(DomainError::InvalidPrice("price must be positive"));
    }
    let price_f64 = price
        .to_f64()
        .ok_or(DomainError::InvalidPrice("price not representable"))?;
    let tick = price_f64.log(BASE).round();
    if !tick.is_finite() || tick < f64::from(MIN_TICK) || tick > f64::from(MAX_TICK) {
        return Err(DomainError::InvalidPrice("price outside tick domain"));
    }
    Ok(tick as i32)
}

fn check_tick(tick: i32) -> Result<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(DomainError::InvalidPrice("tick outside [MIN_TICK, MAX_TICK]"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_to_price() {
        assert_eq!(tick_to_price(0).unwrap(), Decimal::ONE);

        // 1.0001^100 ~= 1.010049
        let p100 = tick_to_price(100).unwrap();
        let diff = (p100.to_f64().unwrap() - 1.01004966).abs();
        assert!(diff < 0.000001);
    }

    #[test]
    fn test_sqrt_price_squares_to_price() {
        let sqrt = sqrt_price_at_tick(2000).unwrap();
        let price = tick_to_price(2000).unwrap();
        let diff = (sqrt * sqrt - price).abs();
        assert!(diff < Decimal::new(1, 9));
    }

    #[test]
    fn test_price_to_tick() {
        assert_eq!(price_to_tick(Decimal::ONE).unwrap(), 0);
        assert_eq!(
            price_to_tick(dec!(1.01004966)).unwrap(),
            100
        );
        assert!(price_to_tick(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_quote_at_tick_matches_price() {
        assert_eq!(quote_at_tick(dec!(1000), 0, true).unwrap(), dec!(1000));

        let amount = dec!(1_000_000);
        let price = tick_to_price(2000).unwrap();
        let forward = quote_at_tick(amount, 2000, true).unwrap();
        let back = quote_at_tick(amount, 2000, false).unwrap();
        assert!((forward - amount * price).abs() < dec!(0.01));
        assert!((back - amount / price).abs() < dec!(0.01));
    }

    #[test]
    fn test_quote_at_tick_beyond_price_range() {
        assert!(tick_to_price(700_000).is_err());

        let quoted = quote_at_tick(dec!(1_000_000), 700_000, false).unwrap();
        assert_eq!(quoted.floor(), Decimal::ZERO);
        assert!(quote_at_tick(dec!(1_000_000), -700_000, true).is_ok());
        assert_eq!(
            quote_at_tick(dec!(1), 800_000, true),
            Err(DomainError::Overflow("quote at tick"))
        );
    }

    #[test]
    fn test_out_of_domain_tick_rejected() {
        assert!(tick_to_price(MAX_TICK + 1).is_err());
        assert!(sqrt_price_at_tick(MIN_TICK - 1).is_err());
    }
}
