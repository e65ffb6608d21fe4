use crate::enums::DepositSide;
use crate::error::{DomainError, Result};
use crate::math::tick_math::validate_spacing;
use crate::token::Address;
use serde::{Deserialize, Serialize};

/// Immutable description of the pool a manager operates on.
///
/// Token ordering is taken from the pool at initialization and never
/// supplied by callers afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReference {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    pub tick_spacing: i32,
    /// Fee in hundredths of a basis point (3000 = 0.30%).
    pub fee: u32,
    pub registry: Address,
    pub router: Address,
}

impl PoolReference {
    pub fn new(
        pool: Address,
        token0: Address,
        token1: Address,
        tick_spacing: i32,
        fee: u32,
        registry: Address,
        router: Address,
    ) -> Result<Self> {
        if token0 == token1 {
            return Err(DomainError::InvalidPool("token0 and token1 must differ"));
        }
        validate_spacing(tick_spacing)?;
        Ok(Self {
            pool,
            token0,
            token1,
            tick_spacing,
            fee,
            registry,
            router,
        })
    }

    /// Side of the pair that `token` occupies, if it belongs to the pool.
    pub fn side_of(&self, token: Address) -> Option<DepositSide> {
        if token == self.token0 {
            Some(DepositSide::Token0)
        } else if token == self.token1 {
            Some(DepositSide::Token1)
        } else {
            None
        }
    }

    pub fn token(&self, side: DepositSide) -> Address {
        match side {
            DepositSide::Token0 => self.token0,
            DepositSide::Token1 => self.token1,
        }
    }
}
