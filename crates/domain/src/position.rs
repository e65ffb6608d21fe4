use crate::enums::{DepositSide, PositionStatus};
use crate::range::TickRange;
use crate::token::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle assigned by the AMM position registry (the position token id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One liquidity position as last observed by the manager.
///
/// `amount0` and `amount1` are accounting caches of the principal backing
/// the position. They are set at mint time and only refreshed when a
/// withdrawal touches the position. A position with zero liquidity is
/// closed and stays closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: Address,
    pub range: TickRange,
    pub liquidity: u128,
    pub amount0: u128,
    pub amount1: u128,
}

impl Position {
    pub fn new(
        id: PositionId,
        owner: Address,
        range: TickRange,
        liquidity: u128,
        amount0: u128,
        amount1: u128,
    ) -> Self {
        Self {
            id,
            owner,
            range,
            liquidity,
            amount0,
            amount1,
        }
    }

    pub fn status(&self) -> PositionStatus {
        if self.liquidity == 0 {
            PositionStatus::Closed
        } else {
            PositionStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == PositionStatus::Open
    }

    /// Cached principal on one side of the pair.
    pub fn amount(&self, side: DepositSide) -> u128 {
        match side {
            DepositSide::Token0 => self.amount0,
            DepositSide::Token1 => self.amount1,
        }
    }
}
