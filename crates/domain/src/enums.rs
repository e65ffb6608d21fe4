use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Which pool token a single-sided deposit supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositSide {
    Token0,
    Token1,
}

impl DepositSide {
    /// Derives the side from a pair of desired amounts.
    ///
    /// Exactly one amount must be non-zero.
    pub fn from_amounts(amount0: u128, amount1: u128) -> Result<Self> {
        match (amount0 > 0, amount1 > 0) {
            (true, false) => Ok(Self::Token0),
            (false, true) => Ok(Self::Token1),
            _ => Err(DomainError::InvalidTokenAmount),
        }
    }

    /// Splits `amount` into `(amount0, amount1)` with the other side zero.
    pub fn split(self, amount: u128) -> (u128, u128) {
        match self {
            Self::Token0 => (amount, 0),
            Self::Token1 => (0, amount),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Token0 => Self::Token1,
            Self::Token1 => Self::Token0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_amounts() {
        assert_eq!(DepositSide::from_amounts(10, 0), Ok(DepositSide::Token0));
        assert_eq!(DepositSide::from_amounts(0, 10), Ok(DepositSide::Token1));
        assert_eq!(
            DepositSide::from_amounts(0, 0),
            Err(DomainError::InvalidTokenAmount)
        );
        assert_eq!(
            DepositSide::from_amounts(5, 5),
            Err(DomainError::InvalidTokenAmount)
        );
    }

    #[test]
    fn test_split_puts_amount_on_one_side() {
        assert_eq!(DepositSide::Token0.split(7), (7, 0));
        assert_eq!(DepositSide::Token1.split(7), (0, 7));
        assert_eq!(DepositSide::Token1.opposite(), DepositSide::Token0);
    }
}
