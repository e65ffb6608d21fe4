use clmm_yield_domain::{Address, DomainError, PositionId};
use thiserror::Error;

/// Failure reported by an AMM collaborator (registry, pool, router, token).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmmError {
    #[error("{call} reverted: {reason}")]
    Reverted { call: &'static str, reason: String },

    #[error("insufficient {token} balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Address,
        account: Address,
        needed: u128,
        available: u128,
    },

    #[error("insufficient {token} allowance from {owner} to {spender}: need {needed}, have {available}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: u128,
        available: u128,
    },

    #[error("unknown position {0}")]
    UnknownPosition(PositionId),

    #[error("{caller} is not approved for position {id}")]
    NotApproved { id: PositionId, caller: Address },

    #[error("transaction too old: deadline {deadline}, block time {now}")]
    Expired { deadline: i64, now: i64 },

    #[error(transparent)]
    Math(#[from] DomainError),
}

impl AmmError {
    pub fn reverted(call: &'static str, reason: impl Into<String>) -> Self {
        Self::Reverted {
            call,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AmmError>;
