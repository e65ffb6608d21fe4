//! Errors raised by the position manager.

use crate::strategy::Role;
use clmm_yield_domain::{Address, DomainError, PositionId};
use clmm_yield_protocols::error::AmmError;
use thiserror::Error;

/// Every failure aborts the whole top-level invocation; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("exactly one of amount0 and amount1 must be non-zero")]
    InvalidTokenAmount,

    #[error("tick spacing must be a positive integer, got {0}")]
    InvalidTickSpacing(i32),

    #[error("tick range [{lower}, {upper}] is degenerate")]
    DegenerateRange { lower: i32, upper: i32 },

    #[error("{caller} is not the owner of position {id}")]
    NotPositionOwner { id: PositionId, caller: Address },

    #[error("external call {call} failed: {source}")]
    ExternalCallFailed {
        call: &'static str,
        #[source]
        source: AmmError,
    },

    #[error("accounting mismatch on position {id}: {detail}")]
    AccountingMismatch { id: PositionId, detail: String },

    #[error("unknown position {0}")]
    UnknownPosition(PositionId),

    #[error("position {0} is closed")]
    PositionClosed(PositionId),

    #[error("position {0} is already held")]
    DuplicatePosition(PositionId),

    #[error("position {0} belongs to a different pool")]
    PositionPairMismatch(PositionId),

    #[error("asset {0} is not a token of the pool")]
    AssetNotInPool(Address),

    #[error("{caller} lacks the {role:?} role")]
    Unauthorized { caller: Address, role: Role },

    #[error("domain error: {0}")]
    Domain(DomainError),
}

impl From<DomainError> for ManagerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTickSpacing(spacing) => Self::InvalidTickSpacing(spacing),
            DomainError::InvalidTokenAmount => Self::InvalidTokenAmount,
            DomainError::DegenerateRange { lower, upper } => Self::DegenerateRange { lower, upper },
            other => Self::Domain(other),
        }
    }
}

/// Wraps a collaborator failure, for use with `map_err`.
pub(crate) fn external(call: &'static str) -> impl FnOnce(AmmError) -> ManagerError {
    move |source| ManagerError::ExternalCallFailed { call, source }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
