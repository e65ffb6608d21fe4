use thiserror::Error;

/// Errors raised by the pure domain layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("tick spacing must be a positive integer, got {0}")]
    InvalidTickSpacing(i32),

    #[error("exactly one of amount0 and amount1 must be non-zero")]
    InvalidTokenAmount,

    #[error("tick range [{lower}, {upper}] collapsed after bounding")]
    DegenerateRange { lower: i32, upper: i32 },

    #[error("invalid price: {0}")]
    InvalidPrice(&'static str),

    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("invalid pool reference: {0}")]
    InvalidPool(&'static str),
}

pub type Result<T> = std::result::Result<T, DomainError>;
