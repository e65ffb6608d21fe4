//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use clmm_yield_protocols::prelude::*;
//! ```

pub use crate::error::AmmError;
pub use crate::memory::{AmmCall, InMemoryAmm, MemoryPoolConfig};
pub use crate::pool::PoolReader;
pub use crate::registry::{
    CollectParams, DecreaseLiquidityParams, IncreaseLiquidityParams, IncreaseLiquidityResult,
    MintParams, MintResult, PositionInfo, PositionRegistry,
};
pub use crate::router::{ExactInputSingleParams, SwapRouter};
pub use crate::scope::{InvocationScope, ScopeId};
pub use crate::token::TokenLedger;
