//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use clmm_yield_execution::prelude::*;
//! ```

pub use crate::amm::AmmClients;
pub use crate::config::ManagerConfig;
pub use crate::error::{ManagerError, Result};

// Lifecycle
pub use crate::lifecycle::{
    AggregateStats, CustodyData, EventData, FeesCollectedData, LifecycleEvent, LifecycleEventType,
    LifecycleTracker, LiquidityChangeData, PositionClosedData, PositionOpenedData, PositionSummary,
    RedeployData, SwapData,
};

// Positions
pub use crate::position::{
    CustodyBook, DepositRecord, IncreaseOutcome, OpenOutcome, PositionLedger, PositionOps,
    WithdrawOutcome,
};

// Strategy
pub use crate::strategy::{AccessControl, AllowList, FreeOutcome, Rebalancer, Role, Strategy};
