//! Position management for a single-asset concentrated liquidity strategy.
//!
//! This crate drives the AMM collaborators defined in the protocols crate:
//! - Position ledger and custody book
//! - Open, grow, shrink, close and collect with exact allowances
//! - Deploy and free logic with surplus redeploy
//! - Strategy entry points behind access control
//! - Position lifecycle tracking

/// Prelude module for convenient imports.
pub mod prelude;

/// AMM collaborator handles.
pub mod amm;
/// Manager configuration.
pub mod config;
/// Error types.
pub mod error;
/// Position lifecycle tracking.
pub mod lifecycle;
/// Positions and position operations.
pub mod position;
/// Strategy execution.
pub mod strategy;
