//! AMM collaborator interfaces and adapters.
//!
//! The manager talks to the outside world only through the traits in this
//! crate:
//! - [`PositionRegistry`](registry::PositionRegistry) mints and tracks positions
//! - [`PoolReader`](pool::PoolReader) exposes the current tick and token pair
//! - [`SwapRouter`](router::SwapRouter) executes single-hop swaps
//! - [`TokenLedger`](token::TokenLedger) moves and approves tokens
//! - [`InvocationScope`](scope::InvocationScope) makes a group of calls atomic
//!
//! [`memory::InMemoryAmm`] implements all of them for tests and dry runs.

/// Prelude module for convenient imports.
pub mod prelude;

/// Error type shared by all collaborators.
pub mod error;
/// In-memory AMM adapter.
pub mod memory;
/// Pool state interface.
pub mod pool;
/// Position registry interface.
pub mod registry;
/// Swap router interface.
pub mod router;
/// Atomic invocation scope.
pub mod scope;
/// Token interface.
pub mod token;
