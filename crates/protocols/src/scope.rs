//! Atomic invocation scope offered by the host chain.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Handle to an open scope. Scopes nest; closing one also closes every
/// scope opened after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

/// All-or-nothing execution of a group of collaborator calls.
///
/// Calls made between [`begin`](Self::begin) and the matching
/// [`commit`](Self::commit) stay provisional. [`rollback`](Self::rollback)
/// discards every effect they had on balances, allowances and positions.
#[async_trait]
pub trait InvocationScope: Send + Sync {
    async fn begin(&self) -> Result<ScopeId>;

    async fn commit(&self, scope: ScopeId) -> Result<()>;

    async fn rollback(&self, scope: ScopeId) -> Result<()>;
}
