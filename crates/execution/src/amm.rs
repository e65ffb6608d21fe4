//! Handles to the AMM collaborators.

use clmm_yield_protocols::pool::PoolReader;
use clmm_yield_protocols::registry::PositionRegistry;
use clmm_yield_protocols::router::SwapRouter;
use clmm_yield_protocols::scope::InvocationScope;
use clmm_yield_protocols::token::TokenLedger;
use std::sync::Arc;

/// The collaborators the manager calls out to.
#[derive(Clone)]
pub struct AmmClients {
    /// Position registry.
    pub registry: Arc<dyn PositionRegistry>,
    /// Pool state.
    pub pool: Arc<dyn PoolReader>,
    /// Swap router.
    pub router: Arc<dyn SwapRouter>,
    /// Token transfers and approvals.
    pub tokens: Arc<dyn TokenLedger>,
    /// Host transaction scope wrapping each top-level invocation.
    pub scope: Arc<dyn InvocationScope>,
}

impl AmmClients {
    /// Builds handles from one adapter implementing every interface.
    pub fn from_shared<A>(amm: Arc<A>) -> Self
    where
        A: PositionRegistry + PoolReader + SwapRouter + TokenLedger + InvocationScope + 'static,
    {
        Self {
            registry: amm.clone(),
            pool: amm.clone(),
            router: amm.clone(),
            tokens: amm.clone(),
            scope: amm,
        }
    }
}
