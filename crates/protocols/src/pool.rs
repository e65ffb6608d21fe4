//! Pool state interface.

use crate::error::Result;
use async_trait::async_trait;
use clmm_yield_domain::Address;

/// Read-only access to the pool's current state.
#[async_trait]
pub trait PoolReader: Send + Sync {
    fn address(&self) -> Address;

    /// Current tick and the pool's tick spacing.
    async fn current_tick_and_spacing(&self) -> Result<(i32, i32)>;

    async fn token0(&self) -> Result<Address>;

    async fn token1(&self) -> Result<Address>;

    /// Fee in hundredths of a basis point.
    async fn fee(&self) -> Result<u32>;
}
