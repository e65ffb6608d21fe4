//! In-memory AMM adapter.
//!
//! Implements the registry, pool, router and token interfaces over one
//! shared state so the manager can run without a chain:
//! - Positions priced with concentrated liquidity math at the current tick
//! - Swaps executed at the current tick price, fees shared with active positions
//! - Token balances, allowances and block time
//! - One-shot failure injection per call kind
//! - Nested invocation scopes that roll the whole state back

mod state;

pub use state::{AmmCall, AmmState, FEE_DENOMINATOR, StoredPosition, pro_rata};

use crate::error::{AmmError, Result};
use crate::pool::PoolReader;
use crate::registry::{
    CollectParams, DecreaseLiquidityParams, IncreaseLiquidityParams, IncreaseLiquidityResult,
    MintParams, MintResult, PositionInfo, PositionRegistry,
};
use crate::router::{ExactInputSingleParams, SwapRouter};
use crate::scope::{InvocationScope, ScopeId};
use crate::token::TokenLedger;
use async_trait::async_trait;
use clmm_yield_domain::math::tick_math::{MAX_TICK, MIN_TICK, validate_spacing};
use clmm_yield_domain::token::address_from_u64;
use clmm_yield_domain::{Address, PoolReference, PositionId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Configuration for an in-memory pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPoolConfig {
    /// Pool token0.
    pub token0: Address,
    /// Pool token1.
    pub token1: Address,
    /// Tick spacing.
    pub tick_spacing: i32,
    /// Fee in hundredths of a basis point.
    pub fee: u32,
    /// Starting tick.
    pub initial_tick: i32,
}

impl Default for MemoryPoolConfig {
    fn default() -> Self {
        Self {
            token0: address_from_u64(0x1000),
            token1: address_from_u64(0x1001),
            tick_spacing: 60,
            fee: 0,
            initial_tick: 0,
        }
    }
}

/// A single-pool AMM living in process memory.
pub struct InMemoryAmm {
    state: Mutex<AmmState>,
    /// State saved at the start of each open scope, outermost first.
    scopes: Mutex<Vec<AmmState>>,
    pool: Address,
    registry: Address,
    router: Address,
}

impl InMemoryAmm {
    /// Creates a new in-memory AMM for one pool.
    pub fn new(config: MemoryPoolConfig) -> Result<Self> {
        validate_spacing(config.tick_spacing)?;
        if config.token0 == config.token1 {
            return Err(AmmError::reverted("createPool", "identical tokens"));
        }
        let pool = address_from_u64(0xA001);
        let registry = address_from_u64(0xA002);
        let router = address_from_u64(0xA003);
        Ok(Self {
            state: Mutex::new(AmmState::new(
                pool,
                registry,
                router,
                config.token0,
                config.token1,
                config.tick_spacing,
                config.fee,
                config.initial_tick,
            )),
            scopes: Mutex::new(Vec::new()),
            pool,
            registry,
            router,
        })
    }

    /// Pool reference for constructing a manager against this AMM.
    pub async fn reference(&self) -> Result<PoolReference> {
        let state = self.state.lock().await;
        Ok(PoolReference::new(
            self.pool,
            state.token0,
            state.token1,
            state.tick_spacing,
            state.fee,
            self.registry,
            self.router,
        )?)
    }

    /// Mints tokens out of thin air into `account`.
    pub async fn fund(&self, token: Address, account: Address, amount: u128) -> Result<()> {
        self.state.lock().await.credit(token, account, amount)
    }

    /// Moves the pool's current tick.
    pub async fn set_tick(&self, tick: i32) -> Result<()> {
        if !(MIN_TICK..=MAX_TICK).contains(&tick) {
            return Err(AmmError::reverted("setTick", "tick out of range"));
        }
        self.state.lock().await.tick = tick;
        Ok(())
    }

    /// Sets the block time used for deadline checks.
    pub async fn set_block_time(&self, timestamp: i64) {
        self.state.lock().await.block_time = timestamp;
    }

    /// Credits trading fees to a position.
    pub async fn accrue_fees(&self, id: PositionId, fee0: u128, fee1: u128) -> Result<()> {
        debug!(position = %id, fee0, fee1, "Accruing fees");
        self.state.lock().await.accrue_fees(id, fee0, fee1)
    }

    /// Makes the `nth` next call of the given kind fail.
    pub async fn fail_nth(&self, call: AmmCall, nth: usize) {
        self.state.lock().await.fail_nth(call, nth);
    }

    /// Makes the next call of the given kind fail.
    pub async fn fail_next(&self, call: AmmCall) {
        self.fail_nth(call, 1).await;
    }

    /// Number of positions ever minted.
    pub async fn position_count(&self) -> usize {
        self.state.lock().await.positions.len()
    }

    /// Snapshot of the full state, for assertions.
    pub async fn snapshot(&self) -> AmmState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl InvocationScope for InMemoryAmm {
    async fn begin(&self) -> Result<ScopeId> {
        let state = self.state.lock().await;
        let mut scopes = self.scopes.lock().await;
        scopes.push(state.clone());
        Ok(ScopeId(scopes.len() - 1))
    }

    async fn commit(&self, scope: ScopeId) -> Result<()> {
        let mut scopes = self.scopes.lock().await;
        if scope.0 >= scopes.len() {
            return Err(AmmError::reverted("commit", "unknown scope"));
        }
        scopes.truncate(scope.0);
        Ok(())
    }

    async fn rollback(&self, scope: ScopeId) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut scopes = self.scopes.lock().await;
        if scope.0 >= scopes.len() {
            return Err(AmmError::reverted("rollback", "unknown scope"));
        }
        scopes.truncate(scope.0 + 1);
        let saved = scopes
            .pop()
            .ok_or_else(|| AmmError::reverted("rollback", "unknown scope"))?;
        state.restore(saved);
        debug!(scope = scope.0, "Rolled back invocation scope");
        Ok(())
    }
}

#[async_trait]
impl PositionRegistry for InMemoryAmm {
    fn address(&self) -> Address {
        self.registry
    }

    async fn mint(&self, params: MintParams) -> Result<MintResult> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Mint)?;
        let result = state.mint(&params)?;
        debug!(
            position = %result.id,
            liquidity = result.liquidity,
            amount0 = result.amount0,
            amount1 = result.amount1,
            "Minted position"
        );
        Ok(result)
    }

    async fn increase_liquidity(&self, params: IncreaseLiquidityParams) -> Result<IncreaseLiquidityResult> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::IncreaseLiquidity)?;
        state.increase_liquidity(&params)
    }

    async fn decrease_liquidity(&self, params: DecreaseLiquidityParams) -> Result<(u128, u128)> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::DecreaseLiquidity)?;
        state.decrease_liquidity(&params)
    }

    async fn collect(&self, params: CollectParams) -> Result<(u128, u128)> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Collect)?;
        state.collect(&params)
    }

    async fn positions(&self, id: PositionId) -> Result<PositionInfo> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Positions)?;
        state.position_info(id)
    }

    async fn transfer_position(&self, id: PositionId, from: Address, to: Address) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Transfer)?;
        state.transfer_position(id, from, to)
    }
}

#[async_trait]
impl PoolReader for InMemoryAmm {
    fn address(&self) -> Address {
        self.pool
    }

    async fn current_tick_and_spacing(&self) -> Result<(i32, i32)> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::PoolState)?;
        Ok((state.tick, state.tick_spacing))
    }

    async fn token0(&self) -> Result<Address> {
        Ok(self.state.lock().await.token0)
    }

    async fn token1(&self) -> Result<Address> {
        Ok(self.state.lock().await.token1)
    }

    async fn fee(&self) -> Result<u32> {
        Ok(self.state.lock().await.fee)
    }
}

#[async_trait]
impl SwapRouter for InMemoryAmm {
    fn address(&self) -> Address {
        self.router
    }

    async fn exact_input_single(&self, params: ExactInputSingleParams) -> Result<u128> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Swap)?;
        let amount_out = state.swap(&params)?;
        debug!(
            amount_in = params.amount_in,
            amount_out,
            "Swapped exact input"
        );
        Ok(amount_out)
    }
}

#[async_trait]
impl TokenLedger for InMemoryAmm {
    async fn balance_of(&self, token: Address, account: Address) -> Result<u128> {
        Ok(self.state.lock().await.balance(token, account))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<u128> {
        Ok(self.state.lock().await.allowance(token, owner, spender))
    }

    async fn approve(&self, token: Address, owner: Address, spender: Address, amount: u128) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Approve)?;
        state.approve(token, owner, spender, amount);
        Ok(())
    }

    async fn transfer(&self, token: Address, from: Address, to: Address, amount: u128) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_failure(AmmCall::Transfer)?;
        state.transfer(token, from, to, amount)
    }
}
