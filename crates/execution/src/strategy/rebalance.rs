//! Deploying and freeing the strategy asset.

use crate::amm::AmmClients;
use crate::config::ManagerConfig;
use crate::error::{ManagerError, Result, external};
use crate::lifecycle::{LifecycleTracker, RedeployData};
use crate::position::{
    CustodyBook, DepositRecord, IncreaseOutcome, OpenOutcome, PositionLedger, PositionOps,
    WithdrawOutcome,
};
use clmm_yield_domain::math::price_tick::quote_at_tick;
use clmm_yield_domain::{
    Address, DepositSide, DomainError, PoolReference, Position, PositionId, optimal_range_with_width,
};
use clmm_yield_protocols::scope::ScopeId;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of freeing funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeOutcome {
    /// Amount the caller asked for.
    pub requested: u128,
    /// Asset realized by the sweep, before any redeploy.
    pub realized: u128,
    /// Position opened with the surplus, if any.
    pub redeployed: Option<OpenOutcome>,
}

impl FreeOutcome {
    /// Asset left idle for the caller.
    pub fn freed(&self) -> u128 {
        self.realized.min(self.requested)
    }
}

/// Manager state captured at the start of an invocation, with the host
/// scope that holds the collaborator side.
struct Checkpoint {
    scope: ScopeId,
    ledger: PositionLedger,
    custody: CustodyBook,
}

/// Keeps the strategy asset deployed as single-sided liquidity in one pool.
///
/// Each public operation is one invocation inside a host scope. It either
/// completes or leaves the ledger, the custody book and every collaborator
/// as they were before it started.
pub struct Rebalancer {
    /// Position operations.
    ops: PositionOps,
    /// Positions opened by the manager.
    ledger: PositionLedger,
    /// Strategy asset.
    asset: Address,
    /// Pool side of the strategy asset.
    side: DepositSide,
}

impl Rebalancer {
    /// Binds a manager to the pool behind `amm` for the strategy `asset`.
    ///
    /// The pool's tokens, fee and spacing are read once here and never
    /// again.
    pub async fn new(
        amm: AmmClients,
        asset: Address,
        account: Address,
        config: ManagerConfig,
        lifecycle: Arc<LifecycleTracker>,
    ) -> Result<Self> {
        let token0 = amm.pool.token0().await.map_err(external("token0"))?;
        let token1 = amm.pool.token1().await.map_err(external("token1"))?;
        let fee = amm.pool.fee().await.map_err(external("fee"))?;
        let (_, tick_spacing) = amm
            .pool
            .current_tick_and_spacing()
            .await
            .map_err(external("slot0"))?;

        let pool = PoolReference::new(
            amm.pool.address(),
            token0,
            token1,
            tick_spacing,
            fee,
            amm.registry.address(),
            amm.router.address(),
        )?;
        let side = pool.side_of(asset).ok_or(ManagerError::AssetNotInPool(asset))?;

        info!(
            pool = %pool.pool,
            asset = %asset,
            side = ?side,
            tick_spacing,
            fee,
            "Position manager initialized"
        );

        Ok(Self {
            ops: PositionOps::new(amm, pool, account, config, lifecycle),
            ledger: PositionLedger::new(),
            asset,
            side,
        })
    }

    pub fn asset(&self) -> Address {
        self.asset
    }

    pub fn side(&self) -> DepositSide {
        self.side
    }

    pub fn account(&self) -> Address {
        self.ops.account()
    }

    pub fn pool(&self) -> &PoolReference {
        self.ops.pool()
    }

    pub fn config(&self) -> &ManagerConfig {
        self.ops.config()
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleTracker> {
        self.ops.lifecycle()
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn custody(&self) -> &CustodyBook {
        self.ops.custody()
    }

    /// Number of ledger entries, closed ones included.
    pub fn position_count(&self) -> usize {
        self.ledger.len()
    }

    /// Ledger entry at `index`, in open order.
    pub fn position_at(&self, index: usize) -> Option<&Position> {
        self.ledger.get(index)
    }

    /// Idle asset held by the manager's account.
    pub async fn idle_assets(&self) -> Result<u128> {
        self.ops.balance_of(self.asset).await
    }

    /// Opens one new single-sided position holding `amount` of the asset,
    /// with its range placed next to the current tick.
    pub async fn deploy(&mut self, amount: u128) -> Result<OpenOutcome> {
        let checkpoint = self.checkpoint().await?;
        let result = self.deploy_inner(amount).await;
        self.settle(checkpoint, result).await
    }

    /// Closes every position, consolidates the proceeds into the asset and
    /// deploys whatever exceeds `amount` again.
    pub async fn free(&mut self, amount: u128) -> Result<FreeOutcome> {
        let checkpoint = self.checkpoint().await?;
        let result = self.free_inner(amount).await;
        self.settle(checkpoint, result).await
    }

    /// Collects from every ledger entry and swaps the non-asset total into
    /// the asset in a single swap. Returns the asset realized.
    pub async fn collect_all_and_swap(&mut self) -> Result<u128> {
        let checkpoint = self.checkpoint().await?;
        let result = self.collect_all_and_swap_inner().await;
        self.settle(checkpoint, result).await
    }

    /// Idle asset plus the principal cached in the ledger, with the other
    /// token valued at the current tick price.
    pub async fn estimated_total_assets(&self) -> Result<u128> {
        let idle = self.idle_assets().await?;
        let (principal0, principal1) = self.ledger.total_amounts()?;
        let (asset_principal, other_principal) = match self.side {
            DepositSide::Token0 => (principal0, principal1),
            DepositSide::Token1 => (principal1, principal0),
        };

        let other_value = if other_principal == 0 {
            0
        } else {
            let (tick, _) = self
                .ops
                .amm()
                .pool
                .current_tick_and_spacing()
                .await
                .map_err(external("slot0"))?;
            value_in_asset(other_principal, tick, self.side)?
        };

        idle.checked_add(asset_principal)
            .and_then(|total| total.checked_add(other_value))
            .ok_or_else(|| ManagerError::from(DomainError::Overflow("total assets")))
    }

    /// Takes custody of a position `from` has transferred to the manager.
    pub async fn receive_position(&mut self, from: Address, id: PositionId) -> Result<DepositRecord> {
        let checkpoint = self.checkpoint().await?;
        let result = self.ops.receive(&self.ledger, from, id).await;
        self.settle(checkpoint, result).await
    }

    /// Returns a custodied position to its owner.
    pub async fn retrieve_position(&mut self, caller: Address, id: PositionId) -> Result<DepositRecord> {
        let checkpoint = self.checkpoint().await?;
        let result = self.ops.retrieve(caller, id).await;
        self.settle(checkpoint, result).await
    }

    /// Closes a position on behalf of its owner.
    pub async fn close_position(&mut self, caller: Address, id: PositionId) -> Result<WithdrawOutcome> {
        let checkpoint = self.checkpoint().await?;
        let result = self.ops.close(&mut self.ledger, caller, id).await;
        self.settle(checkpoint, result).await
    }

    /// Removes part of a position's liquidity on behalf of its owner.
    pub async fn decrease_position(
        &mut self,
        caller: Address,
        id: PositionId,
        liquidity: u128,
    ) -> Result<WithdrawOutcome> {
        let checkpoint = self.checkpoint().await?;
        let result = self.ops.decrease(&mut self.ledger, caller, id, liquidity).await;
        self.settle(checkpoint, result).await
    }

    /// Adds liquidity to a position on behalf of its owner.
    pub async fn increase_position(
        &mut self,
        caller: Address,
        id: PositionId,
        amount0: u128,
        amount1: u128,
    ) -> Result<IncreaseOutcome> {
        let checkpoint = self.checkpoint().await?;
        let result = self.ops.increase(&mut self.ledger, caller, id, amount0, amount1).await;
        self.settle(checkpoint, result).await
    }

    /// Collects what a position is owed on behalf of its owner.
    pub async fn collect_position(&mut self, caller: Address, id: PositionId) -> Result<(u128, u128)> {
        let checkpoint = self.checkpoint().await?;
        let result = self.ops.collect_fees(&self.ledger, caller, id).await;
        self.settle(checkpoint, result).await
    }

    async fn deploy_inner(&mut self, amount: u128) -> Result<OpenOutcome> {
        if amount == 0 {
            return Err(ManagerError::InvalidAmount);
        }

        let (tick, tick_spacing) = self
            .ops
            .amm()
            .pool
            .current_tick_and_spacing()
            .await
            .map_err(external("slot0"))?;
        let (amount0, amount1) = self.side.split(amount);
        let range = optimal_range_with_width(
            amount0,
            amount1,
            tick,
            tick_spacing,
            self.ops.config().range_width_spacings,
        )?;

        debug!(amount, tick, range = %range, "Deploying");
        let account = self.ops.account();
        let outcome = self
            .ops
            .open(&mut self.ledger, account, amount0, amount1, range.lower, range.upper)
            .await?;

        info!(
            position = %outcome.id,
            amount,
            range = %range,
            liquidity = outcome.liquidity,
            "Deployed"
        );
        Ok(outcome)
    }

    async fn free_inner(&mut self, amount: u128) -> Result<FreeOutcome> {
        if amount == 0 {
            return Err(ManagerError::InvalidAmount);
        }

        info!(requested = amount, positions = self.ledger.len(), "Freeing funds");
        let account = self.ops.account();
        for id in self.ledger.ids() {
            self.ops.close(&mut self.ledger, account, id).await?;
        }

        let realized = self.collect_all_and_swap_inner().await?;
        let redeployed = if realized > amount {
            let surplus = realized - amount;
            let outcome = self.deploy_inner(surplus).await?;
            self.ops
                .lifecycle()
                .record_redeploy(
                    outcome.id,
                    self.ops.pool().pool,
                    RedeployData {
                        requested: amount,
                        realized,
                        surplus,
                    },
                )
                .await;
            Some(outcome)
        } else {
            if realized < amount {
                warn!(requested = amount, realized, "Freed less than requested");
            }
            None
        };

        Ok(FreeOutcome {
            requested: amount,
            realized,
            redeployed,
        })
    }

    async fn collect_all_and_swap_inner(&mut self) -> Result<u128> {
        let account = self.ops.account();
        let overflow = || ManagerError::from(DomainError::Overflow("collected totals"));

        let (mut total0, mut total1) = (0u128, 0u128);
        for id in self.ledger.ids() {
            let (amount0, amount1) = self.ops.collect_fees(&self.ledger, account, id).await?;
            total0 = total0.checked_add(amount0).ok_or_else(overflow)?;
            total1 = total1.checked_add(amount1).ok_or_else(overflow)?;
        }

        let (asset_total, other_total) = match self.side {
            DepositSide::Token0 => (total0, total1),
            DepositSide::Token1 => (total1, total0),
        };
        if other_total == 0 {
            return Ok(asset_total);
        }

        let other = self.ops.pool().token(self.side.opposite());
        let min_out = self.ops.config().swap_min_out;
        let bought = self
            .ops
            .swap_exact_in(other, self.asset, other_total, min_out)
            .await?;
        asset_total.checked_add(bought).ok_or_else(overflow)
    }

    async fn checkpoint(&self) -> Result<Checkpoint> {
        let scope = self.ops.amm().scope.begin().await.map_err(external("begin"))?;
        Ok(Checkpoint {
            scope,
            ledger: self.ledger.clone(),
            custody: self.ops.custody().clone(),
        })
    }

    async fn settle<T>(&mut self, checkpoint: Checkpoint, result: Result<T>) -> Result<T> {
        let host = Arc::clone(&self.ops.amm().scope);
        match result {
            Ok(value) => {
                host.commit(checkpoint.scope).await.map_err(external("commit"))?;
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, "Invocation failed, rolling back");
                if let Err(rollback) = host.rollback(checkpoint.scope).await {
                    error!(error = %rollback, "Host rollback failed");
                }
                self.ledger = checkpoint.ledger;
                self.ops.restore_custody(checkpoint.custody);
                Err(e)
            }
        }
    }
}

/// Values `amount` of the non-asset token in units of the asset at `tick`.
fn value_in_asset(amount: u128, tick: i32, asset_side: DepositSide) -> Result<u128> {
    let overflow = || ManagerError::from(DomainError::Overflow("asset valuation"));
    let amount = Decimal::from_u128(amount).ok_or_else(overflow)?;
    // token0 is worth token1 when the asset is token1
    let zero_for_one = asset_side == DepositSide::Token1;
    let value = quote_at_tick(amount, tick, zero_for_one)?;
    value.floor().to_u128().ok_or_else(overflow)
}
