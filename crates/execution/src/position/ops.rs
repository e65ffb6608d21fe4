//! Position operations against the AMM registry and router.
//!
//! Every call names its acting account explicitly. Allowances granted to
//! the registry or router cover exactly the amount of the call and are set
//! back to zero once the call returns.

use crate::amm::AmmClients;
use crate::config::ManagerConfig;
use crate::error::{ManagerError, Result, external};
use crate::lifecycle::{
    CustodyData, FeesCollectedData, LifecycleEventType, LifecycleTracker, LiquidityChangeData,
    PositionClosedData, PositionOpenedData, SwapData,
};
use crate::position::custody::{CustodyBook, DepositRecord};
use crate::position::ledger::PositionLedger;
use clmm_yield_domain::{Address, DomainError, PoolReference, Position, PositionId, TickRange};
use clmm_yield_protocols::registry::{
    CollectParams, DecreaseLiquidityParams, IncreaseLiquidityParams, MintParams,
};
use clmm_yield_protocols::router::ExactInputSingleParams;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of opening a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Registry handle of the new position.
    pub id: PositionId,
    /// Ledger index of the new entry.
    pub index: usize,
    /// Tick range of the position.
    pub range: TickRange,
    /// Liquidity minted.
    pub liquidity: u128,
    /// Token0 consumed.
    pub amount0: u128,
    /// Token1 consumed.
    pub amount1: u128,
}

/// Result of adding liquidity to an existing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreaseOutcome {
    /// Liquidity added.
    pub liquidity: u128,
    /// Token0 consumed.
    pub amount0: u128,
    /// Token1 consumed.
    pub amount1: u128,
}

/// Result of removing liquidity from a position.
///
/// The amounts are credited to the position in the registry and only move
/// once fees are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// Position the liquidity was removed from.
    pub id: PositionId,
    /// Liquidity removed.
    pub liquidity: u128,
    /// Token0 credited.
    pub amount0: u128,
    /// Token1 credited.
    pub amount1: u128,
}

impl WithdrawOutcome {
    fn empty(id: PositionId) -> Self {
        Self {
            id,
            liquidity: 0,
            amount0: 0,
            amount1: 0,
        }
    }
}

/// Opens, grows, shrinks, closes and collects positions, and swaps through
/// the router, on behalf of the manager's own account.
pub struct PositionOps {
    /// AMM collaborators.
    amm: AmmClients,
    /// Pool the manager works in.
    pool: PoolReference,
    /// Account that holds the funds and the positions.
    account: Address,
    /// Configuration.
    config: ManagerConfig,
    /// Lifecycle tracker.
    lifecycle: Arc<LifecycleTracker>,
    /// Positions held for external owners.
    custody: CustodyBook,
}

impl PositionOps {
    /// Creates position operations acting as `account`.
    pub fn new(
        amm: AmmClients,
        pool: PoolReference,
        account: Address,
        config: ManagerConfig,
        lifecycle: Arc<LifecycleTracker>,
    ) -> Self {
        Self {
            amm,
            pool,
            account,
            config,
            lifecycle,
            custody: CustodyBook::new(),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn pool(&self) -> &PoolReference {
        &self.pool
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn amm(&self) -> &AmmClients {
        &self.amm
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleTracker> {
        &self.lifecycle
    }

    pub fn custody(&self) -> &CustodyBook {
        &self.custody
    }

    pub(crate) fn restore_custody(&mut self, custody: CustodyBook) {
        self.custody = custody;
    }

    /// Balance of `token` held by the manager's account.
    pub async fn balance_of(&self, token: Address) -> Result<u128> {
        self.amm
            .tokens
            .balance_of(token, self.account)
            .await
            .map_err(external("balanceOf"))
    }

    /// Mints a position over `[tick_lower, tick_upper]` and records it in
    /// `ledger` under `caller`.
    ///
    /// Funds come from `caller`. Whatever the registry does not consume is
    /// refunded to `caller`.
    pub async fn open(
        &self,
        ledger: &mut PositionLedger,
        caller: Address,
        amount0_desired: u128,
        amount1_desired: u128,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<OpenOutcome> {
        let range = TickRange::new(tick_lower, tick_upper)?;
        if amount0_desired == 0 && amount1_desired == 0 {
            return Err(ManagerError::InvalidAmount);
        }

        self.pull_from(caller, amount0_desired, amount1_desired).await?;
        self.approve_registry(amount0_desired, amount1_desired).await?;
        let minted = self
            .amm
            .registry
            .mint(MintParams {
                token0: self.pool.token0,
                token1: self.pool.token1,
                fee: self.pool.fee,
                tick_lower,
                tick_upper,
                amount0_desired,
                amount1_desired,
                amount0_min: 0,
                amount1_min: 0,
                payer: self.account,
                recipient: self.account,
                deadline: self.config.deadline(),
            })
            .await;
        let reset = self.reset_registry(amount0_desired, amount1_desired).await;
        let minted = minted.map_err(external("mint"))?;
        reset?;

        let index = ledger.append(Position::new(
            minted.id,
            caller,
            range,
            minted.liquidity,
            minted.amount0,
            minted.amount1,
        ))?;

        let (refund0, refund1) = unconsumed(minted.id, amount0_desired, amount1_desired, minted.amount0, minted.amount1)?;
        self.refund(caller, refund0, refund1).await?;

        self.lifecycle
            .record_position_opened(
                minted.id,
                self.pool.pool,
                PositionOpenedData {
                    owner: caller,
                    tick_lower,
                    tick_upper,
                    liquidity: minted.liquidity,
                    amount0: minted.amount0,
                    amount1: minted.amount1,
                },
            )
            .await;

        Ok(OpenOutcome {
            id: minted.id,
            index,
            range,
            liquidity: minted.liquidity,
            amount0: minted.amount0,
            amount1: minted.amount1,
        })
    }

    /// Adds liquidity to an open position at its existing range.
    pub async fn increase(
        &mut self,
        ledger: &mut PositionLedger,
        caller: Address,
        id: PositionId,
        amount0_desired: u128,
        amount1_desired: u128,
    ) -> Result<IncreaseOutcome> {
        let custodied = self.custody.contains(id);
        let current = if custodied {
            self.custody.ensure_owner(id, caller)?.liquidity
        } else {
            ledger_owned(ledger, id, caller)?.liquidity
        };
        if current == 0 {
            return Err(ManagerError::PositionClosed(id));
        }
        if amount0_desired == 0 && amount1_desired == 0 {
            return Err(ManagerError::InvalidAmount);
        }

        self.pull_from(caller, amount0_desired, amount1_desired).await?;
        self.approve_registry(amount0_desired, amount1_desired).await?;
        let added = self
            .amm
            .registry
            .increase_liquidity(IncreaseLiquidityParams {
                id,
                amount0_desired,
                amount1_desired,
                amount0_min: 0,
                amount1_min: 0,
                payer: self.account,
                deadline: self.config.deadline(),
            })
            .await;
        let reset = self.reset_registry(amount0_desired, amount1_desired).await;
        let added = added.map_err(external("increaseLiquidity"))?;
        reset?;

        let new_liquidity = grown_liquidity(current, added.liquidity)?;
        if custodied {
            self.custody.set_liquidity(id, new_liquidity)?;
        } else {
            ledger.credit(id, added.liquidity, added.amount0, added.amount1)?;
        }

        let (refund0, refund1) = unconsumed(id, amount0_desired, amount1_desired, added.amount0, added.amount1)?;
        self.refund(caller, refund0, refund1).await?;

        self.lifecycle
            .record_liquidity_change(
                id,
                self.pool.pool,
                LiquidityChangeData {
                    is_increase: true,
                    liquidity_delta: added.liquidity,
                    amount0: added.amount0,
                    amount1: added.amount1,
                    new_liquidity,
                },
            )
            .await;

        Ok(IncreaseOutcome {
            liquidity: added.liquidity,
            amount0: added.amount0,
            amount1: added.amount1,
        })
    }

    /// Removes all liquidity from a position.
    ///
    /// Closing a position that is already closed is a no-op returning zero
    /// amounts. The recorded liquidity is zeroed before the registry is
    /// called.
    pub async fn close(&mut self, ledger: &mut PositionLedger, caller: Address, id: PositionId) -> Result<WithdrawOutcome> {
        if self.custody.contains(id) {
            self.custody.ensure_owner(id, caller)?;
            let liquidity = self.custody.set_liquidity(id, 0)?;
            if liquidity == 0 {
                return Ok(WithdrawOutcome::empty(id));
            }
            let (amount0, amount1) = match self.decrease_on_registry(id, liquidity).await {
                Ok(amounts) => amounts,
                Err(e) => {
                    self.custody.set_liquidity(id, liquidity)?;
                    return Err(e);
                }
            };
            self.record_closed(id, liquidity, amount0, amount1).await;
            return Ok(WithdrawOutcome {
                id,
                liquidity,
                amount0,
                amount1,
            });
        }

        ledger_owned(ledger, id, caller)?;
        let liquidity = ledger.set_liquidity(id, 0)?;
        if liquidity == 0 {
            debug!(position = %id, "Position already closed");
            return Ok(WithdrawOutcome::empty(id));
        }

        let (amount0, amount1) = match self.decrease_on_registry(id, liquidity).await {
            Ok(amounts) => amounts,
            Err(e) => {
                ledger.set_liquidity(id, liquidity)?;
                return Err(e);
            }
        };
        ledger.debit(id, amount0, amount1)?;

        self.record_closed(id, liquidity, amount0, amount1).await;
        Ok(WithdrawOutcome {
            id,
            liquidity,
            amount0,
            amount1,
        })
    }

    /// Removes part of a position's liquidity.
    ///
    /// Asking for more than the recorded liquidity is an accounting
    /// mismatch. Removing exactly the recorded liquidity closes the position.
    pub async fn decrease(
        &mut self,
        ledger: &mut PositionLedger,
        caller: Address,
        id: PositionId,
        liquidity: u128,
    ) -> Result<WithdrawOutcome> {
        if liquidity == 0 {
            return Err(ManagerError::InvalidAmount);
        }

        let custodied = self.custody.contains(id);
        let current = if custodied {
            self.custody.ensure_owner(id, caller)?.liquidity
        } else {
            ledger_owned(ledger, id, caller)?.liquidity
        };
        let Some(remaining) = current.checked_sub(liquidity) else {
            return Err(ManagerError::AccountingMismatch {
                id,
                detail: format!("decrease of {liquidity} exceeds recorded liquidity {current}"),
            });
        };

        if custodied {
            self.custody.set_liquidity(id, remaining)?;
        } else {
            ledger.set_liquidity(id, remaining)?;
        }

        let (amount0, amount1) = match self.decrease_on_registry(id, liquidity).await {
            Ok(amounts) => amounts,
            Err(e) => {
                if custodied {
                    self.custody.set_liquidity(id, current)?;
                } else {
                    ledger.set_liquidity(id, current)?;
                }
                return Err(e);
            }
        };
        if !custodied {
            ledger.debit(id, amount0, amount1)?;
        }

        if remaining == 0 {
            self.record_closed(id, liquidity, amount0, amount1).await;
        } else {
            self.lifecycle
                .record_liquidity_change(
                    id,
                    self.pool.pool,
                    LiquidityChangeData {
                        is_increase: false,
                        liquidity_delta: liquidity,
                        amount0,
                        amount1,
                        new_liquidity: remaining,
                    },
                )
                .await;
        }

        Ok(WithdrawOutcome {
            id,
            liquidity,
            amount0,
            amount1,
        })
    }

    /// Collects everything the registry owes a position, up to the
    /// configured cap, and delivers it to the position's owner.
    ///
    /// After a close this includes the withdrawn principal.
    pub async fn collect_fees(&self, ledger: &PositionLedger, caller: Address, id: PositionId) -> Result<(u128, u128)> {
        let owner = if self.custody.contains(id) {
            self.custody.ensure_owner(id, caller)?.owner
        } else {
            ledger_owned(ledger, id, caller)?.owner
        };

        let (amount0, amount1) = self
            .amm
            .registry
            .collect(CollectParams {
                id,
                caller: self.account,
                recipient: self.account,
                amount0_max: self.config.collect_max,
                amount1_max: self.config.collect_max,
            })
            .await
            .map_err(external("collect"))?;

        if owner != self.account {
            self.transfer_out(self.pool.token0, owner, amount0).await?;
            self.transfer_out(self.pool.token1, owner, amount1).await?;
        }

        self.lifecycle
            .record_fees_collected(
                id,
                self.pool.pool,
                FeesCollectedData {
                    amount0,
                    amount1,
                    recipient: owner,
                },
            )
            .await;

        Ok((amount0, amount1))
    }

    /// Sells exactly `amount_in` of `token_in` for `token_out` in the
    /// manager's pool.
    pub async fn swap_exact_in(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: u128,
        min_out: u128,
    ) -> Result<u128> {
        if amount_in == 0 {
            return Err(ManagerError::InvalidAmount);
        }
        if self.pool.side_of(token_in).is_none() {
            return Err(ManagerError::AssetNotInPool(token_in));
        }
        if self.pool.side_of(token_out).is_none() {
            return Err(ManagerError::AssetNotInPool(token_out));
        }

        let router = self.pool.router;
        self.set_allowance(token_in, router, amount_in).await?;
        let swapped = self
            .amm
            .router
            .exact_input_single(ExactInputSingleParams {
                token_in,
                token_out,
                fee: self.pool.fee,
                sender: self.account,
                recipient: self.account,
                deadline: self.config.deadline(),
                amount_in,
                amount_out_minimum: min_out,
                price_limit: None,
            })
            .await;
        let reset = self.set_allowance(token_in, router, 0).await;
        let amount_out = swapped.map_err(external("exactInputSingle"))?;
        reset?;

        self.lifecycle
            .record_swap(
                self.pool.pool,
                SwapData {
                    token_in,
                    token_out,
                    amount_in,
                    amount_out,
                },
            )
            .await;

        Ok(amount_out)
    }

    /// Takes custody of a position `from` has already transferred to the
    /// manager's account.
    pub async fn receive(&mut self, ledger: &PositionLedger, from: Address, id: PositionId) -> Result<DepositRecord> {
        let info = self
            .amm
            .registry
            .positions(id)
            .await
            .map_err(external("positions"))?;

        if info.owner != self.account {
            return Err(ManagerError::NotPositionOwner {
                id,
                caller: self.account,
            });
        }
        if info.token0 != self.pool.token0 || info.token1 != self.pool.token1 || info.fee != self.pool.fee {
            return Err(ManagerError::PositionPairMismatch(id));
        }
        if ledger.contains(id) {
            return Err(ManagerError::DuplicatePosition(id));
        }

        let record = DepositRecord {
            owner: from,
            liquidity: info.liquidity,
        };
        self.custody.insert(id, record.clone())?;

        self.lifecycle
            .record_custody(
                LifecycleEventType::PositionReceived,
                id,
                self.pool.pool,
                CustodyData {
                    owner: from,
                    liquidity: info.liquidity,
                },
            )
            .await;

        Ok(record)
    }

    /// Returns a custodied position to its owner.
    pub async fn retrieve(&mut self, caller: Address, id: PositionId) -> Result<DepositRecord> {
        self.custody.ensure_owner(id, caller)?;
        self.amm
            .registry
            .transfer_position(id, self.account, caller)
            .await
            .map_err(external("transferFrom"))?;
        let record = self.custody.remove(id)?;

        self.lifecycle
            .record_custody(
                LifecycleEventType::PositionRetrieved,
                id,
                self.pool.pool,
                CustodyData {
                    owner: record.owner,
                    liquidity: record.liquidity,
                },
            )
            .await;

        Ok(record)
    }

    async fn decrease_on_registry(&self, id: PositionId, liquidity: u128) -> Result<(u128, u128)> {
        debug!(position = %id, liquidity, "Decreasing liquidity");
        self.amm
            .registry
            .decrease_liquidity(DecreaseLiquidityParams {
                id,
                liquidity,
                amount0_min: 0,
                amount1_min: 0,
                caller: self.account,
                deadline: self.config.deadline(),
            })
            .await
            .map_err(external("decreaseLiquidity"))
    }

    async fn record_closed(&self, id: PositionId, liquidity: u128, amount0: u128, amount1: u128) {
        self.lifecycle
            .record_position_closed(
                id,
                self.pool.pool,
                PositionClosedData {
                    liquidity_removed: liquidity,
                    amount0,
                    amount1,
                },
            )
            .await;
    }

    async fn set_allowance(&self, token: Address, spender: Address, amount: u128) -> Result<()> {
        self.amm
            .tokens
            .approve(token, self.account, spender, amount)
            .await
            .map_err(external("approve"))
    }

    async fn approve_registry(&self, amount0: u128, amount1: u128) -> Result<()> {
        let registry = self.pool.registry;
        if amount0 > 0 {
            self.set_allowance(self.pool.token0, registry, amount0).await?;
        }
        if amount1 > 0 {
            self.set_allowance(self.pool.token1, registry, amount1).await?;
        }
        Ok(())
    }

    async fn reset_registry(&self, amount0: u128, amount1: u128) -> Result<()> {
        let registry = self.pool.registry;
        if amount0 > 0 {
            self.set_allowance(self.pool.token0, registry, 0).await?;
        }
        if amount1 > 0 {
            self.set_allowance(self.pool.token1, registry, 0).await?;
        }
        Ok(())
    }

    async fn transfer_out(&self, token: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.amm
            .tokens
            .transfer(token, self.account, to, amount)
            .await
            .map_err(external("transfer"))
    }

    /// Moves a caller's deposit into the manager's account.
    async fn pull_from(&self, caller: Address, amount0: u128, amount1: u128) -> Result<()> {
        if caller == self.account {
            return Ok(());
        }
        for (token, amount) in [(self.pool.token0, amount0), (self.pool.token1, amount1)] {
            if amount > 0 {
                self.amm
                    .tokens
                    .transfer(token, caller, self.account, amount)
                    .await
                    .map_err(external("transferFrom"))?;
            }
        }
        Ok(())
    }

    async fn refund(&self, caller: Address, amount0: u128, amount1: u128) -> Result<()> {
        if caller == self.account || (amount0 == 0 && amount1 == 0) {
            return Ok(());
        }
        info!(caller = %caller, amount0, amount1, "Refunding unconsumed deposit");
        self.transfer_out(self.pool.token0, caller, amount0).await?;
        self.transfer_out(self.pool.token1, caller, amount1).await
    }
}

/// Ledger entry for `id`, provided `caller` owns it.
fn ledger_owned(ledger: &PositionLedger, id: PositionId, caller: Address) -> Result<&Position> {
    let position = ledger.find(id).ok_or(ManagerError::UnknownPosition(id))?;
    if position.owner != caller {
        warn!(position = %id, caller = %caller, "Rejected call from non-owner");
        return Err(ManagerError::NotPositionOwner { id, caller });
    }
    Ok(position)
}

fn unconsumed(id: PositionId, desired0: u128, desired1: u128, used0: u128, used1: u128) -> Result<(u128, u128)> {
    match (desired0.checked_sub(used0), desired1.checked_sub(used1)) {
        (Some(rest0), Some(rest1)) => Ok((rest0, rest1)),
        _ => Err(ManagerError::AccountingMismatch {
            id,
            detail: format!("registry consumed ({used0}, {used1}) of desired ({desired0}, {desired1})"),
        }),
    }
}

fn grown_liquidity(current: u128, added: u128) -> Result<u128> {
    current
        .checked_add(added)
        .ok_or_else(|| ManagerError::from(DomainError::Overflow("position liquidity")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_yield_domain::token::address_from_u64;
    use clmm_yield_protocols::memory::{AmmCall, InMemoryAmm, MemoryPoolConfig};
    use clmm_yield_protocols::registry::PositionRegistry;
    use clmm_yield_protocols::token::TokenLedger;

    fn account() -> Address {
        address_from_u64(0xBEEF)
    }

    async fn setup() -> (Arc<InMemoryAmm>, PositionOps) {
        let amm = Arc::new(InMemoryAmm::new(MemoryPoolConfig::default()).unwrap());
        let reference = amm.reference().await.unwrap();
        let ops = PositionOps::new(
            AmmClients::from_shared(amm.clone()),
            reference,
            account(),
            ManagerConfig::default(),
            Arc::new(LifecycleTracker::new()),
        );
        (amm, ops)
    }

    async fn open_token0(amm: &InMemoryAmm, ops: &PositionOps, ledger: &mut PositionLedger, amount: u128) -> OpenOutcome {
        amm.fund(ops.pool().token0, account(), amount).await.unwrap();
        ops.open(ledger, account(), amount, 0, 60, 6000).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_records_position_and_resets_allowance() {
        let (amm, ops) = setup().await;
        let mut ledger = PositionLedger::new();

        let outcome = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;

        assert_eq!(outcome.index, 0);
        assert_eq!(outcome.amount0, 1_000_000);
        assert_eq!(outcome.amount1, 0);
        assert!(outcome.liquidity > 0);

        let entry = ledger.find(outcome.id).unwrap();
        assert_eq!(entry.owner, account());
        assert_eq!(entry.range, TickRange { lower: 60, upper: 6000 });
        assert_eq!(entry.liquidity, outcome.liquidity);

        let token0 = ops.pool().token0;
        assert_eq!(amm.allowance(token0, account(), ops.pool().registry).await.unwrap(), 0);
        assert_eq!(amm.balance_of(token0, account()).await.unwrap(), 0);
        assert_eq!(ops.lifecycle().count(LifecycleEventType::PositionOpened).await, 1);
    }

    #[tokio::test]
    async fn test_open_rejects_degenerate_range_before_any_call() {
        let (amm, ops) = setup().await;
        let mut ledger = PositionLedger::new();
        amm.fail_next(AmmCall::Approve).await;

        let err = ops.open(&mut ledger, account(), 10, 0, 600, 600).await.unwrap_err();

        assert_eq!(err, ManagerError::DegenerateRange { lower: 600, upper: 600 });
        assert!(ledger.is_empty());
        // The armed failure was never consumed.
        assert!(amm.approve(ops.pool().token0, account(), account(), 1).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_mint_resets_allowance() {
        let (amm, ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let token0 = ops.pool().token0;
        amm.fund(token0, account(), 1_000).await.unwrap();
        amm.fail_next(AmmCall::Mint).await;

        let err = ops.open(&mut ledger, account(), 1_000, 0, 60, 6000).await.unwrap_err();

        assert!(matches!(err, ManagerError::ExternalCallFailed { call: "mint", .. }));
        assert!(ledger.is_empty());
        assert_eq!(amm.allowance(token0, account(), ops.pool().registry).await.unwrap(), 0);
        assert_eq!(amm.balance_of(token0, account()).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;

        let first = ops.close(&mut ledger, account(), opened.id).await.unwrap();
        assert_eq!(first.liquidity, opened.liquidity);
        assert_eq!((first.amount0, first.amount1), (1_000_000, 0));

        let entry = ledger.find(opened.id).unwrap();
        assert_eq!(entry.liquidity, 0);
        assert_eq!((entry.amount0, entry.amount1), (0, 0));

        // A second close must not reach the registry.
        amm.fail_next(AmmCall::DecreaseLiquidity).await;
        let second = ops.close(&mut ledger, account(), opened.id).await.unwrap();
        assert_eq!((second.liquidity, second.amount0, second.amount1), (0, 0, 0));
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_close_restores_liquidity() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;
        amm.fail_next(AmmCall::DecreaseLiquidity).await;

        let err = ops.close(&mut ledger, account(), opened.id).await.unwrap_err();

        assert!(matches!(err, ManagerError::ExternalCallFailed { call: "decreaseLiquidity", .. }));
        assert_eq!(ledger.find(opened.id).unwrap().liquidity, opened.liquidity);
    }

    #[tokio::test]
    async fn test_close_by_non_owner_rejected() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;
        let stranger = address_from_u64(0xBAD);

        let err = ops.close(&mut ledger, stranger, opened.id).await.unwrap_err();

        assert_eq!(err, ManagerError::NotPositionOwner { id: opened.id, caller: stranger });
        assert!(ledger.find(opened.id).unwrap().is_open());
        assert_eq!(
            ops.close(&mut ledger, account(), PositionId(99)).await,
            Err(ManagerError::UnknownPosition(PositionId(99)))
        );
    }

    #[tokio::test]
    async fn test_decrease_partial_then_over_request() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;
        let half = opened.liquidity / 2;

        let out = ops.decrease(&mut ledger, account(), opened.id, half).await.unwrap();

        let entry = ledger.find(opened.id).unwrap().clone();
        assert_eq!(entry.liquidity, opened.liquidity - half);
        assert_eq!(entry.amount0 + out.amount0, 1_000_000);
        assert_eq!(ops.lifecycle().count(LifecycleEventType::LiquidityDecreased).await, 1);

        let err = ops
            .decrease(&mut ledger, account(), opened.id, entry.liquidity + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::AccountingMismatch { .. }));
        assert_eq!(ledger.find(opened.id).unwrap().liquidity, entry.liquidity);
    }

    #[tokio::test]
    async fn test_increase_grows_position() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;
        amm.fund(ops.pool().token0, account(), 500_000).await.unwrap();

        let added = ops.increase(&mut ledger, account(), opened.id, 500_000, 0).await.unwrap();

        let entry = ledger.find(opened.id).unwrap();
        assert_eq!(entry.liquidity, opened.liquidity + added.liquidity);
        assert_eq!(entry.amount0, 1_500_000);
        assert_eq!(
            amm.allowance(ops.pool().token0, account(), ops.pool().registry).await.unwrap(),
            0
        );

        ops.close(&mut ledger, account(), opened.id).await.unwrap();
        assert_eq!(
            ops.increase(&mut ledger, account(), opened.id, 1, 0).await,
            Err(ManagerError::PositionClosed(opened.id))
        );
    }

    #[tokio::test]
    async fn test_collect_after_close_pays_account() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000_000).await;
        amm.accrue_fees(opened.id, 250, 40).await.unwrap();

        ops.close(&mut ledger, account(), opened.id).await.unwrap();
        let collected = ops.collect_fees(&ledger, account(), opened.id).await.unwrap();

        assert_eq!(collected, (1_000_250, 40));
        assert_eq!(amm.balance_of(ops.pool().token0, account()).await.unwrap(), 1_000_250);
        assert_eq!(amm.balance_of(ops.pool().token1, account()).await.unwrap(), 40);
    }

    #[test]
    fn test_grown_liquidity_is_checked() {
        assert_eq!(grown_liquidity(5, 7).unwrap(), 12);
        assert_eq!(
            grown_liquidity(u128::MAX, 1),
            Err(ManagerError::Domain(DomainError::Overflow("position liquidity")))
        );
    }

    #[tokio::test]
    async fn test_empty_collect_still_notifies() {
        let (amm, mut ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let opened = open_token0(&amm, &ops, &mut ledger, 1_000).await;
        ops.close(&mut ledger, account(), opened.id).await.unwrap();
        ops.collect_fees(&ledger, account(), opened.id).await.unwrap();

        let collected = ops.collect_fees(&ledger, account(), opened.id).await.unwrap();

        assert_eq!(collected, (0, 0));
        assert_eq!(ops.lifecycle().count(LifecycleEventType::FeesCollected).await, 2);
    }

    #[tokio::test]
    async fn test_external_caller_refunded_unconsumed() {
        let (amm, ops) = setup().await;
        let mut ledger = PositionLedger::new();
        let alice = address_from_u64(0xA11CE);
        let (token0, token1) = (ops.pool().token0, ops.pool().token1);
        amm.fund(token0, alice, 1_000).await.unwrap();
        amm.fund(token1, alice, 5_000).await.unwrap();

        let opened = ops.open(&mut ledger, alice, 1_000, 5_000, -600, 600).await.unwrap();

        assert_eq!(ledger.find(opened.id).unwrap().owner, alice);
        assert!(opened.amount1 < 5_000);
        assert_eq!(amm.balance_of(token1, alice).await.unwrap(), 5_000 - opened.amount1);
        assert_eq!(amm.balance_of(token0, alice).await.unwrap(), 1_000 - opened.amount0);
        assert_eq!(amm.balance_of(token0, account()).await.unwrap(), 0);
        assert_eq!(amm.balance_of(token1, account()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_swap_resets_router_allowance() {
        let (amm, ops) = setup().await;
        let (token0, token1) = (ops.pool().token0, ops.pool().token1);
        amm.fund(token1, account(), 10_000).await.unwrap();
        amm.fund(token0, ops.pool().pool, 1_000_000).await.unwrap();

        let out = ops.swap_exact_in(token1, token0, 10_000, 0).await.unwrap();

        assert_eq!(out, 10_000);
        assert_eq!(amm.balance_of(token0, account()).await.unwrap(), 10_000);
        assert_eq!(amm.allowance(token1, account(), ops.pool().router).await.unwrap(), 0);
        assert_eq!(
            ops.swap_exact_in(token1, token0, 0, 0).await,
            Err(ManagerError::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_custody_round_trip() {
        let (amm, mut ops) = setup().await;
        let ledger = PositionLedger::new();
        let mut scratch = PositionLedger::new();
        let alice = address_from_u64(0xA11CE);
        let bob = address_from_u64(0xB0B);
        let (token0, registry) = (ops.pool().token0, ops.pool().registry);

        amm.fund(token0, alice, 1_000_000).await.unwrap();
        amm.approve(token0, alice, registry, 1_000_000).await.unwrap();
        let minted = amm
            .mint(MintParams {
                token0,
                token1: ops.pool().token1,
                fee: ops.pool().fee,
                tick_lower: 60,
                tick_upper: 6000,
                amount0_desired: 1_000_000,
                amount1_desired: 0,
                amount0_min: 0,
                amount1_min: 0,
                payer: alice,
                recipient: alice,
                deadline: i64::MAX,
            })
            .await
            .unwrap();

        // Not yet transferred in.
        assert!(matches!(
            ops.receive(&ledger, alice, minted.id).await,
            Err(ManagerError::NotPositionOwner { .. })
        ));

        amm.transfer_position(minted.id, alice, account()).await.unwrap();
        let record = ops.receive(&ledger, alice, minted.id).await.unwrap();
        assert_eq!(record.owner, alice);
        assert_eq!(record.liquidity, minted.liquidity);
        assert!(ledger.is_empty());

        assert_eq!(
            ops.close(&mut scratch, bob, minted.id).await,
            Err(ManagerError::NotPositionOwner { id: minted.id, caller: bob })
        );

        let closed = ops.close(&mut scratch, alice, minted.id).await.unwrap();
        assert_eq!(closed.amount0, 1_000_000);
        let collected = ops.collect_fees(&ledger, alice, minted.id).await.unwrap();
        assert_eq!(collected, (1_000_000, 0));
        assert_eq!(amm.balance_of(token0, alice).await.unwrap(), 1_000_000);
        assert_eq!(amm.balance_of(token0, account()).await.unwrap(), 0);

        assert!(ops.retrieve(bob, minted.id).await.is_err());
        ops.retrieve(alice, minted.id).await.unwrap();
        assert!(ops.custody().is_empty());
        assert_eq!(amm.positions(minted.id).await.unwrap().owner, alice);
    }
}
