//! Synchronous state behind [`InMemoryAmm`](super::InMemoryAmm).
//!
//! Every operation validates all preconditions before mutating anything,
//! so a failed call leaves the state untouched.

use crate::error::{AmmError, Result};
use crate::registry::{
    CollectParams, DecreaseLiquidityParams, IncreaseLiquidityParams, IncreaseLiquidityResult,
    MintParams, MintResult, PositionInfo,
};
use crate::router::ExactInputSingleParams;
use clmm_yield_domain::math::concentrated_liquidity::{
    get_amounts_for_liquidity, get_liquidity_for_amounts,
};
use clmm_yield_domain::math::price_tick::{quote_at_tick, sqrt_price_at_tick, tick_to_price};
use clmm_yield_domain::math::tick_math::{MAX_TICK, MIN_TICK};
use clmm_yield_domain::{Address, PositionId};
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Fee denominator: fees are expressed in hundredths of a basis point.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// Kinds of external call that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmmCall {
    Mint,
    IncreaseLiquidity,
    DecreaseLiquidity,
    Collect,
    Swap,
    Approve,
    Transfer,
    Positions,
    PoolState,
}

impl AmmCall {
    pub fn name(self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::IncreaseLiquidity => "increaseLiquidity",
            Self::DecreaseLiquidity => "decreaseLiquidity",
            Self::Collect => "collect",
            Self::Swap => "exactInputSingle",
            Self::Approve => "approve",
            Self::Transfer => "transfer",
            Self::Positions => "positions",
            Self::PoolState => "slot0",
        }
    }
}

/// A position as the registry stores it.
///
/// `principal0`/`principal1` hold the tokens currently backing the
/// liquidity; the pool keeps them at their minted composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPosition {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub principal0: u128,
    pub principal1: u128,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

/// Whole in-memory chain state for one pool.
#[derive(Debug, Clone)]
pub struct AmmState {
    pub pool: Address,
    pub registry: Address,
    pub router: Address,
    pub token0: Address,
    pub token1: Address,
    pub tick_spacing: i32,
    pub fee: u32,
    pub tick: i32,
    pub block_time: i64,
    pub balances: HashMap<(Address, Address), u128>,
    pub allowances: HashMap<(Address, Address, Address), u128>,
    pub positions: BTreeMap<PositionId, StoredPosition>,
    next_id: u64,
    failures: HashMap<AmmCall, usize>,
}

impl AmmState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: Address,
        registry: Address,
        router: Address,
        token0: Address,
        token1: Address,
        tick_spacing: i32,
        fee: u32,
        tick: i32,
    ) -> Self {
        Self {
            pool,
            registry,
            router,
            token0,
            token1,
            tick_spacing,
            fee,
            tick,
            block_time: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            positions: BTreeMap::new(),
            next_id: 1,
            failures: HashMap::new(),
        }
    }

    /// Arms a failure on the `nth` next call of `call` (1 = the very next).
    pub fn fail_nth(&mut self, call: AmmCall, nth: usize) {
        self.failures.insert(call, nth.max(1));
    }

    /// Counts down armed failures and trips when one reaches zero.
    pub fn check_failure(&mut self, call: AmmCall) -> Result<()> {
        if let Some(remaining) = self.failures.get_mut(&call) {
            *remaining -= 1;
            if *remaining == 0 {
                self.failures.remove(&call);
                return Err(AmmError::reverted(call.name(), "injected failure"));
            }
        }
        Ok(())
    }

    /// Rewinds to `saved`. Armed failures are test controls rather than
    /// chain state, so the current ones survive the rewind.
    pub fn restore(&mut self, saved: AmmState) {
        let failures = std::mem::take(&mut self.failures);
        *self = saved;
        self.failures = failures;
    }

    fn check_deadline(&self, deadline: i64) -> Result<()> {
        if deadline < self.block_time {
            return Err(AmmError::Expired {
                deadline,
                now: self.block_time,
            });
        }
        Ok(())
    }

    // Token book

    pub fn balance(&self, token: Address, account: Address) -> u128 {
        self.balances.get(&(token, account)).copied().unwrap_or(0)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn credit(&mut self, token: Address, account: Address, amount: u128) -> Result<()> {
        let balance = self.balances.entry((token, account)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| AmmError::reverted("transfer", "balance overflow"))?;
        Ok(())
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128) {
        if amount == 0 {
            self.allowances.remove(&(token, owner, spender));
        } else {
            self.allowances.insert((token, owner, spender), amount);
        }
    }

    fn ensure_balance(&self, token: Address, account: Address, needed: u128) -> Result<()> {
        let available = self.balance(token, account);
        if available < needed {
            return Err(AmmError::InsufficientBalance {
                token,
                account,
                needed,
                available,
            });
        }
        Ok(())
    }

    fn ensure_allowance(&self, token: Address, owner: Address, spender: Address, needed: u128) -> Result<()> {
        let available = self.allowance(token, owner, spender);
        if available < needed {
            return Err(AmmError::InsufficientAllowance {
                token,
                owner,
                spender,
                needed,
                available,
            });
        }
        Ok(())
    }

    pub fn transfer(&mut self, token: Address, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        self.ensure_balance(token, from, amount)?;
        let from_balance = self.balance(token, from);
        self.balances.insert((token, from), from_balance - amount);
        self.credit(token, to, amount)
    }

    /// Checks that `spender` may pull `amount` of `token` from `owner`.
    fn ensure_pull(&self, token: Address, owner: Address, spender: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ensure_allowance(token, owner, spender, amount)?;
        self.ensure_balance(token, owner, amount)
    }

    /// Spends allowance and moves tokens; call `ensure_pull` first.
    fn pull(&mut self, token: Address, owner: Address, spender: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let remaining = self.allowance(token, owner, spender) - amount;
        self.approve(token, owner, spender, remaining);
        self.transfer(token, owner, to, amount)
    }

    // Registry

    fn check_range(&self, tick_lower: i32, tick_upper: i32) -> Result<()> {
        if tick_lower >= tick_upper {
            return Err(AmmError::reverted("mint", "tick lower must be below tick upper"));
        }
        if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(AmmError::reverted("mint", "tick out of range"));
        }
        if tick_lower % self.tick_spacing != 0 || tick_upper % self.tick_spacing != 0 {
            return Err(AmmError::reverted("mint", "tick not aligned to spacing"));
        }
        Ok(())
    }

    /// Liquidity and consumed amounts for a deposit into `[lower, upper]`.
    ///
    /// A deposit entirely on one side of the current tick consumes exactly
    /// the desired amount of that side.
    fn quote_deposit(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        amount0_desired: u128,
        amount1_desired: u128,
    ) -> Result<(u128, u128, u128)> {
        let sqrt_current = sqrt_price_at_tick(self.tick)?;
        let sqrt_lower = sqrt_price_at_tick(tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(tick_upper)?;

        let liquidity = get_liquidity_for_amounts(
            sqrt_current,
            sqrt_lower,
            sqrt_upper,
            amount0_desired,
            amount1_desired,
        )?;
        if liquidity == 0 {
            return Err(AmmError::reverted("mint", "zero liquidity"));
        }

        let (amount0, amount1) = if self.tick <= tick_lower {
            (amount0_desired, 0)
        } else if self.tick >= tick_upper {
            (0, amount1_desired)
        } else {
            let (a0, a1) = get_amounts_for_liquidity(sqrt_current, sqrt_lower, sqrt_upper, liquidity)?;
            (a0.min(amount0_desired), a1.min(amount1_desired))
        };
        Ok((liquidity, amount0, amount1))
    }

    pub fn mint(&mut self, params: &MintParams) -> Result<MintResult> {
        self.check_deadline(params.deadline)?;
        if params.token0 != self.token0 || params.token1 != self.token1 || params.fee != self.fee {
            return Err(AmmError::reverted("mint", "unknown pool"));
        }
        self.check_range(params.tick_lower, params.tick_upper)?;

        let (liquidity, amount0, amount1) = self.quote_deposit(
            params.tick_lower,
            params.tick_upper,
            params.amount0_desired,
            params.amount1_desired,
        )?;
        if amount0 < params.amount0_min || amount1 < params.amount1_min {
            return Err(AmmError::reverted("mint", "price slippage check"));
        }

        let registry = self.registry;
        self.ensure_pull(self.token0, params.payer, registry, amount0)?;
        self.ensure_pull(self.token1, params.payer, registry, amount1)?;
        self.pull(self.token0, params.payer, registry, registry, amount0)?;
        self.pull(self.token1, params.payer, registry, registry, amount1)?;

        let id = PositionId(self.next_id);
        self.next_id += 1;
        self.positions.insert(
            id,
            StoredPosition {
                owner: params.recipient,
                tick_lower: params.tick_lower,
                tick_upper: params.tick_upper,
                liquidity,
                principal0: amount0,
                principal1: amount1,
                tokens_owed0: 0,
                tokens_owed1: 0,
            },
        );

        Ok(MintResult {
            id,
            liquidity,
            amount0,
            amount1,
        })
    }

    fn position(&self, id: PositionId) -> Result<&StoredPosition> {
        self.positions.get(&id).ok_or(AmmError::UnknownPosition(id))
    }

    fn position_mut(&mut self, id: PositionId) -> Result<&mut StoredPosition> {
        self.positions.get_mut(&id).ok_or(AmmError::UnknownPosition(id))
    }

    fn ensure_owner(&self, id: PositionId, caller: Address) -> Result<()> {
        if self.position(id)?.owner != caller {
            return Err(AmmError::NotApproved { id, caller });
        }
        Ok(())
    }

    pub fn increase_liquidity(&mut self, params: &IncreaseLiquidityParams) -> Result<IncreaseLiquidityResult> {
        self.check_deadline(params.deadline)?;
        let (tick_lower, tick_upper) = {
            let position = self.position(params.id)?;
            (position.tick_lower, position.tick_upper)
        };

        let (liquidity, amount0, amount1) = self.quote_deposit(
            tick_lower,
            tick_upper,
            params.amount0_desired,
            params.amount1_desired,
        )?;
        if amount0 < params.amount0_min || amount1 < params.amount1_min {
            return Err(AmmError::reverted("increaseLiquidity", "price slippage check"));
        }

        let registry = self.registry;
        self.ensure_pull(self.token0, params.payer, registry, amount0)?;
        self.ensure_pull(self.token1, params.payer, registry, amount1)?;
        self.pull(self.token0, params.payer, registry, registry, amount0)?;
        self.pull(self.token1, params.payer, registry, registry, amount1)?;

        let position = self.position_mut(params.id)?;
        position.liquidity += liquidity;
        position.principal0 += amount0;
        position.principal1 += amount1;

        Ok(IncreaseLiquidityResult {
            liquidity,
            amount0,
            amount1,
        })
    }

    pub fn decrease_liquidity(&mut self, params: &DecreaseLiquidityParams) -> Result<(u128, u128)> {
        self.check_deadline(params.deadline)?;
        self.ensure_owner(params.id, params.caller)?;
        let position = self.position(params.id)?;
        if params.liquidity == 0 || params.liquidity > position.liquidity {
            return Err(AmmError::reverted("decreaseLiquidity", "invalid liquidity amount"));
        }

        let amount0 = pro_rata(position.principal0, params.liquidity, position.liquidity)?;
        let amount1 = pro_rata(position.principal1, params.liquidity, position.liquidity)?;
        if amount0 < params.amount0_min || amount1 < params.amount1_min {
            return Err(AmmError::reverted("decreaseLiquidity", "price slippage check"));
        }

        let position = self.position_mut(params.id)?;
        position.liquidity -= params.liquidity;
        position.principal0 -= amount0;
        position.principal1 -= amount1;
        position.tokens_owed0 += amount0;
        position.tokens_owed1 += amount1;
        Ok((amount0, amount1))
    }

    pub fn collect(&mut self, params: &CollectParams) -> Result<(u128, u128)> {
        self.ensure_owner(params.id, params.caller)?;
        let position = self.position(params.id)?;
        let amount0 = position.tokens_owed0.min(params.amount0_max);
        let amount1 = position.tokens_owed1.min(params.amount1_max);

        self.ensure_balance(self.token0, self.registry, amount0)?;
        self.ensure_balance(self.token1, self.registry, amount1)?;
        self.transfer(self.token0, self.registry, params.recipient, amount0)?;
        self.transfer(self.token1, self.registry, params.recipient, amount1)?;

        let position = self.position_mut(params.id)?;
        position.tokens_owed0 -= amount0;
        position.tokens_owed1 -= amount1;
        Ok((amount0, amount1))
    }

    pub fn position_info(&self, id: PositionId) -> Result<PositionInfo> {
        let position = self.position(id)?;
        Ok(PositionInfo {
            id,
            owner: position.owner,
            token0: self.token0,
            token1: self.token1,
            fee: self.fee,
            tick_lower: position.tick_lower,
            tick_upper: position.tick_upper,
            liquidity: position.liquidity,
            tokens_owed0: position.tokens_owed0,
            tokens_owed1: position.tokens_owed1,
        })
    }

    pub fn transfer_position(&mut self, id: PositionId, from: Address, to: Address) -> Result<()> {
        self.ensure_owner(id, from)?;
        self.position_mut(id)?.owner = to;
        Ok(())
    }

    /// Credits trading fees to a position, minting the backing tokens into
    /// the registry.
    pub fn accrue_fees(&mut self, id: PositionId, fee0: u128, fee1: u128) -> Result<()> {
        self.position(id)?;
        let (token0, token1, registry) = (self.token0, self.token1, self.registry);
        self.credit(token0, registry, fee0)?;
        self.credit(token1, registry, fee1)?;
        let position = self.position_mut(id)?;
        position.tokens_owed0 += fee0;
        position.tokens_owed1 += fee1;
        Ok(())
    }

    // Router

    pub fn swap(&mut self, params: &ExactInputSingleParams) -> Result<u128> {
        self.check_deadline(params.deadline)?;
        let zero_for_one = if params.token_in == self.token0 && params.token_out == self.token1 {
            true
        } else if params.token_in == self.token1 && params.token_out == self.token0 {
            false
        } else {
            return Err(AmmError::reverted("exactInputSingle", "unknown pool"));
        };
        if params.fee != self.fee {
            return Err(AmmError::reverted("exactInputSingle", "unknown pool"));
        }
        if params.amount_in == 0 {
            return Err(AmmError::reverted("exactInputSingle", "zero input"));
        }

        if let Some(limit) = params.price_limit {
            let price = tick_to_price(self.tick)?;
            let breached = if zero_for_one { price < limit } else { price > limit };
            if breached {
                return Err(AmmError::reverted("exactInputSingle", "price limit"));
            }
        }

        let fee_amount = pro_rata(params.amount_in, u128::from(self.fee), u128::from(FEE_DENOMINATOR))?;
        let net_in = params.amount_in - fee_amount;
        let net_in_dec = Decimal::from_u128(net_in)
            .ok_or_else(|| AmmError::reverted("exactInputSingle", "input too large"))?;
        let gross_out = quote_at_tick(net_in_dec, self.tick, zero_for_one)
            .map_err(|_| AmmError::reverted("exactInputSingle", "output overflow"))?;
        let amount_out = gross_out
            .floor()
            .to_u128()
            .ok_or_else(|| AmmError::reverted("exactInputSingle", "output overflow"))?;
        if amount_out < params.amount_out_minimum {
            return Err(AmmError::reverted("exactInputSingle", "too little received"));
        }

        let (token_in, token_out) = (params.token_in, params.token_out);
        let (router, pool) = (self.router, self.pool);
        self.ensure_pull(token_in, params.sender, router, params.amount_in)?;
        self.ensure_balance(token_out, pool, amount_out)?;

        self.pull(token_in, params.sender, router, pool, params.amount_in)?;
        self.transfer(token_out, pool, params.recipient, amount_out)?;
        self.distribute_fee(token_in, fee_amount)?;
        Ok(amount_out)
    }

    /// Shares a swap fee among positions active at the current tick, pro
    /// rata to liquidity. Undistributed dust stays in the pool reserve.
    fn distribute_fee(&mut self, token: Address, fee_amount: u128) -> Result<()> {
        if fee_amount == 0 {
            return Ok(());
        }
        let tick = self.tick;
        let active: u128 = self
            .positions
            .values()
            .filter(|p| p.liquidity > 0 && p.tick_lower <= tick && tick < p.tick_upper)
            .map(|p| p.liquidity)
            .sum();
        if active == 0 {
            return Ok(());
        }

        let mut shares = Vec::new();
        for (id, position) in &self.positions {
            if position.liquidity > 0 && position.tick_lower <= tick && tick < position.tick_upper {
                shares.push((*id, pro_rata(fee_amount, position.liquidity, active)?));
            }
        }

        let distributed: u128 = shares.iter().map(|(_, share)| share).sum();
        let (pool, registry, is_token0) = (self.pool, self.registry, token == self.token0);
        self.transfer(token, pool, registry, distributed)?;
        for (id, share) in shares {
            let position = self.position_mut(id)?;
            if is_token0 {
                position.tokens_owed0 += share;
            } else {
                position.tokens_owed1 += share;
            }
        }
        Ok(())
    }
}

/// `value * numerator / denominator`, rounded down, in 256-bit precision.
pub fn pro_rata(value: u128, numerator: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(AmmError::reverted("math", "division by zero"));
    }
    let result = U256::from(value) * U256::from(numerator) / U256::from(denominator);
    if result > U256::from(u128::MAX) {
        return Err(AmmError::reverted("math", "overflow"));
    }
    Ok(result.as_u128())
}
