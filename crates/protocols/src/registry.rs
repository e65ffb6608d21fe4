//! Position registry interface (the NFT position manager).

use crate::error::Result;
use async_trait::async_trait;
use clmm_yield_domain::{Address, PositionId};
use serde::{Deserialize, Serialize};

/// Parameters for minting a new position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintParams {
    /// Pool token0.
    pub token0: Address,
    /// Pool token1.
    pub token1: Address,
    /// Fee tier identifying the pool.
    pub fee: u32,
    /// Lower tick bound.
    pub tick_lower: i32,
    /// Upper tick bound.
    pub tick_upper: i32,
    /// Maximum token0 to deposit.
    pub amount0_desired: u128,
    /// Maximum token1 to deposit.
    pub amount1_desired: u128,
    /// Minimum token0 that must be deposited.
    pub amount0_min: u128,
    /// Minimum token1 that must be deposited.
    pub amount1_min: u128,
    /// Account the tokens are pulled from.
    pub payer: Address,
    /// Owner of the minted position.
    pub recipient: Address,
    /// Unix timestamp after which the call reverts.
    pub deadline: i64,
}

/// Result of a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintResult {
    /// Newly assigned position id.
    pub id: PositionId,
    /// Liquidity minted.
    pub liquidity: u128,
    /// Token0 consumed.
    pub amount0: u128,
    /// Token1 consumed.
    pub amount1: u128,
}

/// Parameters for adding liquidity to an existing position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreaseLiquidityParams {
    /// Position to grow.
    pub id: PositionId,
    /// Maximum token0 to deposit.
    pub amount0_desired: u128,
    /// Maximum token1 to deposit.
    pub amount1_desired: u128,
    /// Minimum token0 that must be deposited.
    pub amount0_min: u128,
    /// Minimum token1 that must be deposited.
    pub amount1_min: u128,
    /// Account the tokens are pulled from.
    pub payer: Address,
    /// Unix timestamp after which the call reverts.
    pub deadline: i64,
}

/// Result of an increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreaseLiquidityResult {
    /// Liquidity added.
    pub liquidity: u128,
    /// Token0 consumed.
    pub amount0: u128,
    /// Token1 consumed.
    pub amount1: u128,
}

/// Parameters for removing liquidity from a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreaseLiquidityParams {
    /// Position to shrink.
    pub id: PositionId,
    /// Liquidity to remove.
    pub liquidity: u128,
    /// Minimum token0 to credit.
    pub amount0_min: u128,
    /// Minimum token1 to credit.
    pub amount1_min: u128,
    /// Account acting on the position; must own it.
    pub caller: Address,
    /// Unix timestamp after which the call reverts.
    pub deadline: i64,
}

/// Parameters for collecting owed tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectParams {
    /// Position to collect from.
    pub id: PositionId,
    /// Account acting on the position; must own it.
    pub caller: Address,
    /// Receiver of the collected tokens.
    pub recipient: Address,
    /// Cap on token0 collected.
    pub amount0_max: u128,
    /// Cap on token1 collected.
    pub amount1_max: u128,
}

/// On-registry view of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    /// Position id.
    pub id: PositionId,
    /// Current owner.
    pub owner: Address,
    /// Pool token0.
    pub token0: Address,
    /// Pool token1.
    pub token1: Address,
    /// Pool fee tier.
    pub fee: u32,
    /// Lower tick bound.
    pub tick_lower: i32,
    /// Upper tick bound.
    pub tick_upper: i32,
    /// Current liquidity.
    pub liquidity: u128,
    /// Token0 owed (fees and removed principal).
    pub tokens_owed0: u128,
    /// Token1 owed (fees and removed principal).
    pub tokens_owed1: u128,
}

/// Registry that mints and tracks liquidity positions.
#[async_trait]
pub trait PositionRegistry: Send + Sync {
    /// Address that must be approved to pull deposit tokens.
    fn address(&self) -> Address;

    async fn mint(&self, params: MintParams) -> Result<MintResult>;

    async fn increase_liquidity(&self, params: IncreaseLiquidityParams) -> Result<IncreaseLiquidityResult>;

    /// Removes liquidity and credits the released tokens as owed.
    async fn decrease_liquidity(&self, params: DecreaseLiquidityParams) -> Result<(u128, u128)>;

    /// Transfers owed tokens, up to the given caps, to the recipient.
    async fn collect(&self, params: CollectParams) -> Result<(u128, u128)>;

    async fn positions(&self, id: PositionId) -> Result<PositionInfo>;

    /// Moves ownership of a position token.
    async fn transfer_position(&self, id: PositionId, from: Address, to: Address) -> Result<()>;
}
