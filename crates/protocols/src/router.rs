//! Swap router interface.

use crate::error::Result;
use async_trait::async_trait;
use clmm_yield_domain::Address;
use rust_decimal::Decimal;

/// Parameters for an exact-input single-hop swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputSingleParams {
    /// Token sold.
    pub token_in: Address,
    /// Token bought.
    pub token_out: Address,
    /// Fee tier identifying the pool.
    pub fee: u32,
    /// Account the input is pulled from.
    pub sender: Address,
    /// Receiver of the output.
    pub recipient: Address,
    /// Unix timestamp after which the call reverts.
    pub deadline: i64,
    /// Exact amount sold.
    pub amount_in: u128,
    /// Minimum output, otherwise the swap reverts.
    pub amount_out_minimum: u128,
    /// Optional limit on the execution price (token1 per token0).
    pub price_limit: Option<Decimal>,
}

/// Router executing swaps against the pool.
#[async_trait]
pub trait SwapRouter: Send + Sync {
    /// Address that must be approved to pull the swap input.
    fn address(&self) -> Address;

    /// Returns the amount of `token_out` received.
    async fn exact_input_single(&self, params: ExactInputSingleParams) -> Result<u128>;
}
