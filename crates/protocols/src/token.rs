//! Token transfer and approval interface.

use crate::error::Result;
use async_trait::async_trait;
use clmm_yield_domain::Address;

/// Fungible token balances and allowances, with the acting account passed
/// explicitly.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn balance_of(&self, token: Address, account: Address) -> Result<u128>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<u128>;

    /// Sets (not adds to) the allowance of `spender` over `owner`'s tokens.
    async fn approve(&self, token: Address, owner: Address, spender: Address, amount: u128) -> Result<()>;

    async fn transfer(&self, token: Address, from: Address, to: Address, amount: u128) -> Result<()>;
}
