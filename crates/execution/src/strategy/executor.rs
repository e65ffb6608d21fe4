//! Strategy entry points with caller authorization.

use crate::error::Result;
use crate::position::OpenOutcome;
use crate::strategy::access::{AccessControl, AllowList, Role};
use crate::strategy::rebalance::{FreeOutcome, Rebalancer};
use clmm_yield_domain::Address;
use tracing::{debug, info};

/// A single-asset yield strategy backed by concentrated liquidity.
///
/// Share accounting lives with the caller holding [`Role::Vault`]; this type
/// only moves the asset in and out of the pool.
pub struct Strategy<A: AccessControl = AllowList> {
    /// Position manager.
    manager: Rebalancer,
    /// Caller authorization.
    access: A,
}

impl<A: AccessControl> Strategy<A> {
    /// Creates a new strategy.
    pub fn new(manager: Rebalancer, access: A) -> Self {
        Self { manager, access }
    }

    pub fn manager(&self) -> &Rebalancer {
        &self.manager
    }

    /// Mutable manager access, for the custody entry points.
    pub fn manager_mut(&mut self) -> &mut Rebalancer {
        &mut self.manager
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    /// Deploys newly deposited asset.
    pub async fn deploy_funds(&mut self, caller: Address, amount: u128) -> Result<OpenOutcome> {
        self.access.require(caller, Role::Vault)?;
        self.manager.deploy(amount).await
    }

    /// Frees asset for a withdrawal.
    pub async fn free_funds(&mut self, caller: Address, amount: u128) -> Result<FreeOutcome> {
        self.access.require(caller, Role::Vault)?;
        self.manager.free(amount).await
    }

    /// Frees asset outside the normal withdrawal flow.
    pub async fn emergency_withdraw(&mut self, caller: Address, amount: u128) -> Result<FreeOutcome> {
        self.access.require(caller, Role::Management)?;
        info!(caller = %caller, amount, "Emergency withdraw");
        self.manager.free(amount).await
    }

    /// Whether idle asset exceeds the tend threshold.
    pub async fn tend_trigger(&self) -> Result<bool> {
        let idle = self.manager.idle_assets().await?;
        Ok(idle > self.manager.config().min_tend_amount)
    }

    /// Deploys idle asset above the configured threshold.
    pub async fn tend(&mut self, caller: Address) -> Result<Option<OpenOutcome>> {
        self.access.require(caller, Role::Keeper)?;
        let idle = self.manager.idle_assets().await?;
        if idle <= self.manager.config().min_tend_amount {
            debug!(idle, "Nothing to tend");
            return Ok(None);
        }
        self.manager.deploy(idle).await.map(Some)
    }

    /// Realizes collected fees into the asset and reports total assets.
    ///
    /// Realized asset stays idle until the next deploy or tend.
    pub async fn harvest_and_report(&mut self, caller: Address) -> Result<u128> {
        self.access.require(caller, Role::Keeper)?;
        let realized = self.manager.collect_all_and_swap().await?;
        let total = self.manager.estimated_total_assets().await?;
        info!(realized, total_assets = total, "Harvested");
        Ok(total)
    }
}
