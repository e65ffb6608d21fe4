//! Caller authorization for strategy entry points.

use crate::error::{ManagerError, Result};
use clmm_yield_domain::Address;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Capability a caller may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Share accounting driver that deposits and withdraws.
    Vault,
    /// Periodic maintenance: tend and harvest.
    Keeper,
    /// Administrative control. Holds every other role implicitly.
    Management,
}

/// Decides which callers may invoke which entry points.
pub trait AccessControl: Send + Sync {
    fn has_role(&self, caller: Address, role: Role) -> bool;

    /// Fails with [`ManagerError::Unauthorized`] unless `caller` holds
    /// `role` or is management.
    fn require(&self, caller: Address, role: Role) -> Result<()> {
        if self.has_role(caller, role) || self.has_role(caller, Role::Management) {
            Ok(())
        } else {
            Err(ManagerError::Unauthorized { caller, role })
        }
    }
}

/// Explicit per-role allow list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    grants: HashMap<Role, HashSet<Address>>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `role` to `account`, builder style.
    #[must_use]
    pub fn with(mut self, role: Role, account: Address) -> Self {
        self.grant(role, account);
        self
    }

    pub fn grant(&mut self, role: Role, account: Address) {
        self.grants.entry(role).or_default().insert(account);
    }

    pub fn revoke(&mut self, role: Role, account: Address) -> bool {
        self.grants
            .get_mut(&role)
            .is_some_and(|members| members.remove(&account))
    }
}

impl AccessControl for AllowList {
    fn has_role(&self, caller: Address, role: Role) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|members| members.contains(&caller))
    }
}
