//! Positions held on behalf of external owners.

use crate::error::{ManagerError, Result};
use clmm_yield_domain::{Address, PositionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A position handed to the manager for safekeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    /// Account that transferred the position in.
    pub owner: Address,
    /// Liquidity as tracked by the manager.
    pub liquidity: u128,
}

/// Custodied positions, kept apart from the strategy ledger so sweeps never
/// touch them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustodyBook {
    deposits: HashMap<PositionId, DepositRecord>,
}

impl CustodyBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PositionId, record: DepositRecord) -> Result<()> {
        if self.deposits.contains_key(&id) {
            return Err(ManagerError::DuplicatePosition(id));
        }
        self.deposits.insert(id, record);
        Ok(())
    }

    pub fn get(&self, id: PositionId) -> Option<&DepositRecord> {
        self.deposits.get(&id)
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.deposits.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Only the recorded owner may act on a custodied position.
    pub fn ensure_owner(&self, id: PositionId, caller: Address) -> Result<&DepositRecord> {
        let record = self.deposits.get(&id).ok_or(ManagerError::UnknownPosition(id))?;
        if record.owner != caller {
            return Err(ManagerError::NotPositionOwner { id, caller });
        }
        Ok(record)
    }

    pub(crate) fn set_liquidity(&mut self, id: PositionId, liquidity: u128) -> Result<u128> {
        let record = self.deposits.get_mut(&id).ok_or(ManagerError::UnknownPosition(id))?;
        Ok(std::mem::replace(&mut record.liquidity, liquidity))
    }

    pub(crate) fn remove(&mut self, id: PositionId) -> Result<DepositRecord> {
        self.deposits.remove(&id).ok_or(ManagerError::UnknownPosition(id))
    }
}
