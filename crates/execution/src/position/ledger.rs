//! Append-only record of the positions the manager opened.

use crate::error::{ManagerError, Result};
use clmm_yield_domain::{DomainError, Position, PositionId};
use std::collections::HashMap;

/// Positions indexed by insertion order.
///
/// Entries are never removed. A closed position keeps its slot with zero
/// liquidity, so indices stay stable for the life of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionLedger {
    entries: Vec<Position>,
    index: HashMap<PositionId, usize>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a position and returns its index.
    pub fn append(&mut self, position: Position) -> Result<usize> {
        if self.index.contains_key(&position.id) {
            return Err(ManagerError::DuplicatePosition(position.id));
        }
        let slot = self.entries.len();
        self.index.insert(position.id, slot);
        self.entries.push(position);
        Ok(slot)
    }

    /// Number of entries, closed ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&Position> {
        self.entries.get(index)
    }

    pub fn find(&self, id: PositionId) -> Option<&Position> {
        self.index.get(&id).map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.entries.iter()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<PositionId> {
        self.entries.iter().map(|p| p.id).collect()
    }

    pub fn open_count(&self) -> usize {
        self.entries.iter().filter(|p| p.is_open()).count()
    }

    /// Sum of the cached principal over all entries.
    pub fn total_amounts(&self) -> Result<(u128, u128)> {
        self.entries.iter().try_fold((0u128, 0u128), |(t0, t1), p| {
            let t0 = t0.checked_add(p.amount0);
            let t1 = t1.checked_add(p.amount1);
            match (t0, t1) {
                (Some(t0), Some(t1)) => Ok((t0, t1)),
                _ => Err(ManagerError::from(DomainError::Overflow("ledger totals"))),
            }
        })
    }

    fn entry_mut(&mut self, id: PositionId) -> Result<&mut Position> {
        let slot = *self.index.get(&id).ok_or(ManagerError::UnknownPosition(id))?;
        Ok(&mut self.entries[slot])
    }

    /// Sets the liquidity of `id` and returns the previous value.
    pub(crate) fn set_liquidity(&mut self, id: PositionId, liquidity: u128) -> Result<u128> {
        let entry = self.entry_mut(id)?;
        Ok(std::mem::replace(&mut entry.liquidity, liquidity))
    }

    /// Adds minted liquidity and principal to `id`.
    pub(crate) fn credit(&mut self, id: PositionId, liquidity: u128, amount0: u128, amount1: u128) -> Result<()> {
        let entry = self.entry_mut(id)?;
        let overflow = || ManagerError::from(DomainError::Overflow("position credit"));
        entry.liquidity = entry.liquidity.checked_add(liquidity).ok_or_else(overflow)?;
        entry.amount0 = entry.amount0.checked_add(amount0).ok_or_else(overflow)?;
        entry.amount1 = entry.amount1.checked_add(amount1).ok_or_else(overflow)?;
        Ok(())
    }

    /// Subtracts withdrawn principal from the cached amounts of `id`.
    ///
    /// Returning more than was recorded means the cache and the registry
    /// disagree.
    pub(crate) fn debit(&mut self, id: PositionId, amount0: u128, amount1: u128) -> Result<()> {
        let entry = self.entry_mut(id)?;
        let (Some(rest0), Some(rest1)) = (entry.amount0.checked_sub(amount0), entry.amount1.checked_sub(amount1))
        else {
            return Err(ManagerError::AccountingMismatch {
                id,
                detail: format!(
                    "returned ({amount0}, {amount1}) exceeds recorded ({}, {})",
                    entry.amount0, entry.amount1
                ),
            });
        };
        entry.amount0 = rest0;
        entry.amount1 = rest1;
        Ok(())
    }
}
