//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::ledger::ChangeSet;
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct MemoryState {
    metadata: BTreeMap<(ClassId, MetadataId), ClassMetadata>,
    managers: BTreeMap<ClassId, Address>,
    balances: BTreeMap<BalanceKey, Amount>,
    supplies: BTreeMap<(ClassId, SubId), Amount>,
    approvals: BTreeMap<(Address, Address), bool>,
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero balance entries held
    pub fn balance_entries(&self) -> LedgerResult<usize> {
        Ok(self.read()?.balances.len())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn get_class_metadata(
        &self,
        class_id: ClassId,
        metadata_id: MetadataId,
    ) -> LedgerResult<Option<ClassMetadata>> {
        Ok(self.read()?.metadata.get(&(class_id, metadata_id)).copied())
    }

    async fn list_class_metadata(&self, class_id: ClassId) -> LedgerResult<Vec<ClassMetadata>> {
        let state = self.read()?;
        Ok(state
            .metadata
            .range((class_id, MetadataId::MIN)..=(class_id, MetadataId::MAX))
            .map(|(_, record)| *record)
            .collect())
    }

    async fn get_class_manager(&self, class_id: ClassId) -> LedgerResult<Option<Address>> {
        Ok(self.read()?.managers.get(&class_id).copied())
    }

    async fn get_balance(&self, key: &BalanceKey) -> LedgerResult<Amount> {
        Ok(self.read()?.balances.get(key).copied().unwrap_or(0))
    }

    async fn get_total_supply(&self, class_id: ClassId, sub_id: SubId) -> LedgerResult<Amount> {
        Ok(self
            .read()?
            .supplies
            .get(&(class_id, sub_id))
            .copied()
            .unwrap_or(0))
    }

    async fn is_approved_for(&self, owner: &Address, operator: &Address) -> LedgerResult<bool> {
        Ok(self
            .read()?
            .approvals
            .get(&(*owner, *operator))
            .copied()
            .unwrap_or(false))
    }

    async fn commit(&mut self, changes: ChangeSet) -> LedgerResult<()> {
        let written = changes.len();
        let mut state = self.write()?;

        state.metadata.extend(changes.metadata);
        state.managers.extend(changes.managers);

        // Zero and false are the storage defaults, keep them implicit
        for (key, amount) in changes.balances {
            if amount == 0 {
                state.balances.remove(&key);
            } else {
                state.balances.insert(key, amount);
            }
        }
        for (key, amount) in changes.supplies {
            if amount == 0 {
                state.supplies.remove(&key);
            } else {
                state.supplies.insert(key, amount);
            }
        }
        for (key, approved) in changes.approvals {
            if approved {
                state.approvals.insert(key, true);
            } else {
                state.approvals.remove(&key);
            }
        }

        debug!(written, "committed change set to memory storage");
        Ok(())
    }
}
