//! Pending writes of a single invocation

use std::collections::BTreeMap;

use crate::traits::LedgerStorage;
use crate::types::*;

/// Every write produced by one invocation, keyed like the committed state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub metadata: BTreeMap<(ClassId, MetadataId), ClassMetadata>,
    pub managers: BTreeMap<ClassId, Address>,
    pub balances: BTreeMap<BalanceKey, Amount>,
    pub supplies: BTreeMap<(ClassId, SubId), Amount>,
    pub approvals: BTreeMap<(Address, Address), bool>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys written
    pub fn len(&self) -> usize {
        self.metadata.len()
            + self.managers.len()
            + self.balances.len()
            + self.supplies.len()
            + self.approvals.len()
    }
}

/// Read-through overlay over committed storage.
///
/// Reads see this invocation's own writes first. Nothing reaches storage
/// until the owner turns the overlay into a [`ChangeSet`] and commits it, so
/// dropping a `PendingState` discards the invocation.
pub struct PendingState<'a, S: LedgerStorage> {
    storage: &'a S,
    changes: ChangeSet,
    events: Vec<LedgerEvent>,
}

impl<'a, S: LedgerStorage> PendingState<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            changes: ChangeSet::default(),
            events: Vec::new(),
        }
    }

    pub async fn class_metadata(
        &self,
        class_id: ClassId,
        metadata_id: MetadataId,
    ) -> LedgerResult<Option<ClassMetadata>> {
        if let Some(record) = self.changes.metadata.get(&(class_id, metadata_id)) {
            return Ok(Some(*record));
        }
        self.storage.get_class_metadata(class_id, metadata_id).await
    }

    pub fn put_class_metadata(&mut self, record: ClassMetadata) {
        self.changes
            .metadata
            .insert((record.class_id, record.metadata_id), record);
    }

    pub async fn class_manager(&self, class_id: ClassId) -> LedgerResult<Option<Address>> {
        if let Some(manager) = self.changes.managers.get(&class_id) {
            return Ok(Some(*manager));
        }
        self.storage.get_class_manager(class_id).await
    }

    pub fn put_class_manager(&mut self, class_id: ClassId, manager: Address) {
        self.changes.managers.insert(class_id, manager);
    }

    pub async fn balance(&self, key: &BalanceKey) -> LedgerResult<Amount> {
        if let Some(amount) = self.changes.balances.get(key) {
            return Ok(*amount);
        }
        self.storage.get_balance(key).await
    }

    pub fn put_balance(&mut self, key: BalanceKey, amount: Amount) {
        self.changes.balances.insert(key, amount);
    }

    pub async fn total_supply(&self, class_id: ClassId, sub_id: SubId) -> LedgerResult<Amount> {
        if let Some(amount) = self.changes.supplies.get(&(class_id, sub_id)) {
            return Ok(*amount);
        }
        self.storage.get_total_supply(class_id, sub_id).await
    }

    pub fn put_total_supply(&mut self, class_id: ClassId, sub_id: SubId, amount: Amount) {
        self.changes.supplies.insert((class_id, sub_id), amount);
    }

    pub async fn approval(&self, owner: &Address, operator: &Address) -> LedgerResult<bool> {
        if let Some(approved) = self.changes.approvals.get(&(*owner, *operator)) {
            return Ok(*approved);
        }
        self.storage.is_approved_for(owner, operator).await
    }

    pub fn put_approval(&mut self, owner: Address, operator: Address, approved: bool) {
        self.changes.approvals.insert((owner, operator), approved);
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Finish the invocation, yielding its writes and events
    pub fn into_parts(self) -> (ChangeSet, Vec<LedgerEvent>) {
        (self.changes, self.events)
    }
}
