//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use tracing::warn;

use crate::ledger::ChangeSet;
use crate::types::*;

/// Storage abstraction for the ledger system
///
/// Reads see only committed state. All writes of one invocation arrive in a
/// single [`ChangeSet`] through [`LedgerStorage::commit`], which must apply
/// every entry or none of them.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Get the metadata record stored in a slot
    async fn get_class_metadata(
        &self,
        class_id: ClassId,
        metadata_id: MetadataId,
    ) -> LedgerResult<Option<ClassMetadata>>;

    /// List every written metadata slot of a class, ordered by slot id
    async fn list_class_metadata(&self, class_id: ClassId) -> LedgerResult<Vec<ClassMetadata>>;

    /// Get the manager of a class, if the class has been claimed
    async fn get_class_manager(&self, class_id: ClassId) -> LedgerResult<Option<Address>>;

    /// Get a balance; unwritten keys read as zero
    async fn get_balance(&self, key: &BalanceKey) -> LedgerResult<Amount>;

    /// Get the total issued amount of a `(class, sub id)` pair
    async fn get_total_supply(&self, class_id: ClassId, sub_id: SubId) -> LedgerResult<Amount>;

    /// Whether `operator` may move balances on behalf of `owner`
    async fn is_approved_for(&self, owner: &Address, operator: &Address) -> LedgerResult<bool>;

    /// Atomically apply the writes of one invocation
    async fn commit(&mut self, changes: ChangeSet) -> LedgerResult<()>;
}

/// A contract that accepts authenticated invocations
#[async_trait]
pub trait Invocable: Send {
    /// Address the contract is deployed at
    fn address(&self) -> Address;

    /// Apply `call` on behalf of `caller`, committing all of its writes or none
    async fn invoke(&mut self, caller: Address, call: LedgerCall)
        -> LedgerResult<InvocationReceipt>;
}

/// Trait for implementing who may mutate which part of the ledger
pub trait AuthorizationPolicy: Send + Sync {
    /// Authorize a metadata write; `manager` is `None` for an unclaimed class
    fn authorize_metadata_write(
        &self,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()>;

    /// Authorize handing a class over to another manager
    fn authorize_manager_change(
        &self,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()>;

    /// Authorize issuing new balance of a class
    fn authorize_issue(
        &self,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()>;

    /// Authorize moving balance out of `from`; `approved` reports whether
    /// `caller` is an approved operator of `from`
    fn authorize_transfer(&self, caller: &Address, from: &Address, approved: bool)
        -> LedgerResult<()>;
}

/// Default policy: the first address to write metadata for a class becomes
/// its manager, and only the manager may write metadata, issue, or hand the
/// class over afterwards. Balances move by their owner or an approved operator.
pub struct ClassManagerPolicy;

impl ClassManagerPolicy {
    fn require_manager(
        action: &str,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()> {
        match manager {
            Some(manager) if manager == caller => Ok(()),
            Some(manager) => {
                warn!(%caller, %manager, %class_id, action, "caller is not the class manager");
                Err(LedgerError::Authorization(format!(
                    "{} for class {} requires manager {}, caller was {}",
                    action, class_id, manager, caller
                )))
            }
            None => Err(LedgerError::Authorization(format!(
                "{} for class {} requires a class manager, class has none",
                action, class_id
            ))),
        }
    }
}

impl AuthorizationPolicy for ClassManagerPolicy {
    fn authorize_metadata_write(
        &self,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()> {
        match manager {
            // Unclaimed class, the writer claims it
            None => Ok(()),
            Some(_) => Self::require_manager("metadata write", caller, class_id, manager),
        }
    }

    fn authorize_manager_change(
        &self,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()> {
        Self::require_manager("manager change", caller, class_id, manager)
    }

    fn authorize_issue(
        &self,
        caller: &Address,
        class_id: ClassId,
        manager: Option<&Address>,
    ) -> LedgerResult<()> {
        Self::require_manager("issue", caller, class_id, manager)
    }

    fn authorize_transfer(
        &self,
        caller: &Address,
        from: &Address,
        approved: bool,
    ) -> LedgerResult<()> {
        if caller == from || approved {
            Ok(())
        } else {
            warn!(%caller, %from, "caller is neither owner nor approved operator");
            Err(LedgerError::Authorization(format!(
                "{} is not approved to move balances of {}",
                caller, from
            )))
        }
    }
}
