//! Class metadata registry

use std::sync::Arc;
use tracing::{debug, info};

use crate::ledger::PendingState;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_metadata_key, validate_recipient};

/// Registry of per-class metadata slots and class managers
pub struct MetadataRegistry {
    policy: Arc<dyn AuthorizationPolicy>,
}

impl MetadataRegistry {
    /// Create a new registry gated by `policy`
    pub fn new(policy: Arc<dyn AuthorizationPolicy>) -> Self {
        Self { policy }
    }

    /// Write (or overwrite) one metadata slot of a class.
    ///
    /// The ids echoed inside `metadata` must match `class_id`/`metadata_id`.
    /// Writing to an unclaimed class makes `caller` its manager.
    pub async fn create_class_metadata<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        class_id: ClassId,
        metadata_id: MetadataId,
        metadata: ClassMetadata,
    ) -> LedgerResult<()> {
        validate_metadata_key(class_id, metadata_id, &metadata)?;

        let manager = state.class_manager(class_id).await?;
        self.policy
            .authorize_metadata_write(caller, class_id, manager.as_ref())?;

        if manager.is_none() {
            info!(%class_id, %caller, "class claimed by first metadata writer");
            state.put_class_manager(class_id, *caller);
            state.emit(LedgerEvent::ClassManagerChanged {
                class_id,
                previous: None,
                manager: *caller,
            });
        }

        let overwritten = state.class_metadata(class_id, metadata_id).await?.is_some();
        if overwritten {
            debug!(%class_id, %metadata_id, "overwriting class metadata");
        }

        state.put_class_metadata(metadata);
        state.emit(LedgerEvent::ClassMetadataCreated {
            class_id,
            metadata_id,
            overwritten,
        });
        Ok(())
    }

    /// Hand a class over to `new_manager`
    pub async fn set_class_manager<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        class_id: ClassId,
        new_manager: Address,
    ) -> LedgerResult<()> {
        validate_recipient(&new_manager)?;

        let previous = state.class_manager(class_id).await?;
        self.policy
            .authorize_manager_change(caller, class_id, previous.as_ref())?;

        state.put_class_manager(class_id, new_manager);
        state.emit(LedgerEvent::ClassManagerChanged {
            class_id,
            previous,
            manager: new_manager,
        });
        Ok(())
    }

    /// Read one slot; never-written slots come back as the all-zero record
    pub async fn get_class_metadata<S: LedgerStorage>(
        &self,
        storage: &S,
        class_id: ClassId,
        metadata_id: MetadataId,
    ) -> LedgerResult<ClassMetadata> {
        Ok(storage
            .get_class_metadata(class_id, metadata_id)
            .await?
            .unwrap_or_default())
    }

    /// All written slots of a class
    pub async fn list_class_metadata<S: LedgerStorage>(
        &self,
        storage: &S,
        class_id: ClassId,
    ) -> LedgerResult<Vec<ClassMetadata>> {
        storage.list_class_metadata(class_id).await
    }

    pub async fn class_manager<S: LedgerStorage>(
        &self,
        storage: &S,
        class_id: ClassId,
    ) -> LedgerResult<Option<Address>> {
        storage.get_class_manager(class_id).await
    }
}
