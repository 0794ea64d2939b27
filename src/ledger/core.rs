//! Main ledger orchestrator that coordinates the metadata registry and balances

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::OptioConfig;
use crate::ledger::{BalanceLedger, MetadataRegistry, PendingState};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_caller;

const LEDGER_ADDRESS_DOMAIN: &str = "optio.ledger";

/// Deployment nonce of this process; every deployed ledger takes the next one
static DEPLOYMENT_NONCE: AtomicU64 = AtomicU64::new(0);

/// Optio ledger: class metadata plus per-class balances behind one
/// authorization gate
pub struct OptioLedger<S: LedgerStorage> {
    address: Address,
    name: Felt,
    symbol: Felt,
    storage: S,
    registry: MetadataRegistry,
    balances: BalanceLedger,
}

impl<S: LedgerStorage> OptioLedger<S> {
    /// Deploy a ledger named `(name, symbol)` with the default class-manager
    /// policy.
    ///
    /// The address covers name, symbol and the deployment nonce, so two
    /// ledgers sharing a name and symbol still get distinct addresses.
    pub fn new(storage: S, name: &str, symbol: &str) -> LedgerResult<Self> {
        Self::with_policy(storage, name, symbol, Arc::new(ClassManagerPolicy))
    }

    /// Deploy a ledger with a custom authorization policy
    pub fn with_policy(
        storage: S,
        name: &str,
        symbol: &str,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> LedgerResult<Self> {
        let name_felt = Felt::from_short_string(name)?;
        let symbol_felt = Felt::from_short_string(symbol)?;

        let mut seed = Vec::with_capacity(64);
        seed.extend_from_slice(&name_felt.to_bytes_be());
        seed.extend_from_slice(&symbol_felt.to_bytes_be());
        let deployment = DEPLOYMENT_NONCE.fetch_add(1, Ordering::Relaxed);
        let address = Address::derive(LEDGER_ADDRESS_DOMAIN, &seed, deployment);

        info!(%address, name, symbol, deployment, "deployed optio ledger");

        Ok(Self {
            address,
            name: name_felt,
            symbol: symbol_felt,
            storage,
            registry: MetadataRegistry::new(policy.clone()),
            balances: BalanceLedger::new(policy),
        })
    }

    /// Deploy a ledger from the `[ledger]` section of a config
    pub fn from_config(storage: S, config: &OptioConfig) -> LedgerResult<Self> {
        Self::new(storage, &config.ledger.name, &config.ledger.symbol)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> Felt {
        self.name
    }

    pub fn symbol(&self) -> Felt {
        self.symbol
    }

    /// Committed storage backing this ledger
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Apply a state-changing call on behalf of `caller`.
    ///
    /// All writes of the call are committed together; on any error nothing
    /// is written.
    pub async fn invoke(
        &mut self,
        caller: Address,
        call: LedgerCall,
    ) -> LedgerResult<InvocationReceipt> {
        let entry_point = call.entry_point();
        validate_caller(&caller)?;
        debug!(%caller, entry_point, "invoking ledger");

        let mut state = PendingState::new(&self.storage);
        if let Err(error) = self.dispatch(&mut state, &caller, call).await {
            warn!(%caller, entry_point, %error, "invocation rejected");
            return Err(error);
        }

        let (changes, events) = state.into_parts();
        let written = changes.len();
        self.storage.commit(changes).await?;

        info!(%caller, entry_point, written, events = events.len(), "invocation committed");
        Ok(InvocationReceipt {
            caller,
            entry_point: entry_point.to_string(),
            events,
        })
    }

    async fn dispatch(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        call: LedgerCall,
    ) -> LedgerResult<()> {
        match call {
            LedgerCall::CreateClassMetadata {
                class_id,
                metadata_id,
                metadata,
            } => {
                self.registry
                    .create_class_metadata(state, caller, class_id, metadata_id, metadata)
                    .await
            }
            LedgerCall::SetClassManager { class_id, manager } => {
                self.registry
                    .set_class_manager(state, caller, class_id, manager)
                    .await
            }
            LedgerCall::Issue {
                to,
                class_id,
                sub_id,
                amount,
            } => {
                self.balances
                    .issue(state, caller, to, class_id, sub_id, amount)
                    .await
            }
            LedgerCall::Transfer {
                to,
                class_id,
                sub_id,
                amount,
            } => {
                self.balances
                    .transfer(state, caller, to, class_id, sub_id, amount)
                    .await
            }
            LedgerCall::TransferFrom {
                from,
                to,
                class_id,
                sub_id,
                amount,
            } => {
                self.balances
                    .transfer_from(state, caller, from, to, class_id, sub_id, amount)
                    .await
            }
            LedgerCall::Burn {
                class_id,
                sub_id,
                amount,
            } => {
                self.balances
                    .burn(state, caller, class_id, sub_id, amount)
                    .await
            }
            LedgerCall::SetApprovalFor { operator, approved } => {
                self.balances
                    .set_approval_for(state, caller, operator, approved)
                    .await
            }
        }
    }

    /// Answer a read-only query; never mutates state
    pub async fn query(&self, query: LedgerQuery) -> LedgerResult<QueryOutput> {
        debug!(entry_point = query.entry_point(), "querying ledger");
        let output = match query {
            LedgerQuery::Name => QueryOutput::Scalar(self.name),
            LedgerQuery::Symbol => QueryOutput::Scalar(self.symbol),
            LedgerQuery::BalanceOf {
                owner,
                class_id,
                sub_id,
            } => QueryOutput::Amount(self.balance_of(&owner, class_id, sub_id).await?),
            LedgerQuery::TotalSupply { class_id, sub_id } => {
                QueryOutput::Amount(self.total_supply(class_id, sub_id).await?)
            }
            LedgerQuery::GetClassMetadata {
                class_id,
                metadata_id,
            } => QueryOutput::ClassMetadata(self.get_class_metadata(class_id, metadata_id).await?),
            LedgerQuery::ListClassMetadata { class_id } => {
                QueryOutput::ClassMetadataList(self.list_class_metadata(class_id).await?)
            }
            LedgerQuery::ClassManager { class_id } => {
                QueryOutput::Manager(self.class_manager(class_id).await?)
            }
            LedgerQuery::IsApprovedFor { owner, operator } => {
                QueryOutput::Approved(self.is_approved_for(&owner, &operator).await?)
            }
        };
        Ok(output)
    }

    // Write operations
    /// Write one metadata slot of a class
    pub async fn create_class_metadata(
        &mut self,
        caller: Address,
        class_id: ClassId,
        metadata_id: MetadataId,
        metadata: ClassMetadata,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(
            caller,
            LedgerCall::CreateClassMetadata {
                class_id,
                metadata_id,
                metadata,
            },
        )
        .await
    }

    /// Issue new balance of a class to `to`
    pub async fn issue(
        &mut self,
        caller: Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(
            caller,
            LedgerCall::Issue {
                to,
                class_id,
                sub_id,
                amount,
            },
        )
        .await
    }

    /// Move the caller's balance to `to`
    pub async fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(
            caller,
            LedgerCall::Transfer {
                to,
                class_id,
                sub_id,
                amount,
            },
        )
        .await
    }

    /// Move `from`'s balance to `to` as its owner or an approved operator
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(
            caller,
            LedgerCall::TransferFrom {
                from,
                to,
                class_id,
                sub_id,
                amount,
            },
        )
        .await
    }

    pub async fn burn(
        &mut self,
        caller: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(
            caller,
            LedgerCall::Burn {
                class_id,
                sub_id,
                amount,
            },
        )
        .await
    }

    pub async fn set_approval_for(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(caller, LedgerCall::SetApprovalFor { operator, approved })
            .await
    }

    /// Hand class `class_id` over to `manager`
    pub async fn set_class_manager(
        &mut self,
        caller: Address,
        class_id: ClassId,
        manager: Address,
    ) -> LedgerResult<InvocationReceipt> {
        self.invoke(caller, LedgerCall::SetClassManager { class_id, manager })
            .await
    }

    // Read operations
    /// Balance of `owner` for `(class_id, sub_id)`, zero if never written
    pub async fn balance_of(
        &self,
        owner: &Address,
        class_id: ClassId,
        sub_id: SubId,
    ) -> LedgerResult<Amount> {
        self.balances
            .balance_of(&self.storage, owner, class_id, sub_id)
            .await
    }

    pub async fn total_supply(&self, class_id: ClassId, sub_id: SubId) -> LedgerResult<Amount> {
        self.balances
            .total_supply(&self.storage, class_id, sub_id)
            .await
    }

    /// Metadata slot of a class, all zeros if never written
    pub async fn get_class_metadata(
        &self,
        class_id: ClassId,
        metadata_id: MetadataId,
    ) -> LedgerResult<ClassMetadata> {
        self.registry
            .get_class_metadata(&self.storage, class_id, metadata_id)
            .await
    }

    pub async fn list_class_metadata(&self, class_id: ClassId) -> LedgerResult<Vec<ClassMetadata>> {
        self.registry
            .list_class_metadata(&self.storage, class_id)
            .await
    }

    pub async fn class_manager(&self, class_id: ClassId) -> LedgerResult<Option<Address>> {
        self.registry.class_manager(&self.storage, class_id).await
    }

    pub async fn is_approved_for(&self, owner: &Address, operator: &Address) -> LedgerResult<bool> {
        self.balances
            .is_approved_for(&self.storage, owner, operator)
            .await
    }
}

#[async_trait]
impl<S: LedgerStorage> Invocable for OptioLedger<S> {
    fn address(&self) -> Address {
        self.address
    }

    async fn invoke(
        &mut self,
        caller: Address,
        call: LedgerCall,
    ) -> LedgerResult<InvocationReceipt> {
        OptioLedger::invoke(self, caller, call).await
    }
}
