//! Integration tests for optio-core

use async_trait::async_trait;
use optio_core::utils::MemoryStorage;
use optio_core::{
    Account, Address, Amount, BalanceKey, ChangeSet, ClassId, ClassMetadata, Felt, LedgerCall,
    LedgerError, LedgerEvent, LedgerQuery, LedgerResult, LedgerStorage, MetadataId,
    OptioConfig, OptioLedger, QueryOutput, Signer, SubId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Party {
    signer: Signer,
    account: Account,
}

impl Party {
    fn new(secret: u64) -> Self {
        let signer = Signer::new(secret);
        let account = signer.deploy_account(0);
        Self { signer, account }
    }

    fn address(&self) -> Address {
        self.account.address()
    }

    /// Sign `call` for the ledger and forward it through the account
    async fn execute<S: LedgerStorage>(
        &mut self,
        ledger: &mut OptioLedger<S>,
        call: LedgerCall,
    ) -> LedgerResult<optio_core::InvocationReceipt> {
        let signature = self
            .signer
            .sign_call(&self.account, &ledger.address(), &call)?;
        self.account.execute(ledger, call, &signature).await
    }
}

fn deploy() -> (OptioLedger<MemoryStorage>, Party, Party) {
    let ledger = OptioLedger::new(MemoryStorage::new(), "Optio", "ETH").unwrap();
    let buyer = Party::new(1111);
    let seller = Party::new(2222);
    (ledger, buyer, seller)
}

fn metadata_call(class_id: ClassId, metadata_id: MetadataId, values: (u128, u128, u128)) -> LedgerCall {
    LedgerCall::CreateClassMetadata {
        class_id,
        metadata_id,
        metadata: ClassMetadata::from((class_id, metadata_id, values.0, values.1, values.2)),
    }
}

fn issue_call(to: Address, class_id: ClassId, sub_id: SubId, amount: Amount) -> LedgerCall {
    LedgerCall::Issue {
        to,
        class_id,
        sub_id,
        amount,
    }
}

#[tokio::test]
async fn test_deploy() {
    let (ledger, buyer, seller) = deploy();

    assert_eq!(ledger.balance_of(&buyer.address(), 0, 0).await.unwrap(), 0);
    assert_eq!(ledger.balance_of(&seller.address(), 3, 9).await.unwrap(), 0);
    assert_eq!(ledger.total_supply(0, 0).await.unwrap(), 0);
    assert_eq!(
        ledger
            .query(LedgerQuery::Name)
            .await
            .unwrap(),
        QueryOutput::Scalar(Felt::from_short_string("optio").unwrap())
    );
}

#[tokio::test]
async fn test_setting_metadata() {
    let (mut ledger, _buyer, seller) = deploy();

    ledger
        .create_class_metadata(seller.address(), 0, 0, ClassMetadata::from((0, 0, 1, 2, 3)))
        .await
        .unwrap();

    assert_eq!(ledger.class_manager(0).await.unwrap(), Some(seller.address()));
}

#[tokio::test]
async fn test_getting_metadata() {
    let (mut ledger, _buyer, seller) = deploy();

    ledger
        .create_class_metadata(seller.address(), 0, 1, ClassMetadata::from((0, 1, 4, 5, 6)))
        .await
        .unwrap();

    let metadata = ledger.get_class_metadata(0, 1).await.unwrap();
    assert_eq!(metadata.class_id, 0);
    assert_eq!(metadata.metadata_id, 1);
    assert_eq!(metadata.name, Felt::from(4u64));
    assert_eq!(metadata.metadata_type, Felt::from(5u64));
    assert_eq!(metadata.description, Felt::from(6u64));

    let output = ledger
        .query(LedgerQuery::GetClassMetadata {
            class_id: 0,
            metadata_id: 1,
        })
        .await
        .unwrap();
    assert_eq!(output, QueryOutput::ClassMetadata(metadata));
}

#[tokio::test]
async fn test_unwritten_metadata_reads_as_zero() {
    let (mut ledger, _buyer, seller) = deploy();

    assert!(ledger.get_class_metadata(0, 1).await.unwrap().is_empty());

    ledger
        .create_class_metadata(seller.address(), 0, 1, ClassMetadata::from((0, 1, 4, 5, 6)))
        .await
        .unwrap();
    assert_eq!(
        ledger.get_class_metadata(0, 2).await.unwrap(),
        ClassMetadata::default()
    );
}

#[tokio::test]
async fn test_metadata_overwrite() {
    let (mut ledger, _buyer, mut seller) = deploy();

    seller
        .execute(&mut ledger, metadata_call(0, 1, (4, 5, 6)))
        .await
        .unwrap();
    let receipt = seller
        .execute(&mut ledger, metadata_call(0, 1, (7, 8, 9)))
        .await
        .unwrap();

    assert_eq!(
        ledger.get_class_metadata(0, 1).await.unwrap(),
        ClassMetadata::from((0, 1, 7, 8, 9))
    );
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::ClassMetadataCreated {
            class_id: 0,
            metadata_id: 1,
            overwritten: true,
        }]
    );
    assert_eq!(ledger.list_class_metadata(0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_mismatched_metadata_payload_rejected() {
    let (mut ledger, _buyer, seller) = deploy();

    let result = ledger
        .create_class_metadata(seller.address(), 0, 1, ClassMetadata::from((1, 1, 4, 5, 6)))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    assert!(ledger.get_class_metadata(0, 1).await.unwrap().is_empty());
    assert_eq!(ledger.class_manager(0).await.unwrap(), None);
}

#[tokio::test]
async fn test_unauthorized_metadata_write_leaves_registry_unchanged() {
    let (mut ledger, mut buyer, mut seller) = deploy();

    seller
        .execute(&mut ledger, metadata_call(0, 1, (4, 5, 6)))
        .await
        .unwrap();

    let overwrite = buyer
        .execute(&mut ledger, metadata_call(0, 1, (9, 9, 9)))
        .await;
    let new_slot = buyer
        .execute(&mut ledger, metadata_call(0, 2, (9, 9, 9)))
        .await;

    assert!(matches!(overwrite, Err(LedgerError::Authorization(_))));
    assert!(matches!(new_slot, Err(LedgerError::Authorization(_))));
    assert_eq!(
        ledger.list_class_metadata(0).await.unwrap(),
        vec![ClassMetadata::from((0, 1, 4, 5, 6))]
    );
    assert_eq!(buyer.account.nonce(), 0);

    // A different class is still open to the buyer
    buyer
        .execute(&mut ledger, metadata_call(1, 0, (1, 2, 3)))
        .await
        .unwrap();
    assert_eq!(ledger.class_manager(1).await.unwrap(), Some(buyer.address()));
}

#[tokio::test]
async fn test_signed_call_cannot_be_replayed() {
    let (mut ledger, _buyer, mut seller) = deploy();

    let call = metadata_call(0, 1, (4, 5, 6));
    let signature = seller
        .signer
        .sign_call(&seller.account, &ledger.address(), &call)
        .unwrap();

    seller
        .account
        .execute(&mut ledger, call.clone(), &signature)
        .await
        .unwrap();
    assert_eq!(seller.account.nonce(), 1);

    let replay = seller
        .account
        .execute(&mut ledger, call, &signature)
        .await;
    assert!(matches!(replay, Err(LedgerError::Authentication(_))));
    assert_eq!(seller.account.nonce(), 1);
}

#[tokio::test]
async fn test_signature_for_other_ledger_rejected() {
    let (mut ledger, _buyer, mut seller) = deploy();
    let other = OptioLedger::new(MemoryStorage::new(), "Other", "BTC").unwrap();

    let call = metadata_call(0, 1, (4, 5, 6));
    let signature = seller
        .signer
        .sign_call(&seller.account, &other.address(), &call)
        .unwrap();

    let result = seller.account.execute(&mut ledger, call, &signature).await;
    assert!(matches!(result, Err(LedgerError::Authentication(_))));
    assert!(ledger.get_class_metadata(0, 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signature_for_same_named_ledger_rejected() {
    let (mut ledger, _buyer, mut seller) = deploy();
    let mut twin = OptioLedger::new(MemoryStorage::new(), "Optio", "ETH").unwrap();
    assert_ne!(ledger.address(), twin.address());

    let call = metadata_call(0, 1, (4, 5, 6));
    let signature = seller
        .signer
        .sign_call(&seller.account, &ledger.address(), &call)
        .unwrap();

    let result = seller
        .account
        .execute(&mut twin, call.clone(), &signature)
        .await;
    assert!(matches!(result, Err(LedgerError::Authentication(_))));
    assert!(twin.get_class_metadata(0, 1).await.unwrap().is_empty());
    assert_eq!(seller.account.nonce(), 0);

    // The intended ledger still accepts it
    seller
        .account
        .execute(&mut ledger, call, &signature)
        .await
        .unwrap();
    assert_eq!(
        ledger.get_class_metadata(0, 1).await.unwrap(),
        ClassMetadata::from((0, 1, 4, 5, 6))
    );
}

#[tokio::test]
async fn test_issue_transfer_burn_keep_supply() {
    let (mut ledger, mut buyer, mut seller) = deploy();
    let seller_address = seller.address();
    let buyer_address = buyer.address();

    seller
        .execute(&mut ledger, metadata_call(0, 0, (1, 2, 3)))
        .await
        .unwrap();
    seller
        .execute(&mut ledger, issue_call(seller_address, 0, 0, 1_000))
        .await
        .unwrap();
    seller
        .execute(
            &mut ledger,
            LedgerCall::Transfer {
                to: buyer_address,
                class_id: 0,
                sub_id: 0,
                amount: 400,
            },
        )
        .await
        .unwrap();
    buyer
        .execute(
            &mut ledger,
            LedgerCall::Burn {
                class_id: 0,
                sub_id: 0,
                amount: 100,
            },
        )
        .await
        .unwrap();

    assert_eq!(ledger.balance_of(&seller_address, 0, 0).await.unwrap(), 600);
    assert_eq!(ledger.balance_of(&buyer_address, 0, 0).await.unwrap(), 300);
    assert_eq!(ledger.total_supply(0, 0).await.unwrap(), 900);
    // Other sub ids of the class are untouched
    assert_eq!(ledger.balance_of(&seller_address, 0, 1).await.unwrap(), 0);
    assert_eq!(seller.account.nonce(), 3);
    assert_eq!(buyer.account.nonce(), 1);
}

#[tokio::test]
async fn test_only_manager_issues() {
    let (mut ledger, mut buyer, mut seller) = deploy();
    let buyer_address = buyer.address();

    let unclaimed = buyer
        .execute(&mut ledger, issue_call(buyer_address, 0, 0, 5))
        .await;
    assert!(matches!(unclaimed, Err(LedgerError::Authorization(_))));

    seller
        .execute(&mut ledger, metadata_call(0, 0, (1, 2, 3)))
        .await
        .unwrap();
    let not_manager = buyer
        .execute(&mut ledger, issue_call(buyer_address, 0, 0, 5))
        .await;
    assert!(matches!(not_manager, Err(LedgerError::Authorization(_))));
    assert_eq!(ledger.total_supply(0, 0).await.unwrap(), 0);
}

#[tokio::test]
async fn test_overdrawn_transfer_rejected() {
    let (mut ledger, mut buyer, mut seller) = deploy();
    let seller_address = seller.address();

    seller
        .execute(&mut ledger, metadata_call(0, 0, (1, 2, 3)))
        .await
        .unwrap();
    seller
        .execute(&mut ledger, issue_call(seller_address, 0, 0, 10))
        .await
        .unwrap();

    let result = seller
        .execute(
            &mut ledger,
            LedgerCall::Transfer {
                to: buyer.address(),
                class_id: 0,
                sub_id: 0,
                amount: 11,
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(LedgerError::InsufficientBalance {
            available: 10,
            requested: 11
        })
    ));
    assert_eq!(ledger.balance_of(&seller_address, 0, 0).await.unwrap(), 10);
    assert_eq!(ledger.balance_of(&buyer.address(), 0, 0).await.unwrap(), 0);
    assert_eq!(seller.account.nonce(), 2);

    // The buyer never held anything to burn
    let burn = buyer
        .execute(
            &mut ledger,
            LedgerCall::Burn {
                class_id: 0,
                sub_id: 0,
                amount: 1,
            },
        )
        .await;
    assert!(matches!(burn, Err(LedgerError::InsufficientBalance { .. })));
}

#[tokio::test]
async fn test_operator_transfer() {
    let (mut ledger, mut buyer, mut seller) = deploy();
    let mut operator = Party::new(3333);
    let seller_address = seller.address();
    let buyer_address = buyer.address();

    seller
        .execute(&mut ledger, metadata_call(0, 0, (1, 2, 3)))
        .await
        .unwrap();
    seller
        .execute(&mut ledger, issue_call(seller_address, 0, 0, 50))
        .await
        .unwrap();

    let transfer_from = LedgerCall::TransferFrom {
        from: seller_address,
        to: buyer_address,
        class_id: 0,
        sub_id: 0,
        amount: 20,
    };

    let unapproved = operator.execute(&mut ledger, transfer_from.clone()).await;
    assert!(matches!(unapproved, Err(LedgerError::Authorization(_))));

    seller
        .execute(
            &mut ledger,
            LedgerCall::SetApprovalFor {
                operator: operator.address(),
                approved: true,
            },
        )
        .await
        .unwrap();
    assert!(ledger
        .is_approved_for(&seller_address, &operator.address())
        .await
        .unwrap());

    let receipt = operator
        .execute(&mut ledger, transfer_from.clone())
        .await
        .unwrap();
    assert_eq!(
        receipt.events,
        vec![LedgerEvent::Transferred {
            operator: operator.address(),
            from: seller_address,
            to: buyer_address,
            class_id: 0,
            sub_id: 0,
            amount: 20,
        }]
    );
    assert_eq!(ledger.balance_of(&seller_address, 0, 0).await.unwrap(), 30);
    assert_eq!(ledger.balance_of(&buyer_address, 0, 0).await.unwrap(), 20);

    seller
        .execute(
            &mut ledger,
            LedgerCall::SetApprovalFor {
                operator: operator.address(),
                approved: false,
            },
        )
        .await
        .unwrap();
    let revoked = operator.execute(&mut ledger, transfer_from).await;
    assert!(matches!(revoked, Err(LedgerError::Authorization(_))));
}

#[tokio::test]
async fn test_manager_handover() {
    let (mut ledger, mut buyer, mut seller) = deploy();
    let buyer_address = buyer.address();

    seller
        .execute(&mut ledger, metadata_call(4, 0, (1, 2, 3)))
        .await
        .unwrap();

    let grab = buyer
        .execute(
            &mut ledger,
            LedgerCall::SetClassManager {
                class_id: 4,
                manager: buyer_address,
            },
        )
        .await;
    assert!(matches!(grab, Err(LedgerError::Authorization(_))));

    seller
        .execute(
            &mut ledger,
            LedgerCall::SetClassManager {
                class_id: 4,
                manager: buyer_address,
            },
        )
        .await
        .unwrap();
    assert_eq!(ledger.class_manager(4).await.unwrap(), Some(buyer_address));

    buyer
        .execute(&mut ledger, metadata_call(4, 1, (4, 5, 6)))
        .await
        .unwrap();
    let stale = seller
        .execute(&mut ledger, metadata_call(4, 2, (7, 8, 9)))
        .await;
    assert!(matches!(stale, Err(LedgerError::Authorization(_))));
}

/// Storage whose commits can be made to fail
#[derive(Clone)]
struct FlakyStorage {
    inner: MemoryStorage,
    fail_commits: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerStorage for FlakyStorage {
    async fn get_class_metadata(
        &self,
        class_id: ClassId,
        metadata_id: MetadataId,
    ) -> LedgerResult<Option<ClassMetadata>> {
        self.inner.get_class_metadata(class_id, metadata_id).await
    }

    async fn list_class_metadata(&self, class_id: ClassId) -> LedgerResult<Vec<ClassMetadata>> {
        self.inner.list_class_metadata(class_id).await
    }

    async fn get_class_manager(&self, class_id: ClassId) -> LedgerResult<Option<Address>> {
        self.inner.get_class_manager(class_id).await
    }

    async fn get_balance(&self, key: &BalanceKey) -> LedgerResult<Amount> {
        self.inner.get_balance(key).await
    }

    async fn get_total_supply(&self, class_id: ClassId, sub_id: SubId) -> LedgerResult<Amount> {
        self.inner.get_total_supply(class_id, sub_id).await
    }

    async fn is_approved_for(&self, owner: &Address, operator: &Address) -> LedgerResult<bool> {
        self.inner.is_approved_for(owner, operator).await
    }

    async fn commit(&mut self, changes: ChangeSet) -> LedgerResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage("commit refused".to_string()));
        }
        self.inner.commit(changes).await
    }
}

#[tokio::test]
async fn test_failed_commit_keeps_state_and_nonce() {
    let fail_commits = Arc::new(AtomicBool::new(false));
    let storage = FlakyStorage {
        inner: MemoryStorage::new(),
        fail_commits: fail_commits.clone(),
    };
    let mut ledger = OptioLedger::new(storage, "Optio", "ETH").unwrap();
    let mut seller = Party::new(2222);
    let seller_address = seller.address();

    seller
        .execute(&mut ledger, metadata_call(0, 0, (1, 2, 3)))
        .await
        .unwrap();

    fail_commits.store(true, Ordering::SeqCst);
    let result = seller
        .execute(&mut ledger, issue_call(seller_address, 0, 0, 10))
        .await;
    assert!(matches!(result, Err(LedgerError::Storage(_))));
    assert_eq!(seller.account.nonce(), 1);
    assert_eq!(ledger.balance_of(&seller_address, 0, 0).await.unwrap(), 0);
    assert_eq!(ledger.total_supply(0, 0).await.unwrap(), 0);

    // The same signed intent goes through once storage recovers
    fail_commits.store(false, Ordering::SeqCst);
    seller
        .execute(&mut ledger, issue_call(seller_address, 0, 0, 10))
        .await
        .unwrap();
    assert_eq!(seller.account.nonce(), 2);
    assert_eq!(ledger.balance_of(&seller_address, 0, 0).await.unwrap(), 10);
}

#[tokio::test]
async fn test_ledger_from_config() {
    let config = OptioConfig::from_toml_str(
        r#"
        [ledger]
        name = "Bonds"
        symbol = "USDC"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();
    let ledger = OptioLedger::from_config(MemoryStorage::new(), &config).unwrap();

    assert_eq!(ledger.name().to_short_string().unwrap(), "bonds");
    assert_eq!(ledger.symbol().to_short_string().unwrap(), "usdc");
}

#[tokio::test]
async fn test_receipt_serializes_to_json() {
    let (mut ledger, _buyer, mut seller) = deploy();

    let receipt = seller
        .execute(&mut ledger, metadata_call(0, 1, (4, 5, 6)))
        .await
        .unwrap();
    let json = serde_json::to_value(&receipt).unwrap();

    assert_eq!(json["entry_point"], "createClassMetadata");
    assert_eq!(json["events"].as_array().map(|e| e.len()), Some(2));
}
