//! Seller and buyer walking through the Optio ledger with signed calls

use optio_core::utils::MemoryStorage;
use optio_core::{ClassMetadata, LedgerCall, LedgerQuery, OptioConfig, OptioLedger, Signer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = OptioConfig::load_or_default("optio.toml");
    config.init_tracing()?;

    println!("Optio Core - Signed Ledger Scenario\n");

    // 1. Deploy the ledger and one account per party
    let mut ledger = OptioLedger::from_config(MemoryStorage::new(), &config)?;
    let seller = Signer::new(2222);
    let buyer = Signer::new(1111);
    let mut seller_account = seller.deploy_account(0);
    let buyer_account = buyer.deploy_account(0);

    println!("Ledger  {} ({} / {})", ledger.address(), config.ledger.name, config.ledger.symbol);
    println!("Seller  {}", seller_account.address());
    println!("Buyer   {}\n", buyer_account.address());

    // 2. Seller describes class 0 and becomes its manager
    let descriptors = [
        (0, ClassMetadata::from_strings(0, 0, "maturity", "timestamp", "bond expiry")?),
        (1, ClassMetadata::from_strings(0, 1, "coupon", "percent", "annual rate")?),
    ];
    for (metadata_id, metadata) in descriptors {
        let call = LedgerCall::CreateClassMetadata {
            class_id: 0,
            metadata_id,
            metadata,
        };
        let signature = seller.sign_call(&seller_account, &ledger.address(), &call)?;
        let receipt = seller_account.execute(&mut ledger, call, &signature).await?;
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    }

    // 3. Issue a batch to the seller and sell part of it to the buyer
    let calls = [
        LedgerCall::Issue {
            to: seller_account.address(),
            class_id: 0,
            sub_id: 0,
            amount: 1_000,
        },
        LedgerCall::Transfer {
            to: buyer_account.address(),
            class_id: 0,
            sub_id: 0,
            amount: 250,
        },
    ];
    for call in calls {
        let signature = seller.sign_call(&seller_account, &ledger.address(), &call)?;
        let receipt = seller_account.execute(&mut ledger, call, &signature).await?;
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    }

    // 4. A replayed signature is refused
    let call = LedgerCall::Burn {
        class_id: 0,
        sub_id: 0,
        amount: 10,
    };
    let signature = seller.sign_call(&seller_account, &ledger.address(), &call)?;
    seller_account
        .execute(&mut ledger, call.clone(), &signature)
        .await?;
    match seller_account.execute(&mut ledger, call, &signature).await {
        Ok(_) => println!("\nreplay unexpectedly accepted"),
        Err(error) => println!("\nreplay refused: {}", error),
    }

    // 5. Read back
    println!("\nState after {} seller calls:", seller_account.nonce());
    for metadata in ledger.list_class_metadata(0).await? {
        println!(
            "  class {} slot {}: {} ({}) {}",
            metadata.class_id,
            metadata.metadata_id,
            metadata.name.to_short_string()?,
            metadata.metadata_type.to_short_string()?,
            metadata.description.to_short_string()?,
        );
    }
    println!(
        "  seller balance {}",
        ledger.balance_of(&seller_account.address(), 0, 0).await?
    );
    println!(
        "  buyer balance  {}",
        ledger.balance_of(&buyer_account.address(), 0, 0).await?
    );
    let supply = ledger
        .query(LedgerQuery::TotalSupply {
            class_id: 0,
            sub_id: 0,
        })
        .await?;
    println!("  total supply   {:?}", supply);

    Ok(())
}
