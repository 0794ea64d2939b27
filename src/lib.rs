//! # Optio Core
//!
//! A multi-class token ledger whose writes are authorized through
//! signature-checking accounts.
//!
//! ## Features
//!
//! - **Class metadata**: descriptors per `(class, slot)` with a per-class manager
//! - **Balances**: per `(owner, class, sub id)` with issue, transfer, operator transfer and burn
//! - **Accounts**: ed25519-authenticated forwarding with nonce replay protection
//! - **Atomic invocations**: every write of a call commits together or not at all
//! - **Storage abstraction**: any backend implementing [`LedgerStorage`]
//!
//! ## Quick Start
//!
//! ```rust
//! use optio_core::utils::MemoryStorage;
//! use optio_core::{ClassMetadata, LedgerCall, OptioLedger, Signer};
//!
//! # async fn run() -> optio_core::LedgerResult<()> {
//! let mut ledger = OptioLedger::new(MemoryStorage::new(), "Optio", "ETH")?;
//! let seller = Signer::new(12345);
//! let mut account = seller.deploy_account(0);
//!
//! let call = LedgerCall::CreateClassMetadata {
//!     class_id: 0,
//!     metadata_id: 1,
//!     metadata: ClassMetadata::from((0, 1, 4, 5, 6)),
//! };
//! let signature = seller.sign_call(&account, &ledger.address(), &call)?;
//! account.execute(&mut ledger, call, &signature).await?;
//!
//! assert_eq!(ledger.get_class_metadata(0, 1).await?, ClassMetadata::from((0, 1, 4, 5, 6)));
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod config;
pub mod ledger;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use account::{Account, Signer};
pub use config::OptioConfig;
pub use ledger::{BalanceLedger, ChangeSet, MetadataRegistry, OptioLedger, PendingState};
pub use traits::*;
pub use types::*;
