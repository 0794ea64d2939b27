//! Ledger module containing the metadata registry, balances and invocation processing

pub mod balance;
pub mod core;
pub mod metadata;
pub mod state;

pub use balance::*;
pub use self::core::*;
pub use metadata::*;
pub use state::*;
