//! Core types and data structures for the Optio ledger

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

/// Identifier of a token class
pub type ClassId = u128;
/// Identifier of a metadata slot within a class
pub type MetadataId = u128;
/// Identifier partitioning balances within a class
pub type SubId = u128;
/// Token amount
pub type Amount = u128;
/// Account replay-protection counter
pub type Nonce = u64;

/// Longest text that fits into a single scalar
pub const MAX_SHORT_STRING_LEN: usize = 31;

/// Fixed-width scalar, stored as 32 big-endian bytes.
///
/// Short text is packed as its UTF-8 bytes aligned to the low end of the
/// scalar, so `"eth"` and `0x657468` are the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Felt([u8; 32]);

impl Felt {
    pub const ZERO: Felt = Felt([0u8; 32]);

    pub fn from_bytes_be(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes_be(&self) -> [u8; 32] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Pack a short string into a scalar.
    ///
    /// Uppercase input is lower-cased and logged, never rejected. Text longer
    /// than [`MAX_SHORT_STRING_LEN`] bytes is an encoding error.
    pub fn from_short_string(text: &str) -> LedgerResult<Self> {
        let lowered = text.to_lowercase();
        if lowered != text {
            warn!(
                text,
                "converting short string with uppercase characters to lowercase"
            );
        }

        let bytes = lowered.as_bytes();
        if bytes.len() > MAX_SHORT_STRING_LEN {
            return Err(LedgerError::Encoding(format!(
                "short string '{}' is {} bytes, limit is {}",
                lowered,
                bytes.len(),
                MAX_SHORT_STRING_LEN
            )));
        }

        let mut packed = [0u8; 32];
        packed[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(packed))
    }

    /// Unpack a scalar produced by [`Felt::from_short_string`]
    pub fn to_short_string(&self) -> LedgerResult<String> {
        let start = self.0.iter().position(|b| *b != 0).unwrap_or(32);
        String::from_utf8(self.0[start..].to_vec())
            .map_err(|e| LedgerError::Encoding(format!("scalar {} is not UTF-8 text: {}", self, e)))
    }

    /// Numeric value, if it fits into 128 bits
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }
}

impl From<u128> for Felt {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        Self::from(u128::from(value))
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128() {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

/// Address of a deployed contract (ledger or account)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Deterministically derive a contract address from a domain tag, the
    /// deployment input and a salt
    pub fn derive(domain: &str, seed: &[u8], salt: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(seed);
        hasher.update(salt.to_be_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Descriptor stored in one metadata slot of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Class the record describes (echo of the storage key)
    pub class_id: ClassId,
    /// Slot within the class (echo of the storage key)
    pub metadata_id: MetadataId,
    pub name: Felt,
    pub metadata_type: Felt,
    pub description: Felt,
}

impl ClassMetadata {
    pub fn new(
        class_id: ClassId,
        metadata_id: MetadataId,
        name: Felt,
        metadata_type: Felt,
        description: Felt,
    ) -> Self {
        Self {
            class_id,
            metadata_id,
            name,
            metadata_type,
            description,
        }
    }

    /// Build a record from short strings, e.g. `("coupon", "uint", "annual rate")`
    pub fn from_strings(
        class_id: ClassId,
        metadata_id: MetadataId,
        name: &str,
        metadata_type: &str,
        description: &str,
    ) -> LedgerResult<Self> {
        Ok(Self::new(
            class_id,
            metadata_id,
            Felt::from_short_string(name)?,
            Felt::from_short_string(metadata_type)?,
            Felt::from_short_string(description)?,
        ))
    }

    /// True for the all-zero record returned for never-written slots
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<(ClassId, MetadataId, u128, u128, u128)> for ClassMetadata {
    fn from(
        (class_id, metadata_id, name, metadata_type, description): (
            ClassId,
            MetadataId,
            u128,
            u128,
            u128,
        ),
    ) -> Self {
        Self::new(
            class_id,
            metadata_id,
            Felt::from(name),
            Felt::from(metadata_type),
            Felt::from(description),
        )
    }
}

/// Storage key of a single balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub owner: Address,
    pub class_id: ClassId,
    pub sub_id: SubId,
}

impl BalanceKey {
    pub fn new(owner: Address, class_id: ClassId, sub_id: SubId) -> Self {
        Self {
            owner,
            class_id,
            sub_id,
        }
    }
}

/// State-changing entry points of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCall {
    CreateClassMetadata {
        class_id: ClassId,
        metadata_id: MetadataId,
        metadata: ClassMetadata,
    },
    SetClassManager {
        class_id: ClassId,
        manager: Address,
    },
    Issue {
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    Transfer {
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    TransferFrom {
        from: Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    Burn {
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    SetApprovalFor {
        operator: Address,
        approved: bool,
    },
}

impl LedgerCall {
    /// External name of the entry point
    pub fn entry_point(&self) -> &'static str {
        match self {
            LedgerCall::CreateClassMetadata { .. } => "createClassMetadata",
            LedgerCall::SetClassManager { .. } => "setClassManager",
            LedgerCall::Issue { .. } => "issue",
            LedgerCall::Transfer { .. } => "transfer",
            LedgerCall::TransferFrom { .. } => "transferFrom",
            LedgerCall::Burn { .. } => "burn",
            LedgerCall::SetApprovalFor { .. } => "setApprovalFor",
        }
    }
}

/// Read-only entry points of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerQuery {
    Name,
    Symbol,
    BalanceOf {
        owner: Address,
        class_id: ClassId,
        sub_id: SubId,
    },
    TotalSupply {
        class_id: ClassId,
        sub_id: SubId,
    },
    GetClassMetadata {
        class_id: ClassId,
        metadata_id: MetadataId,
    },
    ListClassMetadata {
        class_id: ClassId,
    },
    ClassManager {
        class_id: ClassId,
    },
    IsApprovedFor {
        owner: Address,
        operator: Address,
    },
}

impl LedgerQuery {
    pub fn entry_point(&self) -> &'static str {
        match self {
            LedgerQuery::Name => "name",
            LedgerQuery::Symbol => "symbol",
            LedgerQuery::BalanceOf { .. } => "balanceOf",
            LedgerQuery::TotalSupply { .. } => "totalSupply",
            LedgerQuery::GetClassMetadata { .. } => "getClassMetadata",
            LedgerQuery::ListClassMetadata { .. } => "listClassMetadata",
            LedgerQuery::ClassManager { .. } => "classManager",
            LedgerQuery::IsApprovedFor { .. } => "isApprovedFor",
        }
    }
}

/// Result of a read-only query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutput {
    Scalar(Felt),
    Amount(Amount),
    ClassMetadata(ClassMetadata),
    ClassMetadataList(Vec<ClassMetadata>),
    Manager(Option<Address>),
    Approved(bool),
}

/// Event emitted by a successful invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    ClassMetadataCreated {
        class_id: ClassId,
        metadata_id: MetadataId,
        overwritten: bool,
    },
    ClassManagerChanged {
        class_id: ClassId,
        previous: Option<Address>,
        manager: Address,
    },
    Issued {
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    Transferred {
        operator: Address,
        from: Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    Burned {
        owner: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    },
    ApprovalSet {
        owner: Address,
        operator: Address,
        approved: bool,
    },
}

/// Outcome of a committed invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationReceipt {
    /// Address the ledger saw as the immediate caller
    pub caller: Address,
    pub entry_point: String,
    pub events: Vec<LedgerEvent>,
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Authentication failure: {0}")]
    Authentication(String),
    #[error("Authorization failure: {0}")]
    Authorization(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Amount, requested: Amount },
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
