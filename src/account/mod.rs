//! Signature-authenticated accounts
//!
//! An [`Account`] holds a public key and a nonce. It forwards a call to a
//! target contract only when the call carries a valid signature over the
//! account, the target, the call and the current nonce, and it consumes the
//! nonce only when the forwarded call commits.

pub mod signer;

pub use signer::Signer;

use ed25519_dalek::{Signature, VerifyingKey};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::traits::Invocable;
use crate::types::*;

const ACCOUNT_ADDRESS_DOMAIN: &str = "optio.account";
const EXECUTE_DOMAIN: &str = "optio.account.execute";

/// Canonical content covered by an execute signature
#[derive(Serialize)]
struct ExecuteRequest<'a> {
    domain: &'static str,
    account: &'a Address,
    target: &'a Address,
    nonce: Nonce,
    call: &'a LedgerCall,
}

/// Account contract authenticating calls with an ed25519 key
#[derive(Debug, Clone)]
pub struct Account {
    address: Address,
    public_key: VerifyingKey,
    nonce: Nonce,
}

impl Account {
    /// Deploy an account for `public_key`; the salt distinguishes several
    /// accounts sharing a key
    pub fn deploy(public_key: VerifyingKey, salt: u64) -> Self {
        let address = Address::derive(ACCOUNT_ADDRESS_DOMAIN, public_key.as_bytes(), salt);
        info!(%address, "deployed account");
        Self {
            address,
            public_key,
            nonce: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// Nonce the next signed call must be bound to
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// Digest a signer must sign for `call` to `target` at the current nonce
    pub fn signing_payload(&self, target: &Address, call: &LedgerCall) -> LedgerResult<[u8; 32]> {
        let request = ExecuteRequest {
            domain: EXECUTE_DOMAIN,
            account: &self.address,
            target,
            nonce: self.nonce,
            call,
        };
        let encoded = bincode::serialize(&request)
            .map_err(|e| LedgerError::Encoding(format!("cannot encode execute request: {}", e)))?;
        Ok(Sha256::digest(&encoded).into())
    }

    /// Check `signature` for `call` to `target` at the current nonce
    pub fn verify(
        &self,
        target: &Address,
        call: &LedgerCall,
        signature: &Signature,
    ) -> LedgerResult<()> {
        let payload = self.signing_payload(target, call)?;
        self.public_key
            .verify_strict(&payload, signature)
            .map_err(|e| {
                warn!(account = %self.address, nonce = self.nonce, "signature rejected");
                LedgerError::Authentication(format!(
                    "signature for account {} at nonce {} does not verify: {}",
                    self.address, self.nonce, e
                ))
            })
    }

    /// Verify `signature` and forward `call` to `target` with this account
    /// as the caller.
    ///
    /// The nonce advances by one exactly when the forwarded call commits.
    /// Authentication failures never reach the target; target failures are
    /// returned unchanged and leave the nonce as it was.
    pub async fn execute<T: Invocable + ?Sized>(
        &mut self,
        target: &mut T,
        call: LedgerCall,
        signature: &Signature,
    ) -> LedgerResult<InvocationReceipt> {
        let target_address = target.address();
        self.verify(&target_address, &call, signature)?;

        let next_nonce = self.nonce.checked_add(1).ok_or_else(|| {
            LedgerError::Overflow(format!("nonce of account {} exhausted", self.address))
        })?;

        let receipt = target.invoke(self.address, call).await?;

        info!(
            account = %self.address,
            target = %target_address,
            nonce = self.nonce,
            entry_point = %receipt.entry_point,
            "forwarded signed call"
        );
        self.nonce = next_nonce;
        Ok(receipt)
    }
}
