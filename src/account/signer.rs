//! Deterministic ed25519 signer for account calls

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};

use crate::account::Account;
use crate::types::*;

/// Holder of an account's private key
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Signer whose secret seed is `secret` in big-endian, zero padded
    pub fn new(secret: u64) -> Self {
        let mut seed = [0u8; 32];
        seed[24..].copy_from_slice(&secret.to_be_bytes());
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Deploy an account controlled by this signer
    pub fn deploy_account(&self, salt: u64) -> Account {
        Account::deploy(self.public_key(), salt)
    }

    /// Sign `call` to `target` for the account's current nonce
    pub fn sign_call(
        &self,
        account: &Account,
        target: &Address,
        call: &LedgerCall,
    ) -> LedgerResult<Signature> {
        let payload = account.signing_payload(target, call)?;
        Ok(self.signing_key.sign(&payload))
    }
}
