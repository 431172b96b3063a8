// ABOUTME: Locally persisted key material for the signed-in user
// ABOUTME: Plaintext or passphrase-encrypted secret key with unlock and bech32 helpers

use base64::{engine::general_purpose::STANDARD, Engine as _};
use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encryption::passphrase_key_manager::PassphraseKeyManager;
use crate::encryption::{KeyManager, KeyManagerError};

#[derive(Error, Debug)]
pub enum StoredKeyError {
    #[error("Passphrase required")]
    PassphraseRequired,
    #[error("Invalid passphrase")]
    InvalidPassphrase,
    #[error("Encryption error: {0}")]
    Encryption(#[from] KeyManagerError),
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Secret key material as it is persisted on the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMaterial {
    /// bech32 nsec kept in plaintext
    Plain(String),
    /// base64(nonce + AES-256-GCM ciphertext) of the 32-byte secret
    Encrypted(String),
}

/// A user's locally stored Nostr key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKey {
    /// Public half, kept in the clear for display and event construction
    pub public_key: PublicKey,
    pub material: KeyMaterial,
}

impl StoredKey {
    /// Persist `keys` in plaintext.
    pub fn plain(keys: &Keys) -> Result<Self, StoredKeyError> {
        let nsec = keys
            .secret_key()
            .to_bech32()
            .map_err(|e| StoredKeyError::Encoding(e.to_string()))?;
        Ok(Self {
            public_key: keys.public_key(),
            material: KeyMaterial::Plain(nsec),
        })
    }

    /// Encrypt `keys` under `passphrase` and persist the ciphertext.
    pub async fn encrypt(keys: &Keys, passphrase: &str) -> Result<Self, StoredKeyError> {
        let manager = PassphraseKeyManager::new(passphrase);
        let encrypted = manager.encrypt(keys.secret_key().as_secret_bytes()).await?;
        Ok(Self {
            public_key: keys.public_key(),
            material: KeyMaterial::Encrypted(STANDARD.encode(encrypted)),
        })
    }

    /// Recover the signing keys, decrypting with the passphrase when needed.
    pub async fn unlock(&self, passphrase: Option<&str>) -> Result<Keys, StoredKeyError> {
        let keys = match &self.material {
            KeyMaterial::Plain(nsec) => {
                Keys::parse(nsec).map_err(|e| StoredKeyError::InvalidKey(e.to_string()))?
            }
            KeyMaterial::Encrypted(blob) => {
                let passphrase = passphrase.ok_or(StoredKeyError::PassphraseRequired)?;
                let ciphertext = STANDARD
                    .decode(blob)
                    .map_err(|e| StoredKeyError::Encoding(e.to_string()))?;
                let manager = PassphraseKeyManager::new(passphrase);
                let secret = manager.decrypt(&ciphertext).await.map_err(|_| {
                    tracing::debug!(
                        target: "agora_core::stored_key",
                        "passphrase failed to decrypt stored key"
                    );
                    StoredKeyError::InvalidPassphrase
                })?;
                let secret_key = SecretKey::from_slice(&secret)
                    .map_err(|e| StoredKeyError::InvalidKey(e.to_string()))?;
                Keys::new(secret_key)
            }
        };

        // The stored public key is the source of truth for the account
        if keys.public_key() != self.public_key {
            return Err(StoredKeyError::InvalidKey(
                "decrypted key does not match stored public key".to_string(),
            ));
        }
        Ok(keys)
    }

    /// bech32 nsec, decrypting with the passphrase when needed.
    pub async fn nsec(&self, passphrase: Option<&str>) -> Result<String, StoredKeyError> {
        let keys = self.unlock(passphrase).await?;
        keys.secret_key()
            .to_bech32()
            .map_err(|e| StoredKeyError::Encoding(e.to_string()))
    }

    /// bech32 npub for display and clipboard copy.
    pub fn npub(&self) -> Result<String, StoredKeyError> {
        self.public_key
            .to_bech32()
            .map_err(|e| StoredKeyError::Encoding(e.to_string()))
    }

    /// Whether `passphrase` unlocks this key. Plaintext keys accept any passphrase.
    pub async fn valid_passphrase(&self, passphrase: &str) -> bool {
        self.unlock(Some(passphrase)).await.is_ok()
    }
}
