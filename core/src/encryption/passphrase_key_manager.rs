// ABOUTME: Passphrase-based AES-256-GCM key manager for locally stored secrets
// ABOUTME: Derives the cipher key from the passphrase and prepends the nonce to the ciphertext

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};

use super::{KeyManager, KeyManagerError};

const NONCE_SIZE: usize = 12;

/// Encrypts and decrypts under a key derived from a user passphrase.
///
/// A wrong passphrase derives a different key, so decryption fails
/// authentication instead of returning garbage bytes.
pub struct PassphraseKeyManager {
    cipher: Aes256Gcm,
}

impl PassphraseKeyManager {
    pub fn new(passphrase: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }
}

#[async_trait]
impl KeyManager for PassphraseKeyManager {
    async fn encrypt(&self, plaintext_bytes: &[u8]) -> Result<Vec<u8>, KeyManagerError> {
        let nonce_bytes: [u8; NONCE_SIZE] = rand::thread_rng().gen();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext_bytes)
            .map_err(|e| KeyManagerError::Encrypt(e.to_string()))?;

        // Nonce travels with the ciphertext
        let mut result = nonce.to_vec();
        result.extend(ciphertext);
        Ok(result)
    }

    async fn decrypt(&self, ciphertext_bytes: &[u8]) -> Result<Vec<u8>, KeyManagerError> {
        if ciphertext_bytes.len() < NONCE_SIZE {
            return Err(KeyManagerError::Decrypt("Ciphertext too short".to_string()));
        }

        let nonce = Nonce::from_slice(&ciphertext_bytes[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &ciphertext_bytes[NONCE_SIZE..])
            .map_err(|e| KeyManagerError::Decrypt(e.to_string()))
    }
}
