// ABOUTME: Sign-in methods supported by the marketplace client
// ABOUTME: The active method decides which signing strategy the dispatcher runs

use serde::{Deserialize, Serialize};

/// How the signed-in user produces event signatures.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignInMethod {
    /// Secret key held locally in plaintext
    PlainKey,
    /// Secret key held locally, encrypted under a passphrase
    EncryptedKey,
    /// Signing delegated to an injected host capability (browser extension)
    Extension,
    /// Signing delegated to the Amber app over a deep link and the clipboard
    Amber,
}

impl SignInMethod {
    /// Whether this method needs a passphrase to produce a signature.
    pub fn requires_passphrase(&self) -> bool {
        matches!(self, SignInMethod::EncryptedKey)
    }
}
