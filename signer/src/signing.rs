// ABOUTME: Trait for the event signing strategies shared by the upload and profile flows
// ABOUTME: Implemented by the local key signer, the injected extension, and the Amber handshake

use std::sync::Arc;

use async_trait::async_trait;
use nostr_sdk::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Extension signing failed: {0}")]
    Extension(String),
    #[error("Local signing failed: {0}")]
    Key(String),
    #[error("Remote signer error: {0}")]
    Remote(String),
    #[error("Amber signing timed out. Please try again.")]
    Timeout,
}

/// A strategy that turns an unsigned event into a signed one.
///
/// The browser-extension capability is injected as an implementation of
/// this trait; the local-key and Amber strategies implement it as well so
/// the dispatcher runs exactly one strategy per call.
#[async_trait]
pub trait EventSigner: Send + Sync {
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError>;
}

#[async_trait]
impl<T> EventSigner for Arc<T>
where
    T: EventSigner + ?Sized,
{
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        (**self).sign_event(unsigned).await
    }
}

/// Signs with a secret key held in memory.
pub struct LocalKeySigner {
    keys: Keys,
}

impl LocalKeySigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }
}

#[async_trait]
impl EventSigner for LocalKeySigner {
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        unsigned
            .sign(&self.keys)
            .await
            .map_err(|e| SignerError::Key(e.to_string()))
    }
}
