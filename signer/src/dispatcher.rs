// ABOUTME: Selects and runs exactly one signing strategy per call
// ABOUTME: Validates files, signs the host authorization, and maps upload responses

use std::sync::Arc;

use nostr_sdk::prelude::*;
use thiserror::Error;

use agora_core::types::sign_in::SignInMethod;
use agora_core::types::stored_key::{StoredKey, StoredKeyError};

use crate::amber::AmberSigner;
use crate::host::{ClipboardChannel, HostWindow};
use crate::signing::{EventSigner, LocalKeySigner, SignerError};
use crate::upload::{MediaFile, MediaHost, UploadError, UploadResult};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No files were selected")]
    NoFiles,
    #[error("Only images are supported")]
    UnsupportedMedia,
    #[error("No local key is stored for this account")]
    MissingKey,
    #[error("Invalid passphrase!")]
    InvalidPassphrase,
    #[error("No extension signer is available")]
    ExtensionUnavailable,
    #[error("Clipboard and window access are required for Amber signing")]
    HostUnavailable,
    #[error("Signing failed: {0}")]
    Signing(SignerError),
    #[error("Amber signing timed out. Please try again.")]
    Timeout,
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl From<SignerError> for DispatchError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::Timeout => DispatchError::Timeout,
            other => DispatchError::Signing(other),
        }
    }
}

/// Runs the signing strategy selected by the user's sign-in method and
/// submits signed uploads to the media host.
///
/// Exactly one strategy executes per call. Amber signings share the
/// ambient clipboard, so concurrent calls with that method must be
/// serialized by the caller.
pub struct UploadDispatcher {
    method: SignInMethod,
    public_key: PublicKey,
    media_host: Arc<dyn MediaHost>,
    stored_key: Option<StoredKey>,
    extension: Option<Arc<dyn EventSigner>>,
    clipboard: Option<Arc<dyn ClipboardChannel>>,
    window: Option<Arc<dyn HostWindow>>,
}

impl UploadDispatcher {
    pub fn new(
        method: SignInMethod,
        public_key: PublicKey,
        media_host: Arc<dyn MediaHost>,
    ) -> Self {
        Self {
            method,
            public_key,
            media_host,
            stored_key: None,
            extension: None,
            clipboard: None,
            window: None,
        }
    }

    /// Attach the locally stored key (plain and encrypted key methods).
    pub fn with_stored_key(mut self, stored_key: StoredKey) -> Self {
        self.stored_key = Some(stored_key);
        self
    }

    /// Attach the host signing capability (extension method).
    pub fn with_extension(mut self, extension: Arc<dyn EventSigner>) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Attach the clipboard and window the Amber handshake needs.
    pub fn with_host(
        mut self,
        clipboard: Arc<dyn ClipboardChannel>,
        window: Arc<dyn HostWindow>,
    ) -> Self {
        self.clipboard = Some(clipboard);
        self.window = Some(window);
        self
    }

    pub fn method(&self) -> SignInMethod {
        self.method
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Whether the active method needs a passphrase. Drives the submit
    /// gating in settings forms.
    pub fn requires_passphrase(&self) -> bool {
        self.method.requires_passphrase()
    }

    /// Sign `unsigned` with the strategy for the active sign-in method.
    pub async fn sign_event(
        &self,
        unsigned: UnsignedEvent,
        passphrase: Option<&str>,
    ) -> Result<Event, DispatchError> {
        let signer = self.resolve_signer(passphrase).await?;
        Ok(signer.sign_event(unsigned).await?)
    }

    /// Validate, sign, and upload a batch of image files.
    ///
    /// All failures are terminal for the call; nothing is retried here and
    /// the caller re-invokes on error.
    pub async fn sign_and_upload(
        &self,
        files: Vec<MediaFile>,
        passphrase: Option<&str>,
    ) -> Result<Vec<UploadResult>, DispatchError> {
        if files.is_empty() {
            return Err(DispatchError::NoFiles);
        }
        if files.iter().any(|file| !file.is_image()) {
            return Err(DispatchError::UnsupportedMedia);
        }

        let signer = self.resolve_signer(passphrase).await?;
        let template = self.media_host.auth_template(self.public_key);
        let auth = signer.sign_event(template).await?;

        let artifacts = self.media_host.upload(&files, &auth).await?;

        let mut results = Vec::with_capacity(files.len());
        for (file, artifact) in files.iter().zip(&artifacts) {
            match artifact.url.as_deref() {
                Some(url) if !url.is_empty() => results.push(UploadResult {
                    url: url.to_string(),
                }),
                _ => return Err(UploadError::MissingUrl(file.name.clone()).into()),
            }
        }
        // The host is trusted to answer in input order; a short answer
        // means the tail of the batch has no artifact.
        if results.len() < files.len() {
            let missing = &files[results.len()];
            return Err(UploadError::MissingUrl(missing.name.clone()).into());
        }

        tracing::debug!(
            target: "agora_signer::dispatcher",
            "uploaded {} file(s) for {}",
            results.len(),
            self.public_key
        );
        Ok(results)
    }

    async fn resolve_signer(
        &self,
        passphrase: Option<&str>,
    ) -> Result<Box<dyn EventSigner>, DispatchError> {
        match self.method {
            SignInMethod::PlainKey | SignInMethod::EncryptedKey => {
                let stored = self.stored_key.as_ref().ok_or(DispatchError::MissingKey)?;
                if self.method == SignInMethod::EncryptedKey {
                    let passphrase = passphrase.ok_or(DispatchError::InvalidPassphrase)?;
                    if !stored.valid_passphrase(passphrase).await {
                        return Err(DispatchError::InvalidPassphrase);
                    }
                }
                let keys = stored.unlock(passphrase).await.map_err(|e| match e {
                    StoredKeyError::PassphraseRequired | StoredKeyError::InvalidPassphrase => {
                        DispatchError::InvalidPassphrase
                    }
                    other => DispatchError::Signing(SignerError::Key(other.to_string())),
                })?;
                Ok(Box::new(LocalKeySigner::new(keys)))
            }
            SignInMethod::Extension => {
                let extension = self
                    .extension
                    .clone()
                    .ok_or(DispatchError::ExtensionUnavailable)?;
                Ok(Box::new(extension))
            }
            SignInMethod::Amber => {
                let (clipboard, window) = match (self.clipboard.clone(), self.window.clone()) {
                    (Some(clipboard), Some(window)) => (clipboard, window),
                    _ => return Err(DispatchError::HostUnavailable),
                };
                Ok(Box::new(AmberSigner::new(clipboard, window)))
            }
        }
    }
}
