// ABOUTME: Traits for the ambient host capabilities the signing strategies need
// ABOUTME: Clipboard channel plus window focus and deep-link opening, injected for testability

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Clipboard access failed: {0}")]
    Clipboard(String),
    #[error("Failed to open deep link: {0}")]
    OpenUri(String),
}

/// Single-slot text channel shared with external applications.
///
/// The Amber handshake arms it by writing an empty string and consumes the
/// first non-empty value it reads back.
#[async_trait]
pub trait ClipboardChannel: Send + Sync {
    async fn write(&self, text: &str) -> Result<(), HostError>;
    async fn read(&self) -> Result<String, HostError>;
}

/// The window hosting the client.
#[async_trait]
pub trait HostWindow: Send + Sync {
    /// Whether the window currently has user focus. Signer apps only write
    /// their result to the clipboard once the user has switched back here.
    fn has_focus(&self) -> bool;

    /// Open a URI in the host environment, handing control to whatever
    /// application is registered for its scheme.
    async fn open(&self, uri: &str) -> Result<(), HostError>;
}
