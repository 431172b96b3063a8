// ABOUTME: Remote signing over the Amber deep-link and clipboard handshake
// ABOUTME: Polls the shared clipboard for the signed event while racing a hard deadline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nostr_sdk::prelude::*;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{interval, sleep, Instant};
use uuid::Uuid;

use crate::host::{ClipboardChannel, HostError, HostWindow};
use crate::signing::{EventSigner, SignerError};

/// Deep-link scheme the Amber signer app registers for.
pub const SIGNER_SCHEME: &str = "nostrsigner";
/// How often the clipboard is checked for the signed event.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Hard deadline for the whole handshake.
pub const SIGNING_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum AmberError {
    #[error("Failed to encode signing request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("Amber signing timed out. Please try again.")]
    Timeout,
}

/// One in-flight handshake with the external signer app.
///
/// Created per signing call and dropped once the handshake resolves or
/// times out.
pub struct RemoteSignRequest {
    id: Uuid,
    uri: String,
    started_at: Instant,
    cancelled: AtomicBool,
}

impl RemoteSignRequest {
    /// Encode `unsigned` into an Amber deep link.
    pub fn new(unsigned: &UnsignedEvent) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(unsigned)?;
        let encoded = urlencoding::encode(&payload);
        let uri = format!(
            "{SIGNER_SCHEME}:{encoded}?compressionType=gzip&returnType=event&type=sign_event"
        );
        Ok(Self {
            id: Uuid::new_v4(),
            uri,
            started_at: Instant::now(),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Cooperatively stop the poller; the expired deadline is the only caller.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Signs events by handing them to the Amber app through a deep link and
/// waiting for the signed event to come back over the clipboard.
///
/// The clipboard is a process-wide single slot: concurrent signings through
/// this strategy race on it and must be serialized by the caller.
pub struct AmberSigner {
    clipboard: Arc<dyn ClipboardChannel>,
    window: Arc<dyn HostWindow>,
}

impl AmberSigner {
    pub fn new(clipboard: Arc<dyn ClipboardChannel>, window: Arc<dyn HostWindow>) -> Self {
        Self { clipboard, window }
    }

    async fn handshake(&self, unsigned: UnsignedEvent) -> Result<Event, AmberError> {
        let request = Arc::new(RemoteSignRequest::new(&unsigned)?);

        // Arm the channel before handing control to the signer app
        self.clipboard.write("").await?;
        self.window.open(request.uri()).await?;

        tracing::debug!(
            target: "agora_signer::amber",
            "request {} handed to signer app, polling clipboard",
            request.id
        );

        let (tx, rx) = oneshot::channel();
        tokio::spawn(poll_clipboard(
            self.clipboard.clone(),
            self.window.clone(),
            request.clone(),
            tx,
        ));

        // First resolution wins: either the poller delivers the signed
        // event or the deadline expires and cancels the poller.
        let outcome = tokio::select! {
            signed = rx => signed.ok(),
            _ = sleep(SIGNING_TIMEOUT) => None,
        };

        request.cancel();

        match outcome {
            Some(event) => {
                tracing::debug!(
                    target: "agora_signer::amber",
                    "request {} signed after {:?}",
                    request.id,
                    request.elapsed()
                );
                Ok(event)
            }
            None => {
                tracing::warn!(
                    target: "agora_signer::amber",
                    "request {} timed out after {:?}",
                    request.id,
                    request.elapsed()
                );
                Err(AmberError::Timeout)
            }
        }
    }
}

#[async_trait]
impl EventSigner for AmberSigner {
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.handshake(unsigned).await.map_err(|e| match e {
            AmberError::Timeout => SignerError::Timeout,
            other => SignerError::Remote(other.to_string()),
        })
    }
}

/// Check the clipboard once immediately and then every [`POLL_INTERVAL`]
/// until a signed event shows up or the request is cancelled.
async fn poll_clipboard(
    clipboard: Arc<dyn ClipboardChannel>,
    window: Arc<dyn HostWindow>,
    request: Arc<RemoteSignRequest>,
    tx: oneshot::Sender<Event>,
) {
    let mut ticker = interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if request.is_cancelled() {
            break;
        }
        // The signer app writes its result only after the user returns here
        if !window.has_focus() {
            tracing::debug!(
                target: "agora_signer::amber",
                "request {} waiting for window focus",
                request.id
            );
            continue;
        }
        let content = match clipboard.read().await {
            Ok(content) => content,
            Err(e) => {
                // Transient clipboard denial, treated as "no payload yet"
                tracing::warn!(
                    target: "agora_signer::amber",
                    "request {} clipboard read failed: {}",
                    request.id,
                    e
                );
                continue;
            }
        };
        if content.is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&content) {
            Ok(event) => {
                let _ = tx.send(event);
                break;
            }
            Err(e) => {
                tracing::warn!(
                    target: "agora_signer::amber",
                    "request {} clipboard content is not a signed event: {}",
                    request.id,
                    e
                );
            }
        }
    }
}
