// ABOUTME: Profile metadata publishing and the in-memory profile cache
// ABOUTME: Builds kind-0 events from profile form content and broadcasts them

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use nostr_sdk::prelude::*;
use thiserror::Error;
use tokio::sync::RwLock;

use agora_core::types::profile::{ProfileContent, ProfileRecord};

use crate::dispatcher::{DispatchError, UploadDispatcher};

/// Relays profile updates are broadcast to.
pub const DEFAULT_RELAYS: [&str; 3] = [
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to encode profile content: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Signing error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Relay error: {0}")]
    Relay(#[from] nostr_sdk::client::Error),
}

/// Build the kind-0 metadata event carrying `content`.
pub fn profile_event(
    public_key: PublicKey,
    content: &ProfileContent,
) -> Result<UnsignedEvent, serde_json::Error> {
    let json = serde_json::to_string(content)?;
    Ok(UnsignedEvent::new(
        public_key,
        Timestamp::now(),
        Kind::Metadata,
        vec![],
        json,
    ))
}

/// Publishes profile updates and caches the latest profile seen per pubkey.
pub struct ProfileService {
    dispatcher: Arc<UploadDispatcher>,
    client: Client,
    profiles: RwLock<HashMap<PublicKey, ProfileRecord>>,
}

impl ProfileService {
    pub fn new(dispatcher: Arc<UploadDispatcher>) -> Self {
        Self {
            dispatcher,
            client: Client::default(),
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to the default relay set.
    pub async fn connect(&self) -> Result<(), ProfileError> {
        for relay in DEFAULT_RELAYS {
            self.client.add_relay(relay).await?;
        }
        self.client.connect().await;

        tracing::info!(target: "agora_signer::profile", "Connected to relays");
        Ok(())
    }

    /// Sign and broadcast `content` as the user's profile, then cache it.
    ///
    /// Signing follows the dispatcher's active sign-in method, so the same
    /// passphrase rules apply as for uploads.
    pub async fn publish(
        &self,
        content: &ProfileContent,
        passphrase: Option<&str>,
    ) -> Result<Event, ProfileError> {
        let unsigned = profile_event(self.dispatcher.public_key(), content)?;
        let event = self.dispatcher.sign_event(unsigned, passphrase).await?;
        self.client.send_event(event.clone()).await?;

        self.remember(
            self.dispatcher.public_key(),
            ProfileRecord {
                content: content.clone(),
                updated_at: Utc::now(),
            },
        )
        .await;

        tracing::debug!(
            target: "agora_signer::profile",
            "published profile for {}",
            self.dispatcher.public_key()
        );
        Ok(event)
    }

    /// Record a profile, either our own write or one observed from relays.
    pub async fn remember(&self, public_key: PublicKey, record: ProfileRecord) {
        self.profiles.write().await.insert(public_key, record);
    }

    /// Latest cached profile for `public_key`.
    pub async fn cached(&self, public_key: &PublicKey) -> Option<ProfileRecord> {
        self.profiles.read().await.get(public_key).cloned()
    }
}
