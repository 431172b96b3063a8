// ABOUTME: Kind-0 profile metadata content and the client-side profile cache record
// ABOUTME: Field set mirrors the profile settings form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content of a kind-0 metadata event as the profile editor sees it.
///
/// Relays attach arbitrary extra fields to metadata events; those are
/// ignored on deserialize, and absent fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileContent {
    pub banner: String,
    pub picture: String,
    pub display_name: String,
    pub name: String,
    /// Nostr address (NIP-05)
    pub nip05: String,
    pub about: String,
    pub website: String,
    /// Lightning address
    pub lud16: String,
}

/// A profile as last seen by this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub content: ProfileContent,
    /// When this client last wrote or observed the profile
    pub updated_at: DateTime<Utc>,
}
