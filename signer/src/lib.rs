// ABOUTME: Library interface for the Agora signing dispatcher
// ABOUTME: Exports the signing strategies, upload client, and profile service

pub mod amber;
pub mod dispatcher;
pub mod host;
pub mod profile;
pub mod signing;
pub mod upload;

// Re-export main types for convenience
pub use amber::{AmberSigner, RemoteSignRequest, POLL_INTERVAL, SIGNING_TIMEOUT};
pub use dispatcher::{DispatchError, UploadDispatcher};
pub use host::{ClipboardChannel, HostError, HostWindow};
pub use profile::{ProfileError, ProfileService};
pub use signing::{EventSigner, LocalKeySigner, SignerError};
pub use upload::{MediaArtifact, MediaFile, MediaHost, NostrBuildClient, UploadError, UploadResult};
