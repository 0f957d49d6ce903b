//! Video service abstraction.

use async_trait::async_trait;
use tubeup_common::{Credential, Result};

use crate::models::{Channel, VideoCategory, VideoResource};

/// Result of sending one chunk of a resumable upload.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// The service stored bytes `[0, acknowledged)` and wants the rest.
    Incomplete { acknowledged: u64 },
    /// The upload finished; the body is the created video resource.
    Complete(serde_json::Value),
}

/// Remote operations needed by the uploader and the status probes.
///
/// Implementations report HTTP failures as `Error::Http` with the real
/// status code and transport failures as `Error::Network`; they never retry.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Open a resumable upload session and return its session URI.
    ///
    /// # Errors
    /// - `Http` if the service rejects the metadata or the credential
    /// - `UnexpectedResponse` if no session URI is returned
    async fn start_upload_session(
        &self,
        credential: &Credential,
        metadata: &VideoResource,
        total_size: u64,
        mime_type: &str,
    ) -> Result<String>;

    /// Send `data`, which starts at byte `offset` of a `total_size` file.
    async fn upload_chunk(
        &self,
        session_uri: &str,
        data: &[u8],
        offset: u64,
        total_size: u64,
    ) -> Result<ChunkOutcome>;

    /// Channels owned by the credential's user.
    async fn my_channels(&self, credential: &Credential) -> Result<Vec<Channel>>;

    /// Video categories available in a region.
    async fn video_categories(
        &self,
        credential: &Credential,
        region_code: &str,
    ) -> Result<Vec<VideoCategory>>;
}
