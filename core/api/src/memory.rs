//! In-memory video service.
//!
//! Scripted stand-in for the Data API. Every call is recorded so callers can
//! assert on what reached the "network", and chunk replies can be queued to
//! reproduce transient failures, partial acknowledgements and odd responses.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use tubeup_common::{Credential, Error, Result};

use crate::models::{Channel, VideoCategory, VideoResource};
use crate::service::{ChunkOutcome, VideoService};

/// Scripted reply to one `upload_chunk` call.
#[derive(Debug, Clone)]
pub enum ChunkReply {
    /// Persist every byte sent; completes once the last byte lands.
    Accept,
    /// Persist only bytes `[0, n)` and ask for the rest.
    Acknowledge(u64),
    /// Fail with this HTTP status.
    Status(u16),
    /// Fail at the transport level.
    Disconnect,
    /// Finish with this body verbatim.
    Finish(serde_json::Value),
}

/// A call observed by the service.
#[derive(Debug, Clone)]
pub enum RecordedCall {
    StartSession {
        metadata: VideoResource,
        total_size: u64,
        mime_type: String,
    },
    Chunk {
        session_uri: String,
        offset: u64,
        len: u64,
        at: Instant,
    },
    Channels,
    Categories {
        region_code: String,
    },
}

#[derive(Default)]
struct State {
    session_failures: VecDeque<u16>,
    chunk_replies: VecDeque<ChunkReply>,
    channels: Vec<Channel>,
    channels_status: Option<u16>,
    categories: Vec<VideoCategory>,
    calls: Vec<RecordedCall>,
    sessions_opened: u32,
}

/// In-memory implementation of [`VideoService`].
pub struct MemoryVideoService {
    video_id: String,
    state: Mutex<State>,
}

impl MemoryVideoService {
    /// Create a service that accepts everything and assigns `video_id`.
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the recorded calls.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail the next session opening with `status`.
    pub fn fail_session_with(&self, status: u16) -> &Self {
        self.state().session_failures.push_back(status);
        self
    }

    /// Queue replies for the next chunk calls; afterwards chunks are accepted.
    pub fn script_chunks(&self, replies: impl IntoIterator<Item = ChunkReply>) -> &Self {
        self.state().chunk_replies.extend(replies);
        self
    }

    /// Channels returned by `my_channels`.
    pub fn set_channels(&self, channels: Vec<Channel>) -> &Self {
        self.state().channels = channels;
        self
    }

    /// Make `my_channels` fail with `status`.
    pub fn fail_channels_with(&self, status: u16) -> &Self {
        self.state().channels_status = Some(status);
        self
    }

    /// Categories returned by `video_categories`.
    pub fn set_categories(&self, categories: Vec<VideoCategory>) -> &Self {
        self.state().categories = categories;
        self
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of observed calls.
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// `(offset, len)` of every chunk call, in order.
    pub fn chunk_ranges(&self) -> Vec<(u64, u64)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Chunk { offset, len, .. } => Some((*offset, *len)),
                _ => None,
            })
            .collect()
    }

    /// Instants at which chunk calls arrived.
    pub fn chunk_instants(&self) -> Vec<Instant> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Chunk { at, .. } => Some(*at),
                _ => None,
            })
            .collect()
    }
}

impl Default for MemoryVideoService {
    fn default() -> Self {
        Self::new("memory-video")
    }
}

#[async_trait]
impl VideoService for MemoryVideoService {
    async fn start_upload_session(
        &self,
        _credential: &Credential,
        metadata: &VideoResource,
        total_size: u64,
        mime_type: &str,
    ) -> Result<String> {
        let mut state = self.state();
        state.calls.push(RecordedCall::StartSession {
            metadata: metadata.clone(),
            total_size,
            mime_type: mime_type.to_string(),
        });

        if let Some(status) = state.session_failures.pop_front() {
            return Err(Error::Http {
                status,
                message: "scripted session failure".to_string(),
            });
        }

        state.sessions_opened += 1;
        Ok(format!("memory://sessions/{}", state.sessions_opened))
    }

    async fn upload_chunk(
        &self,
        session_uri: &str,
        data: &[u8],
        offset: u64,
        total_size: u64,
    ) -> Result<ChunkOutcome> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Chunk {
            session_uri: session_uri.to_string(),
            offset,
            len: data.len() as u64,
            at: Instant::now(),
        });

        let reply = state.chunk_replies.pop_front().unwrap_or(ChunkReply::Accept);
        match reply {
            ChunkReply::Accept => {
                let end = offset + data.len() as u64;
                if end >= total_size {
                    Ok(ChunkOutcome::Complete(serde_json::json!({
                        "kind": "youtube#video",
                        "id": self.video_id,
                    })))
                } else {
                    Ok(ChunkOutcome::Incomplete { acknowledged: end })
                }
            }
            ChunkReply::Acknowledge(acknowledged) => Ok(ChunkOutcome::Incomplete { acknowledged }),
            ChunkReply::Status(status) => Err(Error::Http {
                status,
                message: "scripted failure".to_string(),
            }),
            ChunkReply::Disconnect => Err(Error::Network("connection reset by peer".to_string())),
            ChunkReply::Finish(body) => Ok(ChunkOutcome::Complete(body)),
        }
    }

    async fn my_channels(&self, _credential: &Credential) -> Result<Vec<Channel>> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Channels);

        match state.channels_status {
            Some(401) => Err(Error::Authentication("Invalid or expired token".to_string())),
            Some(status) => Err(Error::Http {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Ok(state.channels.clone()),
        }
    }

    async fn video_categories(
        &self,
        _credential: &Credential,
        region_code: &str,
    ) -> Result<Vec<VideoCategory>> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Categories {
            region_code: region_code.to_string(),
        });
        Ok(state.categories.clone())
    }
}
