//! Upload session controller.

use std::io::SeekFrom;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use tubeup_api::{watch_url, ChunkOutcome, VideoService};
use tubeup_common::{Credential, Error, Result};

use crate::config::UploadConfig;
use crate::request::UploadRequest;

/// Live state of one resumable upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Where chunks are sent.
    pub session_uri: String,
    /// Size of the file being uploaded.
    pub total_bytes: u64,
    /// Bytes the service has confirmed.
    pub acknowledged: u64,
    /// Consecutive retries since the last progress.
    pub retry_count: u32,
}

impl UploadSession {
    fn new(session_uri: String, total_bytes: u64) -> Self {
        Self {
            session_uri,
            total_bytes,
            acknowledged: 0,
            retry_count: 0,
        }
    }

    /// Percentage of bytes acknowledged.
    pub fn progress_percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 100;
        }
        self.acknowledged.saturating_mul(100) / self.total_bytes
    }
}

/// Terminal outcome of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    pub video_id: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl UploadResult {
    pub fn succeeded(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        Self {
            success: true,
            url: Some(watch_url(&video_id)),
            video_id: Some(video_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            video_id: None,
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Drives resumable uploads against a [`VideoService`].
pub struct Uploader<S: VideoService + ?Sized> {
    service: Arc<S>,
    config: UploadConfig,
}

impl<S: VideoService + ?Sized> Uploader<S> {
    pub fn new(service: Arc<S>, config: UploadConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload the file described by `request`.
    ///
    /// Failures after the file was found are reported in the returned
    /// [`UploadResult`], never as `Err`.
    ///
    /// # Errors
    /// - `FileNotFound` if the file does not exist; nothing is sent
    /// - `Io` if the file cannot be opened
    pub async fn upload(&self, request: &UploadRequest, credential: &Credential) -> Result<UploadResult> {
        let mut file = match File::open(&request.file).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(request.file.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let file_metadata = file.metadata().await?;
        if !file_metadata.is_file() {
            return Err(Error::FileNotFound(request.file.display().to_string()));
        }

        let total_bytes = file_metadata.len();
        let mime_type = request.mime_type();
        let metadata = request.metadata();
        info!(
            "Uploading {} ({} bytes, {})",
            request.file.display(),
            total_bytes,
            mime_type
        );

        let opened = self
            .config
            .retry
            .execute(|| {
                self.service
                    .start_upload_session(credential, &metadata, total_bytes, &mime_type)
            })
            .await;
        let session_uri = match opened {
            Ok(uri) => uri,
            Err(e) => return Ok(UploadResult::failed(e.to_string())),
        };
        debug!("Upload session opened: {}", session_uri);

        let mut session = UploadSession::new(session_uri, total_bytes);
        Ok(self.send_chunks(&mut file, &mut session).await)
    }

    async fn send_chunks(&self, file: &mut File, session: &mut UploadSession) -> UploadResult {
        let retry = &self.config.retry;

        loop {
            let chunk = match read_chunk(file, session.acknowledged, self.config.chunk_size).await {
                Ok(chunk) => chunk,
                Err(e) => return UploadResult::failed(format!("Failed to read video file: {}", e)),
            };

            let outcome = self
                .service
                .upload_chunk(&session.session_uri, &chunk, session.acknowledged, session.total_bytes)
                .await;

            let stalled = match outcome {
                Ok(ChunkOutcome::Complete(body)) => return finish(&body),
                Ok(ChunkOutcome::Incomplete { acknowledged }) => {
                    if acknowledged >= session.total_bytes {
                        return UploadResult::failed("Upload failed");
                    }
                    let progressed = acknowledged > session.acknowledged;
                    session.acknowledged = acknowledged;
                    if progressed {
                        session.retry_count = 0;
                        info!("Uploaded {}%", session.progress_percent());
                        continue;
                    }
                    format!("Upload made no progress at byte {}", acknowledged)
                }
                Err(e) if retry.is_retryable(&e) => e.to_string(),
                Err(e) => return UploadResult::failed(e.to_string()),
            };

            session.retry_count += 1;
            if session.retry_count > retry.max_retries {
                return UploadResult::failed(format!(
                    "Giving up after {} retries: {}",
                    retry.max_retries, stalled
                ));
            }

            let delay = retry.delay_for_retry(session.retry_count);
            warn!(
                "Retry {} of {} in {:?}: {}",
                session.retry_count, retry.max_retries, delay, stalled
            );
            sleep(delay).await;
        }
    }
}

/// Read up to `len` bytes starting at `offset`.
async fn read_chunk(file: &mut File, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset)).await?;
    let mut chunk = Vec::with_capacity(len);
    (&mut *file).take(len as u64).read_to_end(&mut chunk).await?;
    Ok(chunk)
}

fn finish(body: &serde_json::Value) -> UploadResult {
    match body.get("id").and_then(serde_json::Value::as_str) {
        Some(id) => {
            info!("Upload complete, video id {}", id);
            UploadResult::succeeded(id)
        }
        None => UploadResult::failed(
            Error::UnexpectedResponse(format!("upload finished without a video id: {}", body)).to_string(),
        ),
    }
}
