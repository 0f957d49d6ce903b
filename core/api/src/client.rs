//! YouTube Data API client.

use async_trait::async_trait;
use reqwest::{header, redirect, Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use tubeup_common::{Credential, Error, Result};

use crate::models::{Channel, ListResponse, VideoCategory, VideoResource};
use crate::service::{ChunkOutcome, VideoService};

/// YouTube Data API base URL.
const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
/// YouTube upload API base URL.
const YOUTUBE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Status the upload endpoint uses for "Resume Incomplete".
const RESUME_INCOMPLETE: u16 = 308;

/// Base URLs of the Data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Metadata calls (`channels`, `videoCategories`).
    pub api_base: String,
    /// Media upload calls.
    pub upload_base: String,
}

impl ApiEndpoints {
    /// Endpoints laid out under an arbitrary root, as Google lays them out
    /// under `https://www.googleapis.com`.
    pub fn with_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            api_base: format!("{}/youtube/v3", root),
            upload_base: format!("{}/upload/youtube/v3", root),
        }
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            api_base: YOUTUBE_API_BASE.to_string(),
            upload_base: YOUTUBE_UPLOAD_BASE.to_string(),
        }
    }
}

/// YouTube Data API client.
pub struct YouTubeClient {
    http: Client,
    endpoints: ApiEndpoints,
}

impl YouTubeClient {
    /// Create a new client.
    ///
    /// Redirects are not followed: the upload endpoint answers 308 to mean
    /// "send more bytes", which must reach the caller.
    pub fn new(endpoints: ApiEndpoints) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("tubeup/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, endpoints })
    }

    /// Create with the public Google endpoints.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ApiEndpoints::default())
    }

    /// Configured endpoints.
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Handle API response with error checking.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::UnexpectedResponse(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(Error::Authentication(
                "Invalid or expired token".to_string(),
            ))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Http {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

#[async_trait]
impl VideoService for YouTubeClient {
    async fn start_upload_session(
        &self,
        credential: &Credential,
        metadata: &VideoResource,
        total_size: u64,
        mime_type: &str,
    ) -> Result<String> {
        let url = format!("{}/videos", self.endpoints.upload_base);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, credential.bearer())
            .header(header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .header("X-Upload-Content-Length", total_size.to_string())
            .header("X-Upload-Content-Type", mime_type)
            .query(&[("uploadType", "resumable"), ("part", metadata.parts())])
            .json(metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start resumable upload: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http {
                status,
                message: body,
            });
        }

        // Extract session URI from Location header
        let session_uri = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| Error::UnexpectedResponse("No upload session URI in response".to_string()))?
            .to_str()
            .map_err(|e| Error::UnexpectedResponse(format!("Invalid upload session URI: {}", e)))?
            .to_string();

        debug!("Opened upload session for {} bytes", total_size);

        Ok(session_uri)
    }

    async fn upload_chunk(
        &self,
        session_uri: &str,
        data: &[u8],
        offset: u64,
        total_size: u64,
    ) -> Result<ChunkOutcome> {
        let content_range = content_range(offset, data.len() as u64, total_size);

        let response = self
            .http
            .put(session_uri)
            .header(header::CONTENT_LENGTH, data.len().to_string())
            .header(header::CONTENT_RANGE, &content_range)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload chunk: {}", e)))?;

        let status = response.status();
        debug!("Chunk {} answered {}", content_range, status);

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| Error::UnexpectedResponse(format!("Failed to parse upload response: {}", e)))?;
            Ok(ChunkOutcome::Complete(body))
        } else if status.as_u16() == RESUME_INCOMPLETE {
            let acknowledged = response
                .headers()
                .get(header::RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range_header)
                .unwrap_or(0);
            Ok(ChunkOutcome::Incomplete { acknowledged })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Http {
                status: status.as_u16(),
                message: body,
            })
        }
    }

    async fn my_channels(&self, credential: &Credential) -> Result<Vec<Channel>> {
        let url = format!("{}/channels", self.endpoints.api_base);

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, credential.bearer())
            .query(&[("part", "snippet,statistics"), ("mine", "true")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list channels: {}", e)))?;

        let list: ListResponse<Channel> = self.handle_response(response).await?;
        Ok(list.items)
    }

    async fn video_categories(
        &self,
        credential: &Credential,
        region_code: &str,
    ) -> Result<Vec<VideoCategory>> {
        let url = format!("{}/videoCategories", self.endpoints.api_base);

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, credential.bearer())
            .query(&[("part", "snippet"), ("regionCode", region_code)])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list video categories: {}", e)))?;

        let list: ListResponse<VideoCategory> = self.handle_response(response).await?;
        Ok(list.items)
    }
}

/// `Content-Range` value for a chunk. An empty chunk only announces the size.
fn content_range(offset: u64, len: u64, total_size: u64) -> String {
    if len == 0 {
        format!("bytes */{}", total_size)
    } else {
        format!("bytes {}-{}/{}", offset, offset + len - 1, total_size)
    }
}

/// Parse a `Range: bytes=0-N` header into the count of persisted bytes.
pub fn parse_range_header(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes=")?;
    let (_, last) = range.split_once('-')?;
    last.trim().parse::<u64>().ok().map(|last| last + 1)
}
