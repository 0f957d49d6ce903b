//! Tool implementations.
//!
//! Every tool returns a human-readable string; errors are rendered here and
//! never cross the protocol boundary.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use tubeup_api::{Channel, VideoService};
use tubeup_auth::{AuthStatus, Authenticator};
use tubeup_common::{Error, PrivacyStatus, Result};
use tubeup_upload::{UploadConfig, UploadRequest, UploadResult, Uploader};

use crate::tools::{ListCategoriesRequest, SetupAuthRequest, UploadVideoRequest};

const QUOTA_NOTE: &str = "Note: The default Data API quota is 10,000 units per day. \
Each upload costs ~1,600 units.\nThis allows approximately 6 video uploads per day.";

/// Shared state behind the MCP tools.
pub struct YouTubeTools {
    auth: Arc<Authenticator>,
    service: Arc<dyn VideoService>,
    upload_config: UploadConfig,
}

impl YouTubeTools {
    pub fn new(auth: Arc<Authenticator>, service: Arc<dyn VideoService>, upload_config: UploadConfig) -> Self {
        Self {
            auth,
            service,
            upload_config,
        }
    }

    pub async fn upload_video(&self, req: UploadVideoRequest) -> String {
        match self.try_upload(req).await {
            Ok(UploadResult {
                success: true,
                video_id: Some(video_id),
                url: Some(url),
                ..
            }) => format!("Video uploaded successfully!\nVideo ID: {}\nURL: {}", video_id, url),
            Ok(result) => format!(
                "Upload failed: {}",
                result.error.unwrap_or_else(|| "unknown error".to_string())
            ),
            Err(e) => format!("Error uploading video: {}", e),
        }
    }

    async fn try_upload(&self, req: UploadVideoRequest) -> Result<UploadResult> {
        let privacy: PrivacyStatus = req.privacy_status.parse()?;
        let request = UploadRequest::new(&req.file_path, req.title)?
            .with_description(req.description)
            .with_keywords(&req.keywords)
            .with_category(req.category_id)?
            .with_privacy(privacy)
            .with_made_for_kids(req.made_for_kids);

        // Check before authenticating so a typo never opens the browser.
        if !Path::new(&req.file_path).is_file() {
            return Err(Error::FileNotFound(req.file_path));
        }

        let credential = self.auth.get_valid_credential().await?;
        let uploader = Uploader::new(self.service.clone(), self.upload_config.clone());
        let result = uploader.upload(&request, &credential).await?;
        if result.success {
            info!("Uploaded {}", request.file.display());
        } else {
            warn!("Upload of {} failed", request.file.display());
        }
        Ok(result)
    }

    pub async fn check_upload_quota(&self) -> String {
        match self.auth.probe_authentication(self.service.as_ref()).await {
            AuthStatus::Authenticated { channel: Some(channel) } => channel_status(&channel),
            AuthStatus::Authenticated { channel: None } => {
                "Authentication successful but no channel found.".to_string()
            }
            AuthStatus::NotAuthenticated { reason } => format!(
                "YouTube API Status:\n❌ Not authenticated: {}\nRun 'authorize_youtube_access' to sign in.",
                reason
            ),
        }
    }

    pub async fn list_video_categories(&self, req: ListCategoriesRequest) -> String {
        let categories = async {
            let credential = self.auth.get_valid_credential().await?;
            self.service.video_categories(&credential, &req.region_code).await
        };

        match categories.await {
            Ok(categories) => {
                let lines: Vec<String> = categories
                    .iter()
                    .filter(|c| c.snippet.assignable)
                    .map(|c| format!("ID: {} - {}", c.id, c.snippet.title))
                    .collect();
                format!("Available YouTube Categories:\n{}", lines.join("\n"))
            }
            Err(e) => format!("Error listing categories: {}", e),
        }
    }

    pub async fn authorize_youtube_access(&self) -> String {
        match self.auth.get_valid_credential().await {
            Ok(_) => format!(
                "✅ YouTube access authorized. Token saved to {}.",
                self.auth.store().token_path().display()
            ),
            Err(e) => format!("Authorization failed: {}", e),
        }
    }

    pub async fn setup_youtube_auth(&self, req: SetupAuthRequest) -> String {
        match self
            .auth
            .register_app_credential(&req.client_id, &req.client_secret, &req.project_id)
            .await
        {
            Ok(path) => format!(
                "Credentials saved to {}. Run 'authorize_youtube_access' or 'upload_video' to authenticate.",
                path.display()
            ),
            Err(e) => format!("Error setting up credentials: {}", e),
        }
    }
}

fn channel_status(channel: &Channel) -> String {
    format!(
        "YouTube API Status:\n✅ Authentication successful\nChannel: {}\nSubscribers: {}\nVideos: {}\n\n{}",
        channel.snippet.title,
        channel.subscriber_count().unwrap_or("Hidden"),
        channel.video_count().unwrap_or("Unknown"),
        QUOTA_NOTE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tubeup_api::{
        ChannelSnippet, ChannelStatistics, ChunkReply, MemoryVideoService, VideoCategory, VideoCategorySnippet,
    };
    use tubeup_auth::{AuthConfig, AuthorizationPrompt, AuthorizationRequest, UserToken};

    struct RefusingPrompt {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AuthorizationPrompt for RefusingPrompt {
        fn redirect_uri(&self) -> String {
            "http://localhost:8080/".to_string()
        }

        async fn authorize(&self, _request: &AuthorizationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::AuthorizationDenied("access_denied".to_string()))
        }
    }

    struct Fixture {
        dir: TempDir,
        prompt: Arc<RefusingPrompt>,
        service: Arc<MemoryVideoService>,
        tools: YouTubeTools,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = AuthConfig::default()
            .with_paths(dir.path().join("credentials.json"), dir.path().join("token.json"));
        let prompt = Arc::new(RefusingPrompt {
            calls: AtomicUsize::new(0),
        });
        let auth = Arc::new(Authenticator::with_prompt(config, prompt.clone()));
        let service = Arc::new(MemoryVideoService::new("abc123"));
        let tools = YouTubeTools::new(auth, service.clone(), UploadConfig::default());
        Fixture {
            dir,
            prompt,
            service,
            tools,
        }
    }

    async fn save_valid_token(fixture: &Fixture) {
        let token = UserToken {
            access_token: "ya29.valid".to_string(),
            refresh_token: Some("1//r".to_string()),
            token_uri: None,
            client_id: None,
            client_secret: None,
            scopes: AuthConfig::default().scopes.into_iter().collect(),
            expiry: Some(Utc::now() + Duration::hours(1)),
        };
        fixture.tools.auth.store().save_token(&token).await.unwrap();
    }

    fn upload_request(file_path: String) -> UploadVideoRequest {
        serde_json::from_value(serde_json::json!({
            "file_path": file_path,
            "title": "Demo",
            "keywords": "demo, test",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_upload_video_success() {
        let fixture = fixture();
        save_valid_token(&fixture).await;
        let path = fixture.dir.path().join("demo.mp4");
        std::fs::write(&path, vec![0u8; 1024]).unwrap();

        let text = fixture
            .tools
            .upload_video(upload_request(path.display().to_string()))
            .await;

        assert_eq!(
            text,
            "Video uploaded successfully!\nVideo ID: abc123\nURL: https://www.youtube.com/watch?v=abc123"
        );
    }

    #[tokio::test]
    async fn test_upload_video_missing_file_skips_auth() {
        let fixture = fixture();
        let missing = fixture.dir.path().join("missing.mp4").display().to_string();

        let text = fixture.tools.upload_video(upload_request(missing.clone())).await;

        assert_eq!(text, format!("Error uploading video: Video file not found: {}", missing));
        assert_eq!(fixture.prompt.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_video_rejects_bad_privacy() {
        let fixture = fixture();
        let mut req = upload_request("demo.mp4".to_string());
        req.privacy_status = "secret".to_string();

        let text = fixture.tools.upload_video(req).await;

        assert!(text.starts_with("Error uploading video: Invalid input"));
    }

    #[tokio::test]
    async fn test_upload_video_failure_message() {
        let fixture = fixture();
        save_valid_token(&fixture).await;
        let path = fixture.dir.path().join("demo.mp4");
        std::fs::write(&path, vec![0u8; 1024]).unwrap();
        fixture.service.script_chunks([ChunkReply::Status(403)]);

        let text = fixture
            .tools
            .upload_video(upload_request(path.display().to_string()))
            .await;

        assert!(text.starts_with("Upload failed: HTTP error 403"));
    }

    #[tokio::test]
    async fn test_check_upload_quota_authenticated() {
        let fixture = fixture();
        save_valid_token(&fixture).await;
        fixture.service.set_channels(vec![Channel {
            id: "UC1".to_string(),
            snippet: ChannelSnippet {
                title: "Demo Channel".to_string(),
            },
            statistics: Some(ChannelStatistics {
                subscriber_count: Some("10".to_string()),
                video_count: None,
                hidden_subscriber_count: true,
            }),
        }]);

        let text = fixture.tools.check_upload_quota().await;

        assert!(text.contains("✅ Authentication successful"));
        assert!(text.contains("Channel: Demo Channel"));
        assert!(text.contains("Subscribers: Hidden"));
        assert!(text.contains("Videos: Unknown"));
        assert!(text.contains("10,000 units per day"));
    }

    #[tokio::test]
    async fn test_check_upload_quota_without_token_never_prompts() {
        let fixture = fixture();

        let text = fixture.tools.check_upload_quota().await;

        assert!(text.contains("Not authenticated"));
        assert_eq!(fixture.prompt.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_video_categories_filters_assignable() {
        let fixture = fixture();
        save_valid_token(&fixture).await;
        let category = |id: &str, title: &str, assignable: bool| VideoCategory {
            id: id.to_string(),
            snippet: VideoCategorySnippet {
                title: title.to_string(),
                assignable,
            },
        };
        fixture.service.set_categories(vec![
            category("1", "Film & Animation", true),
            category("18", "Short Movies", false),
            category("22", "People & Blogs", true),
        ]);

        let text = fixture
            .tools
            .list_video_categories(ListCategoriesRequest {
                region_code: "GB".to_string(),
            })
            .await;

        assert_eq!(
            text,
            "Available YouTube Categories:\nID: 1 - Film & Animation\nID: 22 - People & Blogs"
        );
    }

    #[tokio::test]
    async fn test_authorize_without_app_credential() {
        let fixture = fixture();

        let text = fixture.tools.authorize_youtube_access().await;

        assert!(text.starts_with("Authorization failed: Missing app credential"));
        assert!(text.contains("setup_youtube_auth"));
    }

    #[tokio::test]
    async fn test_authorize_reports_denial() {
        let fixture = fixture();
        fixture
            .tools
            .setup_youtube_auth(SetupAuthRequest {
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
                project_id: "proj".to_string(),
            })
            .await;

        let text = fixture.tools.authorize_youtube_access().await;

        assert!(text.contains("Authorization denied"));
        assert_eq!(fixture.prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_setup_youtube_auth() {
        let fixture = fixture();

        let text = fixture
            .tools
            .setup_youtube_auth(SetupAuthRequest {
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
                project_id: "proj".to_string(),
            })
            .await;

        let path = fixture.dir.path().join("credentials.json");
        assert!(text.starts_with(&format!("Credentials saved to {}.", path.display())));

        let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved["installed"]["client_id"], "cid");
        assert_eq!(saved["installed"]["token_uri"], "https://oauth2.googleapis.com/token");
        assert_eq!(saved["installed"]["redirect_uris"], serde_json::json!(["http://localhost"]));
    }

    #[tokio::test]
    async fn test_setup_youtube_auth_rejects_empty_input() {
        let fixture = fixture();

        let text = fixture
            .tools
            .setup_youtube_auth(SetupAuthRequest {
                client_id: String::new(),
                client_secret: "secret".to_string(),
                project_id: "proj".to_string(),
            })
            .await;

        assert!(text.starts_with("Error setting up credentials:"));
    }
}
