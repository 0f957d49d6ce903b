//! MCP server using rmcp SDK
//!
//! Exposes the tubeup tools over stdio.

use crate::handlers::YouTubeTools;
use crate::tools::*;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::future::Future;
use std::sync::Arc;

fn text_content(s: impl Into<String>) -> Content {
    Content {
        raw: RawContent::Text(RawTextContent { text: s.into() }),
        annotations: None,
    }
}

fn text_result(s: impl Into<String>) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![text_content(s)]))
}

#[derive(Clone)]
pub struct TubeupService {
    tools: Arc<YouTubeTools>,
    tool_router: ToolRouter<TubeupService>,
}

#[tool_router]
impl TubeupService {
    pub fn new(tools: YouTubeTools) -> Self {
        Self {
            tools: Arc::new(tools),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Upload a video to YouTube. Returns the video ID and URL on success.")]
    async fn upload_video(
        &self,
        Parameters(req): Parameters<UploadVideoRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        text_result(self.tools.upload_video(req).await)
    }

    #[tool(description = "Check YouTube authentication status, channel details and API quota limits")]
    async fn check_upload_quota(&self) -> Result<CallToolResult, ErrorData> {
        text_result(self.tools.check_upload_quota().await)
    }

    #[tool(description = "List assignable YouTube video categories for a region")]
    async fn list_video_categories(
        &self,
        Parameters(req): Parameters<ListCategoriesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        text_result(self.tools.list_video_categories(req).await)
    }

    #[tool(description = "Authorize access to the YouTube account, opening a browser if needed")]
    async fn authorize_youtube_access(&self) -> Result<CallToolResult, ErrorData> {
        text_result(self.tools.authorize_youtube_access().await)
    }

    #[tool(description = "Save OAuth2 client credentials from Google Cloud Console")]
    async fn setup_youtube_auth(
        &self,
        Parameters(req): Parameters<SetupAuthRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        text_result(self.tools.setup_youtube_auth(req).await)
    }
}

#[tool_handler]
impl ServerHandler for TubeupService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "tubeup-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "tubeup: upload videos to YouTube, check authentication and quota, list categories. \
                 Run setup_youtube_auth once with OAuth2 client credentials, then authorize_youtube_access."
                    .to_string(),
            ),
        }
    }
}
