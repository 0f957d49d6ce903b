//! MCP tool request types with JSON Schema for AI parameter generation

use schemars::JsonSchema;
use serde::Deserialize;

fn default_category() -> String {
    "22".to_string()
}

fn default_privacy() -> String {
    "private".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UploadVideoRequest {
    #[schemars(description = "Path to the video file to upload")]
    pub file_path: String,
    #[schemars(description = "Title of the video")]
    pub title: String,
    #[schemars(description = "Description of the video")]
    #[serde(default)]
    pub description: String,
    #[schemars(description = "Comma-separated list of keywords/tags")]
    #[serde(default)]
    pub keywords: String,
    #[schemars(description = "YouTube category ID (default: 22 - People & Blogs)")]
    #[serde(default = "default_category")]
    pub category_id: String,
    #[schemars(description = "Privacy status: private, unlisted, or public")]
    #[serde(default = "default_privacy")]
    pub privacy_status: String,
    #[schemars(description = "Whether the video is made for kids")]
    #[serde(default)]
    pub made_for_kids: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCategoriesRequest {
    #[schemars(description = "ISO 3166-1 alpha-2 country code (default: US)")]
    #[serde(default = "default_region")]
    pub region_code: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetupAuthRequest {
    #[schemars(description = "OAuth2 client ID from Google Cloud Console")]
    pub client_id: String,
    #[schemars(description = "OAuth2 client secret")]
    pub client_secret: String,
    #[schemars(description = "Google Cloud project ID")]
    pub project_id: String,
}
