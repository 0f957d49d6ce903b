//! Description of one video to upload.

use std::path::{Path, PathBuf};

use tubeup_api::{VideoResource, VideoSnippet, VideoStatus};
use tubeup_common::{Error, PrivacyStatus, Result};

/// Category "People & Blogs".
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// MIME type sent when the extension is unknown.
const FALLBACK_MIME_TYPE: &str = "video/*";

/// Split a comma-separated keyword list into tags.
///
/// Segments are trimmed and empty ones dropped; order is preserved.
pub fn parse_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// A single upload invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: PrivacyStatus,
    pub made_for_kids: bool,
}

impl UploadRequest {
    /// Create a private, not-for-kids request in the default category.
    ///
    /// # Errors
    /// - `InvalidInput` if the title is blank
    pub fn new(file: impl Into<PathBuf>, title: impl Into<String>) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".to_string()));
        }

        Ok(Self {
            file: file.into(),
            title,
            description: String::new(),
            tags: Vec::new(),
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            privacy_status: PrivacyStatus::default(),
            made_for_kids: false,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set tags from a comma-separated keyword list.
    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.tags = parse_keywords(keywords);
        self
    }

    /// Set the category.
    ///
    /// # Errors
    /// - `InvalidInput` if the id is blank
    pub fn with_category(mut self, category_id: impl Into<String>) -> Result<Self> {
        let category_id = category_id.into();
        if category_id.trim().is_empty() {
            return Err(Error::InvalidInput("Category id must not be empty".to_string()));
        }
        self.category_id = category_id.trim().to_string();
        Ok(self)
    }

    pub fn with_privacy(mut self, privacy_status: PrivacyStatus) -> Self {
        self.privacy_status = privacy_status;
        self
    }

    pub fn with_made_for_kids(mut self, made_for_kids: bool) -> Self {
        self.made_for_kids = made_for_kids;
        self
    }

    /// MIME type guessed from the file name.
    pub fn mime_type(&self) -> String {
        mime_type_for(&self.file)
    }

    /// Metadata body for the upload session.
    pub fn metadata(&self) -> VideoResource {
        VideoResource {
            snippet: VideoSnippet {
                title: self.title.clone(),
                description: self.description.clone(),
                tags: self.tags.clone(),
                category_id: self.category_id.clone(),
            },
            status: VideoStatus {
                privacy_status: self.privacy_status,
                self_declared_made_for_kids: self.made_for_kids,
            },
        }
    }
}

fn mime_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string()
}
