//! Authentication configuration.

use std::path::PathBuf;
use std::time::Duration;

use tubeup_common::{Error, Result};

/// Upload scope; enough for `videos.insert`.
pub const YOUTUBE_UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
/// Read-only scope; needed for `channels.list(mine=true)`.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_CALLBACK_HOST: &str = "localhost";
const DEFAULT_CALLBACK_PORT: u16 = 8080;
const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for OAuth2 authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// Client registration file (`{"installed": {...}}`).
    pub credentials_path: PathBuf,
    /// Cached user grant.
    pub token_path: PathBuf,
    /// Scopes requested during authorization.
    pub scopes: Vec<String>,
    /// Host of the local callback listener.
    pub callback_host: String,
    /// Port of the local callback listener.
    pub callback_port: u16,
    /// How long to wait for the browser to come back.
    pub callback_timeout: Duration,
    /// Try to launch the system browser on the authorization URL.
    pub open_browser: bool,
}

impl AuthConfig {
    /// Read overrides from the environment.
    ///
    /// - `TUBEUP_CREDENTIALS_FILE`
    /// - `TUBEUP_TOKEN_FILE`
    /// - `TUBEUP_CALLBACK_PORT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, starting from the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("TUBEUP_CREDENTIALS_FILE") {
            config.credentials_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TUBEUP_TOKEN_FILE") {
            config.token_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("TUBEUP_CALLBACK_PORT") {
            config.callback_port = port.trim().parse().map_err(|_| {
                Error::InvalidInput(format!("TUBEUP_CALLBACK_PORT is not a port: {}", port))
            })?;
        }

        Ok(config)
    }

    /// Point both files at other locations.
    pub fn with_paths(mut self, credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        self.credentials_path = credentials_path.into();
        self.token_path = token_path.into();
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            scopes: vec![
                YOUTUBE_UPLOAD_SCOPE.to_string(),
                YOUTUBE_READONLY_SCOPE.to_string(),
            ],
            callback_host: DEFAULT_CALLBACK_HOST.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            open_browser: true,
        }
    }
}
