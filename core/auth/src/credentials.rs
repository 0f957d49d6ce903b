//! On-disk app credential and user token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use tubeup_common::{Credential, Error, Result};

/// OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
/// OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Provider certificate listing.
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";
/// Redirect registered for installed apps; any loopback port is accepted.
pub const INSTALLED_REDIRECT_URI: &str = "http://localhost";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// OAuth client registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredential {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_certs_url")]
    pub auth_provider_x509_cert_url: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

fn default_certs_url() -> String {
    GOOGLE_CERTS_URL.to_string()
}

impl AppCredential {
    /// Registration of an installed (desktop) app with Google's endpoints.
    pub fn installed(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            project_id: project_id.into(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            auth_provider_x509_cert_url: default_certs_url(),
            redirect_uris: vec![INSTALLED_REDIRECT_URI.to_string()],
        }
    }

    /// Client fields a token file may carry, usable for refresh only.
    pub fn from_token(token: &UserToken) -> Option<Self> {
        let client_id = token.client_id.clone()?;
        let client_secret = token.client_secret.clone()?;
        let mut credential = Self::installed(client_id, client_secret, "");
        if let Some(token_uri) = &token.token_uri {
            credential.token_uri = token_uri.clone();
        }
        Some(credential)
    }
}

impl fmt::Debug for AppCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}

/// Layout of the file downloaded from the cloud console.
#[derive(Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    installed: Option<AppCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    web: Option<AppCredential>,
}

/// User grant in the provider's authorized-user format.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    /// Access token for API requests.
    #[serde(rename = "token", alias = "access_token")]
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Scopes the grant covers.
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    /// When the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl UserToken {
    /// Check if the access token is expired or about to expire.
    ///
    /// A token without an expiry never expires.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry < Utc::now() + Duration::minutes(EXPIRY_SKEW_MINUTES),
            None => false,
        }
    }

    /// Check whether every required scope was granted.
    ///
    /// An empty scope set means the file did not record scopes.
    pub fn covers(&self, required: &[String]) -> bool {
        self.scopes.is_empty() || required.iter().all(|s| self.scopes.contains(s))
    }

    /// Usable without any network round trip.
    pub fn is_valid(&self, required: &[String]) -> bool {
        !self.access_token.is_empty() && !self.is_expired() && self.covers(required)
    }

    /// Bearer credential for API calls.
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone(), self.expiry)
    }
}

impl fmt::Debug for UserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserToken")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Reads and writes the two credential files.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl CredentialStore {
    /// Create a store over the given file locations.
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Whether an app credential file is present.
    pub async fn has_app_credential(&self) -> bool {
        fs::try_exists(&self.credentials_path).await.unwrap_or(false)
    }

    /// Load the app credential.
    ///
    /// # Errors
    /// - `MissingAppCredential` if the file is absent or holds no client
    /// - `Serialization` if the file is not valid JSON
    pub async fn load_app_credential(&self) -> Result<AppCredential> {
        let data = match fs::read(&self.credentials_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingAppCredential(format!(
                    "{} not found. Download OAuth2 credentials from Google Cloud Console \
                     or run setup_youtube_auth first",
                    self.credentials_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let file: CredentialFile = serde_json::from_slice(&data).map_err(|e| {
            Error::Serialization(format!(
                "Invalid credential file {}: {}",
                self.credentials_path.display(),
                e
            ))
        })?;

        file.installed.or(file.web).ok_or_else(|| {
            Error::MissingAppCredential(format!(
                "{} has no 'installed' or 'web' client",
                self.credentials_path.display()
            ))
        })
    }

    /// Write the app credential under the `installed` key.
    pub async fn save_app_credential(&self, credential: &AppCredential) -> Result<()> {
        let file = CredentialFile {
            installed: Some(credential.clone()),
            web: None,
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| Error::Serialization(format!("Failed to serialize credentials: {}", e)))?;

        write_atomic(&self.credentials_path, &json).await?;
        debug!("Wrote app credential to {}", self.credentials_path.display());
        Ok(())
    }

    /// Load the cached token, `None` if there is none.
    pub async fn load_token(&self) -> Result<Option<UserToken>> {
        let data = match fs::read(&self.token_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map(Some).map_err(|e| {
            Error::Serialization(format!(
                "Invalid token file {}: {}",
                self.token_path.display(),
                e
            ))
        })
    }

    /// Persist the token, replacing any previous one.
    pub async fn save_token(&self, token: &UserToken) -> Result<()> {
        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| Error::Serialization(format!("Failed to serialize token: {}", e)))?;

        write_atomic(&self.token_path, &json).await?;
        debug!("Wrote token to {}", self.token_path.display());
        Ok(())
    }
}

/// Write through a sibling temp file and rename it over the target.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.json"), dir.path().join("token.json"))
    }

    fn token(expiry: Option<DateTime<Utc>>) -> UserToken {
        UserToken {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: None,
            client_id: None,
            client_secret: None,
            scopes: BTreeSet::new(),
            expiry,
        }
    }

    #[tokio::test]
    async fn test_app_credential_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .save_app_credential(&AppCredential::installed("id-1", "secret-1", "proj-1"))
            .await
            .unwrap();
        let loaded = store.load_app_credential().await.unwrap();

        assert_eq!(loaded.client_id, "id-1");
        assert_eq!(loaded.client_secret, "secret-1");
        assert_eq!(loaded.project_id, "proj-1");
        assert_eq!(loaded.auth_uri, GOOGLE_AUTH_URI);
        assert_eq!(loaded.token_uri, GOOGLE_TOKEN_URI);
        assert_eq!(loaded.auth_provider_x509_cert_url, GOOGLE_CERTS_URL);
        assert_eq!(loaded.redirect_uris, vec!["http://localhost".to_string()]);
    }

    #[tokio::test]
    async fn test_app_credential_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .save_app_credential(&AppCredential::installed("id", "secret", "proj"))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.credentials_path()).unwrap()).unwrap();
        assert_eq!(raw["installed"]["client_id"], "id");
        assert_eq!(raw["installed"]["auth_uri"], GOOGLE_AUTH_URI);
        assert!(raw.get("web").is_none());
    }

    #[tokio::test]
    async fn test_missing_app_credential() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).load_app_credential().await.unwrap_err();
        assert!(matches!(err, Error::MissingAppCredential(_)));
        assert!(err.to_string().contains("setup_youtube_auth"));
    }

    #[tokio::test]
    async fn test_web_client_accepted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(
            store.credentials_path(),
            r#"{"web": {"client_id": "w", "client_secret": "s", "redirect_uris": ["http://localhost:8080/"]}}"#,
        )
        .unwrap();

        let loaded = store.load_app_credential().await.unwrap();
        assert_eq!(loaded.client_id, "w");
        assert_eq!(loaded.token_uri, GOOGLE_TOKEN_URI);
    }

    #[tokio::test]
    async fn test_credential_file_without_client() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.credentials_path(), "{}").unwrap();

        let err = store.load_app_credential().await.unwrap_err();
        assert!(matches!(err, Error::MissingAppCredential(_)));
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.load_token().await.unwrap().is_none());

        let mut saved = token(Some(Utc::now() + Duration::hours(1)));
        saved.scopes.insert("scope-a".to_string());
        store.save_token(&saved).await.unwrap();

        let loaded = store.load_token().await.unwrap().unwrap();
        assert_eq!(loaded, saved);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_token_written_in_authorized_user_format() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save_token(&token(None)).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.token_path()).unwrap()).unwrap();
        assert_eq!(raw["token"], "ya29.access");
        assert_eq!(raw["refresh_token"], "1//refresh");
    }

    #[tokio::test]
    async fn test_token_file_from_other_tools() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(
            store.token_path(),
            r#"{"token": "ya29.a", "refresh_token": "1//r", "token_uri": "https://oauth2.googleapis.com/token",
                "client_id": "cid", "client_secret": "cs",
                "scopes": ["https://www.googleapis.com/auth/youtube.upload"],
                "expiry": "2030-01-01T00:00:00.123456Z"}"#,
        )
        .unwrap();

        let loaded = store.load_token().await.unwrap().unwrap();
        assert_eq!(loaded.client_id.as_deref(), Some("cid"));
        assert!(!loaded.is_expired());

        let fallback = AppCredential::from_token(&loaded).unwrap();
        assert_eq!(fallback.client_secret, "cs");
    }

    #[tokio::test]
    async fn test_corrupt_token_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.token_path(), "not json").unwrap();

        assert!(matches!(store.load_token().await, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_token_expiration() {
        assert!(token(Some(Utc::now() - Duration::hours(1))).is_expired());
        assert!(!token(Some(Utc::now() + Duration::hours(1))).is_expired());
        assert!(!token(None).is_expired());
    }

    #[test]
    fn test_token_near_expiration() {
        // Token expiring in 4 minutes should be considered expired (5 min buffer)
        assert!(token(Some(Utc::now() + Duration::minutes(4))).is_expired());
    }

    #[test]
    fn test_token_scope_coverage() {
        let required = vec!["a".to_string(), "b".to_string()];
        let mut t = token(None);
        assert!(t.covers(&required));

        t.scopes.insert("a".to_string());
        assert!(!t.covers(&required));
        assert!(!t.is_valid(&required));

        t.scopes.insert("b".to_string());
        assert!(t.is_valid(&required));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", token(None));
        assert!(!debug.contains("ya29"));

        let debug = format!("{:?}", AppCredential::installed("id", "hunter2", "p"));
        assert!(!debug.contains("hunter2"));
    }
}
