//! Common types used throughout tubeup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Visibility of an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl PrivacyStatus {
    /// Wire representation expected by the Data API.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Public => "public",
        }
    }
}

impl FromStr for PrivacyStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(PrivacyStatus::Private),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            "public" => Ok(PrivacyStatus::Public),
            other => Err(crate::Error::InvalidInput(format!(
                "Invalid privacy status '{}'. Use: private, unlisted, or public",
                other
            ))),
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret string wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveString(String);

impl SensitiveString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED; {} chars])", self.0.len())
    }
}

/// A bearer credential ready to authorize API calls.
///
/// Produced by the authenticator from a valid user token. The access token
/// never shows up in debug output.
#[derive(Debug, Clone)]
pub struct Credential {
    access_token: SensitiveString,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a credential from an access token.
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: SensitiveString::new(access_token),
            expires_at,
        }
    }

    /// Raw access token.
    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }

    /// When the access token stops being accepted, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}
