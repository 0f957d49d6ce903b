//! Credential lifecycle: cached token, silent refresh, interactive grant.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use tubeup_api::{Channel, VideoService};
use tubeup_common::{Credential, Error, Result};

use crate::callback::{redirect_registered, AuthorizationPrompt, AuthorizationRequest, LocalServerPrompt};
use crate::config::AuthConfig;
use crate::credentials::{AppCredential, CredentialStore, UserToken};
use crate::oauth::{OAuthClient, RefreshOutcome};

/// Outcome of a read-only authentication check.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    NotAuthenticated { reason: String },
    Authenticated { channel: Option<Channel> },
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated { .. })
    }
}

/// Produces bearer credentials from the files named in [`AuthConfig`].
pub struct Authenticator {
    config: AuthConfig,
    store: CredentialStore,
    prompt: Arc<dyn AuthorizationPrompt>,
}

impl Authenticator {
    /// Create an authenticator using the browser and a localhost listener.
    pub fn new(config: AuthConfig) -> Self {
        let prompt = Arc::new(LocalServerPrompt::from_config(&config));
        Self::with_prompt(config, prompt)
    }

    /// Create an authenticator with a custom interactive step.
    pub fn with_prompt(config: AuthConfig, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        let store = CredentialStore::new(config.credentials_path.clone(), config.token_path.clone());
        Self { config, store, prompt }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a usable credential, refreshing or re-authorizing as needed.
    ///
    /// Order: cached token, silent refresh, interactive authorization. Any new
    /// token is persisted before it is returned.
    ///
    /// # Errors
    /// - `Serialization` if the token or credential file is corrupt
    /// - `MissingAppCredential` if authorization is needed and no app is registered
    /// - `RedirectMismatch`, `AuthorizationDenied`, `Authentication` from the grant
    /// - `Network` if the token endpoint is unreachable
    pub async fn get_valid_credential(&self) -> Result<Credential> {
        if let Some(token) = self.store.load_token().await? {
            if token.is_valid(&self.config.scopes) {
                debug!("Using cached token");
                return Ok(token.credential());
            }

            if !token.covers(&self.config.scopes) {
                info!("Cached token lacks required scopes, re-authorizing");
            } else if let Some(refresh_token) = token.refresh_token.as_deref() {
                if let Some(refreshed) = self.try_refresh(&token, refresh_token).await? {
                    self.store.save_token(&refreshed).await?;
                    info!("Access token refreshed");
                    return Ok(refreshed.credential());
                }
            }
        }

        let app = self.store.load_app_credential().await?;
        let token = self.authorize_interactively(&app).await?;
        self.store.save_token(&token).await?;
        info!("Authorization complete, token saved to {}", self.store.token_path().display());
        Ok(token.credential())
    }

    /// Refresh `token`; `None` when there is nothing to refresh with or the
    /// grant was revoked.
    async fn try_refresh(&self, token: &UserToken, refresh_token: &str) -> Result<Option<UserToken>> {
        let app = match self.store.load_app_credential().await {
            Ok(app) => Some(app),
            Err(Error::MissingAppCredential(_)) => AppCredential::from_token(token),
            Err(e) => return Err(e),
        };
        let Some(app) = app else {
            return Ok(None);
        };

        debug!("Refreshing expired access token");
        let client = OAuthClient::new(&app, None, &self.config.scopes)?;
        match client.refresh(refresh_token).await? {
            RefreshOutcome::Refreshed(refreshed) => Ok(Some(refreshed)),
            RefreshOutcome::Revoked(reason) => {
                warn!("Refresh token rejected, re-authorizing: {}", reason);
                Ok(None)
            }
        }
    }

    async fn authorize_interactively(&self, app: &AppCredential) -> Result<UserToken> {
        let redirect_uri = self.prompt.redirect_uri();
        if !redirect_registered(&redirect_uri, &app.redirect_uris) {
            return Err(Error::RedirectMismatch(format!(
                "{} is not among the redirect URIs registered for client {} ({})",
                redirect_uri,
                app.client_id,
                app.redirect_uris.join(", ")
            )));
        }

        let client = OAuthClient::new(app, Some(&redirect_uri), &self.config.scopes)?;
        let (url, state) = client.authorization_url();

        info!("Starting interactive authorization");
        let code = self
            .prompt
            .authorize(&AuthorizationRequest {
                url,
                state,
                redirect_uri,
            })
            .await?;

        client.exchange_code(&code).await
    }

    /// Register the OAuth client used for authorization.
    ///
    /// Writes Google's installed-app endpoints; makes no network call.
    pub async fn register_app_credential(
        &self,
        client_id: &str,
        client_secret: &str,
        project_id: &str,
    ) -> Result<PathBuf> {
        for (name, value) in [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("project_id", project_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("{} must not be empty", name)));
            }
        }

        let credential = AppCredential::installed(client_id.trim(), client_secret.trim(), project_id.trim());
        self.store.save_app_credential(&credential).await?;
        info!("App credential saved to {}", self.store.credentials_path().display());
        Ok(self.store.credentials_path().to_path_buf())
    }

    /// Report whether the cached token works, without refreshing or prompting.
    ///
    /// A usable token is confirmed with one `channels.list(mine=true)` call.
    pub async fn probe_authentication(&self, service: &dyn VideoService) -> AuthStatus {
        let token = match self.store.load_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                return AuthStatus::NotAuthenticated {
                    reason: "No cached token found".to_string(),
                }
            }
            Err(e) => {
                return AuthStatus::NotAuthenticated {
                    reason: e.to_string(),
                }
            }
        };

        if token.is_expired() {
            return AuthStatus::NotAuthenticated {
                reason: "Cached token has expired".to_string(),
            };
        }
        if !token.covers(&self.config.scopes) {
            return AuthStatus::NotAuthenticated {
                reason: "Cached token lacks required scopes".to_string(),
            };
        }

        match service.my_channels(&token.credential()).await {
            Ok(channels) => AuthStatus::Authenticated {
                channel: channels.into_iter().next(),
            },
            Err(e) => AuthStatus::NotAuthenticated {
                reason: e.to_string(),
            },
        }
    }
}
