//! OAuth2 code exchange and token refresh.

use chrono::{Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use tracing::debug;

use tubeup_common::{Error, Result};

use crate::credentials::{AppCredential, UserToken};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type TokenError = RequestTokenError<HttpClientError<oauth2::reqwest::Error>, BasicErrorResponse>;

/// Result of a refresh attempt the provider answered.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New access token issued.
    Refreshed(UserToken),
    /// The refresh token was revoked or expired (`invalid_grant`).
    Revoked(String),
}

/// OAuth2 client for one app registration.
pub struct OAuthClient {
    client: ConfiguredClient,
    http: oauth2::reqwest::Client,
    credential: AppCredential,
    scopes: Vec<String>,
}

impl OAuthClient {
    /// Create a client for `credential`.
    ///
    /// `redirect_uri` is only needed for the authorization-code flow.
    pub fn new(credential: &AppCredential, redirect_uri: Option<&str>, scopes: &[String]) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(credential.client_id.clone()))
            .set_client_secret(ClientSecret::new(credential.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(credential.auth_uri.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(credential.token_uri.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?,
            );

        if let Some(redirect_uri) = redirect_uri {
            client = client.set_redirect_uri(
                RedirectUrl::new(redirect_uri.to_string())
                    .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?,
            );
        }

        // Token endpoint redirects are never followed.
        let http = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            credential: credential.clone(),
            scopes: scopes.to_vec(),
        })
    }

    /// Generate the authorization URL for the user to visit.
    ///
    /// Returns the URL and a CSRF token that should be verified on callback.
    pub fn authorization_url(&self) -> (String, String) {
        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        (auth_url.to_string(), csrf_token.secret().clone())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// - `Authentication` if the provider rejects the code
    /// - `Network` on transport failure
    pub async fn exchange_code(&self, code: &str) -> Result<UserToken> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| map_token_error("Token exchange failed", e))?;

        debug!("Authorization code exchanged");
        Ok(self.user_token(&token_result, None))
    }

    /// Refresh an access token using the refresh token.
    ///
    /// The old refresh token is kept when the provider does not rotate it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome> {
        let result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await;

        match result {
            Ok(token_result) => Ok(RefreshOutcome::Refreshed(
                self.user_token(&token_result, Some(refresh_token)),
            )),
            Err(RequestTokenError::ServerResponse(response))
                if *response.error() == BasicErrorResponseType::InvalidGrant =>
            {
                Ok(RefreshOutcome::Revoked(response.to_string()))
            }
            Err(e) => Err(map_token_error("Token refresh failed", e)),
        }
    }

    fn user_token(&self, token_result: &BasicTokenResponse, previous_refresh: Option<&str>) -> UserToken {
        let expires_in = token_result
            .expires_in()
            .unwrap_or_else(|| std::time::Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECS));
        let expiry = Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1));

        let scopes = match token_result.scopes() {
            Some(granted) => granted.iter().map(|s| s.to_string()).collect(),
            None => self.scopes.iter().cloned().collect(),
        };

        UserToken {
            access_token: token_result.access_token().secret().clone(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous_refresh.map(str::to_string)),
            token_uri: Some(self.credential.token_uri.clone()),
            client_id: Some(self.credential.client_id.clone()),
            client_secret: Some(self.credential.client_secret.clone()),
            scopes,
            expiry: Some(expiry),
        }
    }
}

fn map_token_error(context: &str, err: TokenError) -> Error {
    match err {
        RequestTokenError::Request(e) => Error::Network(format!("{}: {}", context, e)),
        RequestTokenError::ServerResponse(response) => {
            Error::Authentication(format!("{}: {}", context, response))
        }
        other => Error::Authentication(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn scopes() -> Vec<String> {
        vec!["https://www.googleapis.com/auth/youtube.upload".to_string()]
    }

    fn credential_for(server: &mockito::Server) -> AppCredential {
        let mut credential = AppCredential::installed("test_id", "test_secret", "proj");
        credential.token_uri = format!("{}/token", server.url());
        credential
    }

    #[test]
    fn test_authorization_url_generation() {
        let credential = AppCredential::installed("test_id", "test_secret", "proj");
        let client = OAuthClient::new(&credential, Some("http://localhost:8080/"), &scopes()).unwrap();

        let (url, csrf_token) = client.authorization_url();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth"));
        assert!(url.contains("client_id=test_id"));
        assert!(url.contains("scope="));
        assert!(url.contains("youtube.upload"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2F"));
        assert!(url.contains(&format!("state={}", csrf_token)));
        assert!(!csrf_token.is_empty());
    }

    #[test]
    fn test_invalid_token_uri_rejected() {
        let mut credential = AppCredential::installed("id", "secret", "proj");
        credential.token_uri = "not a url".to_string();

        assert!(matches!(
            OAuthClient::new(&credential, None, &scopes()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "code-123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token": "ya29.new", "token_type": "Bearer", "expires_in": 3599,
                    "refresh_token": "1//r", "scope": "https://www.googleapis.com/auth/youtube.upload"}"#,
            )
            .create_async()
            .await;

        let client = OAuthClient::new(&credential_for(&server), Some("http://localhost:8080/"), &scopes()).unwrap();
        let token = client.exchange_code("code-123").await.unwrap();

        assert_eq!(token.access_token, "ya29.new");
        assert_eq!(token.refresh_token.as_deref(), Some("1//r"));
        assert!(token.scopes.contains("https://www.googleapis.com/auth/youtube.upload"));
        assert!(!token.is_expired());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.refreshed", "token_type": "Bearer", "expires_in": 3600}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&credential_for(&server), None, &scopes()).unwrap();
        let outcome = client.refresh("1//keep").await.unwrap();

        match outcome {
            RefreshOutcome::Refreshed(token) => {
                assert_eq!(token.access_token, "ya29.refreshed");
                assert_eq!(token.refresh_token.as_deref(), Some("1//keep"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant_is_revoked() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&credential_for(&server), None, &scopes()).unwrap();
        let outcome = client.refresh("1//stale").await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Revoked(_)));
    }

    #[tokio::test]
    async fn test_refresh_other_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&credential_for(&server), None, &scopes()).unwrap();
        let err = client.refresh("1//r").await.unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
    }
}
