//! Interactive authorization step.
//!
//! The authenticator only needs "given an authorization URL, give me a
//! code". [`LocalServerPrompt`] does that with the browser and a one-shot
//! localhost listener; tests substitute a scripted prompt.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use tubeup_common::{Error, Result};

use crate::config::AuthConfig;

const SUCCESS_HTML: &str =
    "<html><body><h1>Authentication successful</h1><p>You may close this window.</p></body></html>";
const ERROR_HTML: &str =
    "<html><body><h1>Authentication failed</h1><p>You may close this window and retry.</p></body></html>";
const NOT_FOUND_HTML: &str = "<html><body><h1>Not found</h1></body></html>";

/// How long a connection may stay silent before it is dropped.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a prompt needs to send the user to the consent page.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Consent page URL, including the state parameter.
    pub url: String,
    /// CSRF state the callback must echo.
    pub state: String,
    /// Redirect URI embedded in `url`.
    pub redirect_uri: String,
}

/// Capability that turns an authorization URL into an authorization code.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Redirect URI the provider must send the browser back to.
    fn redirect_uri(&self) -> String;

    /// Obtain the authorization code for `request`.
    ///
    /// # Errors
    /// - `AuthorizationDenied` if the user declines consent
    /// - `RedirectMismatch` if the provider rejects the redirect URI
    /// - `Authentication` for any other failure, including timeouts
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<String>;
}

/// Query parameters of an OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallbackPayload {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Browser plus one-shot localhost listener.
#[derive(Debug, Clone)]
pub struct LocalServerPrompt {
    host: String,
    port: u16,
    timeout: Duration,
    open_browser: bool,
}

impl LocalServerPrompt {
    /// Create a prompt listening on `host:port`.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            open_browser: true,
        }
    }

    /// Create from authentication configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.callback_host.clone(), config.callback_port, config.callback_timeout)
            .with_browser(config.open_browser)
    }

    /// Enable or disable launching the system browser.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Bind the callback port; `localhost` listens on both loopback families.
    async fn bind(&self) -> Result<CallbackListeners> {
        let hosts: Vec<&str> = if self.host == "localhost" {
            vec!["127.0.0.1", "::1"]
        } else {
            vec![self.host.as_str()]
        };

        let mut listeners = Vec::new();
        let mut bind_errors = Vec::new();
        for host in hosts {
            match TcpListener::bind((host, self.port)).await {
                Ok(listener) => listeners.push(listener),
                Err(e) => bind_errors.push(format!("{}:{} ({})", host, self.port, e)),
            }
        }

        let mut listeners = listeners.into_iter();
        let primary = listeners.next().ok_or_else(|| {
            Error::Authentication(format!(
                "Cannot listen for the OAuth callback: {}",
                bind_errors.join("; ")
            ))
        })?;
        if !bind_errors.is_empty() {
            debug!("Callback listener partially bound: {}", bind_errors.join("; "));
        }

        Ok(CallbackListeners {
            primary,
            secondary: listeners.next(),
        })
    }
}

/// One or two loopback listeners on the same port.
struct CallbackListeners {
    primary: TcpListener,
    secondary: Option<TcpListener>,
}

impl CallbackListeners {
    async fn accept(&self) -> std::io::Result<TcpStream> {
        let accepted = match &self.secondary {
            Some(secondary) => {
                tokio::select! {
                    result = self.primary.accept() => result,
                    result = secondary.accept() => result,
                }
            }
            None => self.primary.accept().await,
        };
        accepted.map(|(socket, _)| socket)
    }

    /// Accept connections until one carries a callback payload.
    ///
    /// Each connection is served on its own task so an idle one cannot hold
    /// up the browser's real request.
    async fn wait_for_callback(&self) -> Result<CallbackPayload> {
        let (tx, mut rx) = mpsc::channel(4);

        loop {
            tokio::select! {
                accepted = self.accept() => {
                    let socket = accepted.map_err(|e| {
                        Error::Authentication(format!("OAuth callback accept failed: {}", e))
                    })?;
                    tokio::spawn(serve_connection(socket, tx.clone()));
                }
                Some(payload) = rx.recv() => return Ok(payload),
            }
        }
    }
}

/// Answer one callback connection, forwarding its payload if it has one.
async fn serve_connection(mut socket: TcpStream, payloads: mpsc::Sender<CallbackPayload>) {
    let read = tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_target(&mut socket));
    let target = match read.await {
        Ok(Ok(target)) => target,
        Ok(Err(e)) => {
            warn!("Ignoring malformed callback request: {}", e);
            respond(&mut socket, "400 Bad Request", ERROR_HTML).await;
            return;
        }
        Err(_) => {
            debug!("Dropping idle callback connection");
            return;
        }
    };

    // Browsers also ask for /favicon.ico and the like.
    match parse_callback_target(&target) {
        Some(payload) => {
            let (status, body) = if payload.error.is_some() {
                ("400 Bad Request", ERROR_HTML)
            } else {
                ("200 OK", SUCCESS_HTML)
            };
            respond(&mut socket, status, body).await;
            let _ = payloads.send(payload).await;
        }
        None => respond(&mut socket, "404 Not Found", NOT_FOUND_HTML).await,
    }
}

#[async_trait]
impl AuthorizationPrompt for LocalServerPrompt {
    fn redirect_uri(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    async fn authorize(&self, request: &AuthorizationRequest) -> Result<String> {
        let listeners = self.bind().await?;

        // stdout may be a protocol channel; instructions go to stderr.
        eprintln!(
            "Please visit this URL to authorize tubeup:\n\n    {}\n",
            request.url
        );
        if self.open_browser {
            if let Err(e) = open::that(&request.url) {
                warn!("Could not open a browser: {}", e);
            }
        }

        info!("Waiting for the OAuth callback on {}", self.redirect_uri());
        let payload = tokio::time::timeout(self.timeout, listeners.wait_for_callback())
            .await
            .map_err(|_| {
                Error::Authentication(format!(
                    "Timed out after {:?} waiting for the OAuth callback",
                    self.timeout
                ))
            })??;

        code_from_payload(payload, &request.state)
    }
}

async fn read_request_target(socket: &mut TcpStream) -> Result<String> {
    let mut buffer = vec![0u8; 8192];
    let size = socket.read(&mut buffer).await?;
    if size == 0 {
        return Err(Error::Authentication("OAuth callback request is empty".to_string()));
    }

    let request = String::from_utf8_lossy(&buffer[..size]);
    let first = request
        .lines()
        .next()
        .ok_or_else(|| Error::Authentication("OAuth callback malformed request".to_string()))?;
    let mut parts = first.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    if method != "GET" || target.is_empty() {
        return Err(Error::Authentication("OAuth callback must be GET".to_string()));
    }
    Ok(target.to_string())
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Extract the callback payload from a request target, `None` if the
/// request carries neither a code nor an error.
pub(crate) fn parse_callback_target(target: &str) -> Option<CallbackPayload> {
    let url = Url::parse(&format!("http://localhost{}", target)).ok()?;

    let mut payload = CallbackPayload {
        code: None,
        state: None,
        error: None,
        error_description: None,
    };

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => payload.code = Some(value.to_string()),
            "state" => payload.state = Some(value.to_string()),
            "error" => payload.error = Some(value.to_string()),
            "error_description" => payload.error_description = Some(value.to_string()),
            _ => {}
        }
    }

    if payload.code.is_none() && payload.error.is_none() {
        return None;
    }
    Some(payload)
}

/// Turn a callback payload into a code, mapping provider errors.
pub(crate) fn code_from_payload(payload: CallbackPayload, expected_state: &str) -> Result<String> {
    if let Some(error) = payload.error {
        let detail = payload
            .error_description
            .map(|d| format!("{} ({})", error, d))
            .unwrap_or_else(|| error.clone());
        return Err(match error.as_str() {
            "access_denied" => Error::AuthorizationDenied(detail),
            "redirect_uri_mismatch" => Error::RedirectMismatch(detail),
            _ => Error::Authentication(format!("Provider returned an error: {}", detail)),
        });
    }

    if payload.state.as_deref() != Some(expected_state) {
        return Err(Error::Authentication("OAuth callback state mismatch".to_string()));
    }

    payload
        .code
        .ok_or_else(|| Error::Authentication("OAuth callback missing code".to_string()))
}

/// Check `redirect_uri` against the URIs registered for the client.
///
/// A registered URI without a port accepts any port on the same host, and a
/// registered root path accepts any path.
pub fn redirect_registered(redirect_uri: &str, registered: &[String]) -> bool {
    let Ok(candidate) = Url::parse(redirect_uri) else {
        return false;
    };

    registered
        .iter()
        .filter_map(|uri| Url::parse(uri).ok())
        .any(|allowed| {
            allowed.scheme() == candidate.scheme()
                && allowed.host_str() == candidate.host_str()
                && (allowed.port().is_none() || allowed.port() == candidate.port())
                && (allowed.path() == "/" || allowed.path() == candidate.path())
        })
}
