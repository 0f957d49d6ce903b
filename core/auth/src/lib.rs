//! OAuth2 credential lifecycle for tubeup.
//!
//! This module turns the on-disk client registration and user grant into a
//! usable bearer [`Credential`](tubeup_common::Credential):
//! - Credential store for the app credential and token JSON files
//! - OAuth2 code exchange and refresh against the provider's token endpoint
//! - One-shot localhost listener for the authorization callback
//! - Authenticator tying them together, plus a read-only status probe

pub mod authenticator;
pub mod callback;
pub mod config;
pub mod credentials;
pub mod oauth;

pub use authenticator::{AuthStatus, Authenticator};
pub use callback::{AuthorizationPrompt, AuthorizationRequest, LocalServerPrompt};
pub use config::AuthConfig;
pub use credentials::{AppCredential, CredentialStore, UserToken};
pub use oauth::{OAuthClient, RefreshOutcome};
