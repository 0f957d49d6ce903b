//! Common utilities and types shared across tubeup crates.
//!
//! This module provides the error taxonomy and the small value types that
//! flow between the authenticator, the upload controller and the
//! invocation surfaces.

pub mod error;
pub mod types;

pub use error::{Error, Result, TRANSIENT_STATUSES};
pub use types::{Credential, PrivacyStatus, SensitiveString};
