//! Resumable, chunked video upload for tubeup.
//!
//! An [`UploadRequest`] describes one video; [`Uploader`] opens a resumable
//! session on a [`VideoService`](tubeup_api::VideoService) and drives it to a
//! terminal [`UploadResult`], retrying transient server errors with linear
//! backoff.

pub mod config;
pub mod request;
pub mod retry;
pub mod session;

pub use config::UploadConfig;
pub use request::{parse_keywords, UploadRequest, DEFAULT_CATEGORY_ID};
pub use retry::RetryPolicy;
pub use session::{UploadResult, UploadSession, Uploader};
