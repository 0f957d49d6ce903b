//! Upload configuration.

use crate::retry::RetryPolicy;

/// Resumable uploads must send chunks in multiples of this size.
pub const CHUNK_GRANULARITY: usize = 256 * 1024;

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Configuration for the upload loop.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    /// Bytes sent per request; always a multiple of [`CHUNK_GRANULARITY`].
    pub chunk_size: usize,
    /// Retry behavior for session opening and chunk requests.
    pub retry: RetryPolicy,
}

impl UploadConfig {
    /// Set the chunk size, rounded up to the chunk granularity.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        let granules = chunk_size.div_ceil(CHUNK_GRANULARITY).max(1);
        self.chunk_size = granules * CHUNK_GRANULARITY;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}
