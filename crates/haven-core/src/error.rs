//! Request-local error taxonomy shared by stores, the responder bridge, and the pipeline.

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors a single request can produce. Every variant is recoverable by the
/// caller: resubmit (Validation), fix the reference (NotFound), or retry the
/// whole request (Upstream). There is no fatal class.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed or empty input. The offending field is named in the message.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Reference to an identifier that is not in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Completion service failure. Network, non-2xx status, and malformed
    /// payloads all collapse to this one kind; the pipeline never retries.
    #[error("upstream completion failed: {0}")]
    Upstream(String),
}

impl CoreError {
    /// True when the error came from the external completion service.
    #[inline]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}
