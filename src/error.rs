//! Error types for the client session layer.
//!
//! Most failures in this crate are deliberately *not* errors: pipeline aborts
//! drop a single line or event, protocol errors from the server are published
//! as events, and liveness timeouts close the connection. What remains is
//! small.

use thiserror::Error;

// ============================================================================
// Session errors
// ============================================================================

/// Errors returned synchronously by [`Session`](crate::Session) methods.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `connect` was called without options and none were retained from an
    /// earlier call.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl ClientError {
    /// Static code for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Returned by a middleware handler to stop the chain.
///
/// The line or event being processed is dropped; later traffic is
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pipeline aborted: {reason}")]
pub struct PipelineAbort {
    reason: String,
}

impl PipelineAbort {
    /// Abort with a reason that ends up in the log.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason given by the handler.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
