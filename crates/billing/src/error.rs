//! Error types for billing API operations.
//!
//! Errors are categorized to drive retry logic and to let the engine tell a
//! per-user rejection apart from a failed call.

use std::fmt;
use std::time::Duration;

/// Result type alias for billing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of billing errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, timeout or server-side failure (transient, retryable).
    Network,
    /// Primary or secondary rate limit (retryable after a wait).
    RateLimit,
    /// Token missing, expired or revoked.
    Auth,
    /// Token lacks the required enterprise role or scope.
    Permission,
    /// Enterprise, cost center or user not found.
    NotFound,
    /// Resource already exists.
    Conflict,
    /// Request understood but refused for its content.
    Rejected,
    /// Response body was not what the API documents.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::RateLimit => "GitHub API rate limit reached",
            Self::Auth => "Authentication failed",
            Self::Permission => "Permission denied",
            Self::NotFound => "Not found",
            Self::Conflict => "Already exists",
            Self::Rejected => "Request rejected",
            Self::Format => "Unexpected API response",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::RateLimit => "Wait for the rate limit window to reset, then re-run",
            Self::Auth => "Set a valid token in GITHUB_TOKEN or the config file",
            Self::Permission => {
                "The token needs the manage_billing:enterprise scope and an enterprise admin or billing manager role"
            }
            Self::NotFound => "Verify the enterprise slug and cost center ids",
            Self::Conflict => "No action needed - the resource already exists",
            Self::Rejected => "Check that the users belong to the enterprise",
            Self::Format => "The API may have changed; re-run with -vv for details",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur talking to the GitHub billing API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-success status without a more specific variant.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// Transport failure (DNS, connect, TLS, timeout).
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// Rate limit hit.
    #[error("rate limited{}", .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited {
        /// Wait requested by the server, if any.
        retry_after: Option<Duration>,
    },

    /// 401.
    #[error("authentication failed: {message}")]
    Unauthorized {
        /// Message from the response body.
        message: String,
    },

    /// 403 that is not a rate limit.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Message from the response body.
        message: String,
    },

    /// 404.
    #[error("not found: {message}")]
    NotFound {
        /// Message from the response body.
        message: String,
    },

    /// 409.
    #[error("conflict: {message}")]
    Conflict {
        /// Message from the response body.
        message: String,
    },

    /// Response could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Caller passed more users than one call accepts.
    #[error("cannot assign {size} users in one call (max {max})")]
    BatchTooLarge {
        /// Users in the batch.
        size: usize,
        /// Provider limit.
        max: usize,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Map a non-success status to an error.
    ///
    /// `retry_after` is only used for rate-limit statuses; a 403 with
    /// `rate_limit_exhausted` is GitHub's secondary rate limit.
    pub fn from_status(
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
        rate_limit_exhausted: bool,
    ) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized { message },
            403 if rate_limit_exhausted => Self::RateLimited { retry_after },
            403 => Self::PermissionDenied { message },
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            429 => Self::RateLimited { retry_after },
            _ => Self::Http { status, message },
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                500..=599 => ErrorCategory::Network,
                400 | 422 => ErrorCategory::Rejected,
                _ => ErrorCategory::Other,
            },
            Error::Network { .. } => ErrorCategory::Network,
            Error::RateLimited { .. } => ErrorCategory::RateLimit,
            Error::Unauthorized { .. } => ErrorCategory::Auth,
            Error::PermissionDenied { .. } => ErrorCategory::Permission,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::BatchTooLarge { .. } | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the provider refused the request's content rather than the call.
    ///
    /// For an assignment call this means the users in it were rejected.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Rejected | ErrorCategory::NotFound
        )
    }

    /// Wait requested by the server before retrying.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::from_status(code, format!("HTTP {code}"), None, false),
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Permission.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Rejected.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Permission.advice().is_empty());
        assert!(ErrorCategory::Permission.advice().contains("billing"));
        assert!(!ErrorCategory::Network.description().is_empty());
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            Error::from_status(401, "Bad credentials", None, false),
            Error::Unauthorized { .. }
        ));
        assert!(matches!(
            Error::from_status(403, "Must be an enterprise admin", None, false),
            Error::PermissionDenied { .. }
        ));
        assert!(matches!(
            Error::from_status(403, "secondary rate limit", None, true),
            Error::RateLimited { .. }
        ));
        assert!(matches!(
            Error::from_status(409, "exists", None, false),
            Error::Conflict { .. }
        ));
        assert!(matches!(
            Error::from_status(502, "Bad Gateway", None, false),
            Error::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(Error::http(503, "unavailable").is_retryable());
        assert!(!Error::http(422, "invalid users").is_retryable());
    }

    #[test]
    fn test_rejection() {
        assert!(Error::http(422, "Validation Failed").is_rejection());
        assert!(Error::http(400, "Bad Request").is_rejection());
        assert!(Error::from_status(404, "Not Found", None, false).is_rejection());
        assert!(!Error::from_status(401, "", None, false).is_rejection());
        assert!(!Error::http(500, "boom").is_rejection());
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::from_status(429, "", Some(Duration::from_secs(30)), false);
        assert_eq!(err.to_string(), "rate limited (retry after 30s)");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(
            Error::RateLimited { retry_after: None }.to_string(),
            "rate limited"
        );
    }

    #[test]
    fn test_batch_too_large_display() {
        let err = Error::BatchTooLarge { size: 51, max: 50 };
        assert!(err.to_string().contains("51"));
        assert_eq!(err.category(), ErrorCategory::Other);
    }

    #[test]
    fn test_from_serde_error() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("nope");
        let err: Error = parse.unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
