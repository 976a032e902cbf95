//! Error types for assignment runs.
//!
//! Phase-level errors (configuration, upstream, creation, abort) stop a run
//! before any assignment is submitted. Per-user rejections never propagate;
//! they are recorded as outcomes instead.

use crate::types::Role;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for assignment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed collaborator failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Categories of run errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Cost center cannot be resolved from configuration.
    Configuration,
    /// Seat listing failed.
    Upstream,
    /// Cost center auto-creation was denied or failed.
    Creation,
    /// A single user was rejected by the provider.
    Assignment,
    /// Watermark could not be read or written.
    Persistence,
    /// Apply was not confirmed.
    Aborted,
}

impl ErrorCategory {
    /// Whether an error of this category ends the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Assignment | Self::Persistence)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration problem",
            Self::Upstream => "Could not list Copilot seats",
            Self::Creation => "Could not create cost center",
            Self::Assignment => "User assignment rejected",
            Self::Persistence => "Watermark storage problem",
            Self::Aborted => "Aborted by user",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "Set real cost center ids in the config, or enable auto-creation with --create-cost-centers"
            }
            Self::Upstream => "Check the token's enterprise billing scopes and your network, then retry",
            Self::Creation => "The token needs enterprise admin / billing manager rights to create cost centers",
            Self::Assignment => "Re-run later; already assigned users are a no-op",
            Self::Persistence => "Check permissions on the state directory",
            Self::Aborted => "Pass --yes or confirm the prompt to apply",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during an assignment run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cost center for a role could not be resolved.
    #[error("cost center not resolvable for {role}: {message}")]
    Configuration {
        /// Role that failed to resolve.
        role: Role,
        /// What was missing.
        message: String,
    },

    /// Seat source failed.
    #[error("failed to list Copilot seats: {source}")]
    Upstream {
        /// Collaborator error.
        #[source]
        source: BoxError,
    },

    /// Cost center lookup or creation failed.
    #[error("failed to create cost center '{name}': {source}")]
    Creation {
        /// Display name of the cost center.
        name: String,
        /// Collaborator error.
        #[source]
        source: BoxError,
    },

    /// Provider rejected a single user.
    #[error("assignment of {username} to {cost_center} rejected: {message}")]
    Assignment {
        /// Rejected user.
        username: String,
        /// Target cost center id.
        cost_center: String,
        /// Provider message.
        message: String,
    },

    /// Watermark file could not be read or written.
    #[error("watermark I/O error at {path}: {source}")]
    Persistence {
        /// Watermark path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Watermark file exists but is not valid.
    #[error("invalid watermark file {path}: {source}")]
    PersistenceFormat {
        /// Watermark path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Apply mode was not confirmed.
    #[error("aborted by user before applying assignments")]
    AbortedByUser,
}

impl Error {
    /// Wrap a seat-source failure.
    pub fn upstream(err: anyhow::Error) -> Self {
        Self::Upstream { source: err.into() }
    }

    /// Wrap a cost-center lookup/creation failure.
    pub fn creation(name: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Creation {
            name: name.into(),
            source: err.into(),
        }
    }

    /// Create a persistence error with path context.
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration { .. } => ErrorCategory::Configuration,
            Error::Upstream { .. } => ErrorCategory::Upstream,
            Error::Creation { .. } => ErrorCategory::Creation,
            Error::Assignment { .. } => ErrorCategory::Assignment,
            Error::Persistence { .. } | Error::PersistenceFormat { .. } => {
                ErrorCategory::Persistence
            }
            Error::AbortedByUser => ErrorCategory::Aborted,
        }
    }

    /// Whether this error ends the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }
}
