//! Error types and handling for sitemap generation.
//!
//! Every public operation returns [`Result<T, Error>`]. Errors carry a stable
//! [`ErrorKind`] code and an HTTP status hint so that a request handler can map
//! them onto responses without inspecting messages.
//!
//! ## Error Kinds
//!
//! - **`GENERATION_FAILED`**: composing a sitemap document failed
//! - **`CACHE_ERROR`**: the document cache could not serve or store a document
//! - **`DATABASE_ERROR`**: the post store failed or returned malformed data
//! - **`INVALID_REQUEST`**: malformed caller input (e.g. page `0`)
//! - **`TIMEOUT_ERROR`**: a generation step exceeded its deadline
//! - **`CONFIGURATION_ERROR`**: invalid base URL or numeric bounds
//!
//! ## Propagation
//!
//! Configuration errors surface immediately from generator construction and
//! `update_config`. Failures inside a generation call are logged and wrapped in
//! [`Error::Generation`], which keeps the underlying error as its source:
//!
//! ```rust
//! use qbuyse_sitemap::{Error, ErrorKind};
//!
//! let err = Error::Generation {
//!     sitemap: "posts".to_string(),
//!     source: Box::new(Error::Timeout("post store exceeded 30s".to_string())),
//! };
//!
//! assert_eq!(err.kind(), ErrorKind::GenerationFailed);
//! assert_eq!(err.status_code(), 504);
//! assert!(err.to_string().contains("post store exceeded 30s"));
//! ```

use std::fmt;

use thiserror::Error;

/// The main error type for sitemap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Composing a sitemap document failed.
    ///
    /// Wraps the underlying failure so callers see one error per operation
    /// while the cause stays reachable through `source()`.
    #[error("Failed to generate {sitemap} sitemap: {source}")]
    Generation {
        /// Label of the sitemap being generated (`posts`, `index`, ...).
        sitemap: String,
        /// The failure that aborted generation.
        #[source]
        source: Box<Error>,
    },

    /// The document cache failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The post store failed or returned data that could not be decoded.
    #[error("Database error: {0}")]
    Database(String),

    /// Caller input was malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A generation step exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration is invalid.
    ///
    /// Raised synchronously, never deferred to the next generation call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O failure while reading configuration files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable error codes exposed to callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `GENERATION_FAILED`
    GenerationFailed,
    /// `CACHE_ERROR`
    CacheError,
    /// `DATABASE_ERROR`
    DatabaseError,
    /// `INVALID_REQUEST`
    InvalidRequest,
    /// `TIMEOUT_ERROR`
    TimeoutError,
    /// `CONFIGURATION_ERROR`
    ConfigurationError,
}

impl ErrorKind {
    /// The wire code for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GenerationFailed => "GENERATION_FAILED",
            Self::CacheError => "CACHE_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl Error {
    /// Wrap a failure that happened while generating the named sitemap.
    pub fn generation(sitemap: impl Into<String>, source: Self) -> Self {
        Self::Generation {
            sitemap: sitemap.into(),
            source: Box::new(source),
        }
    }

    /// The stable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Generation { .. } | Self::Io(_) => ErrorKind::GenerationFailed,
            Self::Cache(_) => ErrorKind::CacheError,
            Self::Database(_) => ErrorKind::DatabaseError,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Timeout(_) => ErrorKind::TimeoutError,
            Self::Configuration(_) => ErrorKind::ConfigurationError,
        }
    }

    /// Suggested HTTP status for a response carrying this error.
    ///
    /// A wrapped generation failure reports the status of its cause.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Generation { source, .. } => source.status_code(),
            Self::Cache(_) | Self::Configuration(_) | Self::Io(_) => 500,
            Self::Database(_) => 502,
            Self::InvalidRequest(_) => 400,
            Self::Timeout(_) => 504,
        }
    }

    /// Check if retrying the operation might succeed.
    ///
    /// Timeouts, store failures and cache failures are treated as transient;
    /// configuration and request errors are permanent.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Generation { source, .. } => source.is_recoverable(),
            Self::Timeout(_) | Self::Database(_) | Self::Cache(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::InvalidRequest(_) | Self::Configuration(_) => false,
        }
    }

    /// The innermost error, following generation wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Generation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
