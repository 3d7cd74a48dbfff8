//! Error types for sitescribe.
//!
//! Library crates use [`SiteScribeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sitescribe operations.
///
/// Only [`SessionInit`](Self::SessionInit) and [`Config`](Self::Config) abort a
/// crawl; every other variant is isolated to the URL or file it concerns.
#[derive(Debug, thiserror::Error)]
pub enum SiteScribeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A candidate link could not be parsed or resolved.
    #[error("malformed link '{link}': {message}")]
    MalformedLink { link: String, message: String },

    /// A link resolved to a different origin than the crawl base.
    #[error("cross-origin link '{link}' (crawl origin is {origin})")]
    CrossOrigin { link: String, origin: String },

    /// The credential (cookie) file was unreadable or unparseable.
    #[error("failed to load credentials from {path:?}: {message}")]
    CredentialLoad { path: PathBuf, message: String },

    /// Navigation or content extraction failed for a single URL.
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The fetch engine (browser or HTTP client) could not be started.
    #[error("fetch session failed to start: {0}")]
    SessionInit(String),

    /// Writing an artifact to the output directory failed.
    #[error("storage error at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteScribeError>;

impl SiteScribeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error for `url`.
    pub fn fetch(url: impl ToString, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            message: msg.into(),
        }
    }

    /// Create a credential loading error for the file at `path`.
    pub fn credential_load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::CredentialLoad {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` raised while persisting an artifact.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole crawl rather than a single URL.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionInit(_) | Self::Config { .. })
    }
}
