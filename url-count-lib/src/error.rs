//! Error handling for the fetch-and-count pipeline.
//!
//! A single error type covers every way a stage can fail. Per-URL failures
//! are recoverable and never stop the pipeline; the remaining variants are
//! startup or internal problems.

use std::fmt;

/// Main error type for pipeline operations.
#[derive(Debug, Clone)]
pub enum UrlCountError {
    /// The request for a URL could not be sent or the connection failed
    Network { url: String, message: String },

    /// The response arrived but its body could not be read
    Body { url: String, message: String },

    /// The fetch was dropped because the pipeline was aborted
    Cancelled { url: String },

    /// The line source failed with an I/O error other than end-of-stream
    Input { message: String },

    /// Invalid configuration (bad concurrency, empty pattern, bad TOML)
    Config { message: String },

    /// File I/O errors when reading config or URL list files
    File { path: String, message: String },

    /// Errors that don't fit other categories
    Internal { message: String },
}

impl UrlCountError {
    /// Create a new network error.
    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new body read error.
    pub fn body<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Body {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn cancelled<U: Into<String>>(url: U) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Create a new input error.
    pub fn input<M: Into<String>>(message: M) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// URL the error belongs to, for per-URL failures.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Network { url, .. } | Self::Body { url, .. } | Self::Cancelled { url } => {
                Some(url)
            }
            _ => None,
        }
    }

    /// Check if this error came from talking to the remote host.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Body { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl fmt::Display for UrlCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { url, message } => {
                write!(f, "Network error for '{}': {}", url, message)
            }
            Self::Body { url, message } => {
                write!(f, "Failed to read body of '{}': {}", url, message)
            }
            Self::Cancelled { url } => write!(f, "Fetch of '{}' was cancelled", url),
            Self::Input { message } => write!(f, "Input error: {}", message),
            Self::Config { message } => write!(f, "Configuration error: {}", message),
            Self::File { path, message } => write!(f, "File error at '{}': {}", path, message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for UrlCountError {}

impl From<std::io::Error> for UrlCountError {
    fn from(err: std::io::Error) -> Self {
        Self::Input {
            message: err.to_string(),
        }
    }
}

impl From<regex::Error> for UrlCountError {
    fn from(err: regex::Error) -> Self {
        Self::Config {
            message: format!("Invalid pattern: {}", err),
        }
    }
}
