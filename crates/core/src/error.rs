//! Error types for mv-core
//!
//! A failed move has to tell the caller where the data ended up, so copy
//! failures, delete failures and child failures are distinct variants rather
//! than one generic message.

use thiserror::Error;

/// Result type alias for mv-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mv-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// Alias already exists
    #[error("Alias already exists: {0}")]
    AliasExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Source is neither an object nor a non-empty prefix
    #[error("Not found: {0}")]
    NotFound(String),

    /// A file-only move was asked for something that is not an object
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// One part of a chunked copy failed
    #[error("part {part_number} failed: {cause}")]
    PartFailed {
        part_number: i32,
        #[source]
        cause: Box<Error>,
    },

    /// The copy did not complete; the source is untouched
    #[error("failed to move: {from} to {to}: {cause}")]
    CopyFailed {
        from: String,
        to: String,
        #[source]
        cause: Box<Error>,
    },

    /// The copy completed but the source could not be removed
    #[error("copied {from} to {to} but failed to delete source: {cause}")]
    DeleteFailed {
        from: String,
        to: String,
        #[source]
        cause: Box<Error>,
    },

    /// A child of a prefix failed; later siblings were not attempted
    #[error("failed to move {child}: {cause}")]
    ChildMoveFailed {
        child: String,
        #[source]
        cause: Box<Error>,
    },

    /// Cancellation was observed before the work finished
    #[error("Operation cancelled")]
    Cancelled,

    /// Feature not supported by backend
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) => 2, // UsageError
            Error::Network(_) => 3,                        // NetworkError
            Error::Auth(_) => 4,                           // AuthError
            Error::NotFound(_) | Error::InvalidOperation(_) | Error::AliasNotFound(_) => 5,
            Error::AliasExists(_) => 6,         // Conflict
            Error::UnsupportedFeature(_) => 7,  // UnsupportedFeature
            Error::DeleteFailed { .. } => 8,    // DeleteFailed
            Error::Cancelled => 130,            // Interrupted
            Error::PartFailed { cause, .. }
            | Error::CopyFailed { cause, .. }
            | Error::ChildMoveFailed { cause, .. } => cause.exit_code(),
            _ => 1, // GeneralError
        }
    }

    /// Whether the failure may have left the object at both locations
    pub fn leaves_duplicate(&self) -> bool {
        match self {
            Error::DeleteFailed { .. } => true,
            Error::ChildMoveFailed { cause, .. } => cause.leaves_duplicate(),
            _ => false,
        }
    }

    /// Whether this is the store's "no such object" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
