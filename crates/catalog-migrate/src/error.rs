//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source store could not be reached (network, auth, HTTP status).
    #[error("Source unreachable: {0}")]
    SourceUnreachable(String),

    /// Source answered with something other than a list of records.
    #[error("Source response malformed: {0}")]
    SourceMalformed(String),

    /// Destination lookup or write failed for a single record.
    #[error("Reconcile failed for {title:?}: {message}")]
    Reconcile { title: String, message: String },

    /// Event or intent not valid for the current run phase.
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    /// HTTP client construction or transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Reconcile error for the given product title.
    pub fn reconcile(title: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Reconcile {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Whether this error ends the whole run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MigrateError::Reconcile { .. })
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::SourceUnreachable(_) | MigrateError::Http(_) => 3,
            MigrateError::SourceMalformed(_) | MigrateError::Json(_) => 4,
            MigrateError::Reconcile { .. } => 5,
            MigrateError::Cancelled => 130,
            MigrateError::InvalidIntent(_) | MigrateError::Io(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
