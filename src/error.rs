/// Error types shared by the project pipeline.
///
/// Configuration and project-location failures abort a request and carry a
/// single user-facing message.  Metadata failures are their own type because
/// every caller downgrades them to "no definition available".
use std::path::PathBuf;

/// Errors produced while reading or validating an `mpl.json` document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The text is not well-formed JSON.
    #[error("malformed configuration: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The JSON is well-formed but a required field is missing or a field
    /// has the wrong type.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that abort a whole build or lookup request.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// No ancestor directory of `file` (within the search bound) holds an
    /// `mpl.json`.
    #[error("Failed to find project config for {}", file.display())]
    NoProjectFound { file: PathBuf },

    /// The project was located but its configuration could not be loaded.
    /// Missing and malformed files render the same message; the cause is
    /// kept as the error source for logs.
    #[error("Failed to parse project config for {}", root.display())]
    ConfigLoad {
        root: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// Reasons the compiler metadata artifact is unavailable.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("metadata file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("failed to read metadata file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed metadata file: {0}")]
    Malformed(#[from] serde_json::Error),
}
