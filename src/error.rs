use thiserror::Error;

/// Failures raised by a single format's encoder or decoder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to parse {format}: {message}")]
    Parse { format: String, message: String },

    #[error("Failed to encode {format}: {message}")]
    Encode { format: String, message: String },
}

impl CodecError {
    pub fn parse(format: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Parse { format: format.to_string(), message: message.to_string() }
    }

    pub fn encode(format: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Encode { format: format.to_string(), message: message.to_string() }
    }

    /// Format the failing codec belongs to
    pub fn format(&self) -> &str {
        match self {
            Self::Parse { format, .. } | Self::Encode { format, .. } => format,
        }
    }
}

/// Error types for Firedash
#[derive(Error, Debug)]
pub enum FiredashError {
    // Input validation, raised before any network call
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    // Export errors
    #[error("Export to {format} failed: {source}")]
    Export {
        format: String,
        #[source]
        source: CodecError,
    },

    #[error("Archive generation failed: {message}")]
    Archive { message: String },

    // Remote service errors
    #[error("{message}")]
    Remote { message: String },

    // Local persistence errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FiredashError {
    /// Create a validation error for a form field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a remote service error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote { message: message.into() }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create an archive error
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive { message: message.into() }
    }

    /// Wrap a codec failure with the format being exported
    pub fn export(source: CodecError) -> Self {
        Self::Export { format: source.format().to_string(), source }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Export { .. } | Self::Archive { .. } => "export",
            Self::Remote { .. } => "remote",
            Self::Storage { .. } => "storage",
            Self::Configuration { .. } => "configuration",
            Self::Io(_) => "system",
        }
    }
}

impl From<rusqlite::Error> for FiredashError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage { message: err.to_string() }
    }
}

impl From<reqwest::Error> for FiredashError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote { message: err.to_string() }
    }
}

impl From<zip::result::ZipError> for FiredashError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive { message: err.to_string() }
    }
}

/// Result type alias for Firedash
pub type FiredashResult<T> = std::result::Result<T, FiredashError>;
