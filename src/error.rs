// src/error.rs

use thiserror::Error;

/// Core error types for repomux
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Repository definition file could not be deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Requested repository (or tag) is not defined
    #[error("Unknown repository: {0}")]
    UnknownRepository(String),

    /// Family identifier has no registered parser
    #[error("Unknown family: {0}")]
    UnknownFamily(String),

    /// Repository definition is structurally invalid
    #[error("Invalid repository definition: {0}")]
    InvalidDefinition(String),

    /// A source unit could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A required field is missing from a unit
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Compressed source could not be decoded
    #[error("Decompression error: {0}")]
    Decompress(String),
}

impl Error {
    /// Whether this error must abort a dispatch call before any parsing
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::UnknownRepository(_)
                | Error::UnknownFamily(_)
                | Error::InvalidDefinition(_)
        )
    }
}

/// Result type alias using repomux's Error type
pub type Result<T> = std::result::Result<T, Error>;
