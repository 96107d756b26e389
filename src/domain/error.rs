//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>ms, <number>s, <number>m or a combination (e.g., 500ms, 2s, 1m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when parsing a JPEG quality value
#[derive(Debug, Clone, Error)]
#[error("Invalid quality: \"{input}\". Expected a number greater than 0 and at most 1 (e.g., 0.9)")]
pub struct QualityParseError {
    pub input: String,
}

/// Error when an invalid camera facing is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid facing: \"{input}\". Valid values are: environment, user")]
pub struct InvalidFacingError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
