//! Error types for Hearth gateway

use thiserror::Error;

/// Result type alias for Hearth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Hearth gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Device directory error (load or remote refresh)
    #[error("directory error: {0}")]
    Directory(String),

    /// Device command failure, carrying the platform error code
    /// surfaced in EXECUTE responses (e.g. "hardError")
    #[error("command failed: {code}")]
    Command {
        /// Platform error code for the EXECUTE response
        code: String,
    },

    /// HomeGraph API error (report state, request sync)
    #[error("homegraph error: {0}")]
    HomeGraph(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Error code reported to the platform for a failed device command
    #[must_use]
    pub fn command_code(&self) -> &str {
        match self {
            Self::Command { code } => code,
            _ => "hardError",
        }
    }
}
