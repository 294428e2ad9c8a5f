//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Mesa
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MesaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The POS provider rejected or failed the request
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The POS provider is temporarily unavailable (circuit open)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MesaError {
    /// Whether the error originated from bad local configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for Mesa operations
pub type Result<T> = std::result::Result<T, MesaError>;
