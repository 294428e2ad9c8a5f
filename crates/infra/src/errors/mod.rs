//! POS error types
//!
//! [`PosError`] is the typed error every POS call returns. The transport
//! layer fills in the upstream status code or the transient failure kind,
//! which is all the retry classifier looks at.

mod conversions;

use std::fmt;
use std::time::Duration;

use mesa_common::error::{ErrorClassification, ErrorSeverity, TransientKind};
use serde::Deserialize;
use thiserror::Error;

/// Result type alias for POS operations
pub type PosResult<T> = Result<T, PosError>;

/// Categories of POS errors, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosErrorCategory {
    /// 401 / 403
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx
    Client,
    /// No response received
    Network,
    /// Response received but unreadable
    Decode,
    /// Local configuration problem
    Config,
    /// Rejected by the circuit breaker
    CircuitOpen,
    /// Aborted by the caller
    Cancelled,
}

impl PosErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Client => "client",
            Self::Network => "network",
            Self::Decode => "decode",
            Self::Config => "config",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PosErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// POS operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PosError {
    /// The provider answered with a non-success status
    #[error("POS API returned {status}: {detail}")]
    Api {
        status: u16,
        /// Provider error category, e.g. `INVALID_REQUEST_ERROR`
        category: Option<String>,
        /// Provider error code, e.g. `NOT_FOUND`
        code: Option<String>,
        detail: String,
        /// Parsed `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// The request never produced a response
    #[error("POS transport failure: {message}")]
    Transport { kind: Option<TransientKind>, message: String },

    #[error("Failed to decode POS response: {0}")]
    Decode(String),

    #[error("POS client configuration error: {0}")]
    Config(String),

    #[error("POS circuit breaker is open")]
    CircuitOpen { retry_after: Option<Duration> },

    #[error("POS call cancelled")]
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    category: Option<String>,
    code: Option<String>,
    detail: Option<String>,
}

const MAX_DETAIL_LEN: usize = 512;

impl PosError {
    /// Build an [`PosError::Api`] from a non-success response.
    ///
    /// The first entry of the provider's `{"errors": [...]}` body supplies
    /// category, code and detail. Anything else becomes the (truncated) raw
    /// body.
    pub fn from_response(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let first = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.errors.into_iter().next());

        match first {
            Some(entry) => Self::Api {
                status,
                detail: entry
                    .detail
                    .or_else(|| entry.code.clone())
                    .unwrap_or_else(|| format!("HTTP {status}")),
                category: entry.category,
                code: entry.code,
                retry_after,
            },
            None => Self::Api {
                status,
                category: None,
                code: None,
                detail: if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.chars().take(MAX_DETAIL_LEN).collect()
                },
                retry_after,
            },
        }
    }

    /// Transport failure with a known transient kind
    pub fn transport(kind: TransientKind, message: impl Into<String>) -> Self {
        Self::Transport { kind: Some(kind), message: message.into() }
    }

    /// Get the error category for this error
    pub fn category(&self) -> PosErrorCategory {
        match self {
            Self::Api { status: 401 | 403, .. } => PosErrorCategory::Authentication,
            Self::Api { status: 429, .. } => PosErrorCategory::RateLimit,
            Self::Api { status, .. } if *status >= 500 => PosErrorCategory::Server,
            Self::Api { .. } => PosErrorCategory::Client,
            Self::Transport { .. } => PosErrorCategory::Network,
            Self::Decode(_) => PosErrorCategory::Decode,
            Self::Config(_) => PosErrorCategory::Config,
            Self::CircuitOpen { .. } => PosErrorCategory::CircuitOpen,
            Self::Cancelled => PosErrorCategory::Cancelled,
        }
    }
}

impl ErrorClassification for PosError {
    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Self::Transport { kind, .. } => *kind,
            _ => None,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(_) => ErrorSeverity::Critical,
            Self::CircuitOpen { .. } | Self::Api { status: 429, .. } | Self::Transport { .. } => {
                ErrorSeverity::Warning
            }
            Self::Cancelled => ErrorSeverity::Info,
            Self::Api { .. } | Self::Decode(_) => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } | Self::CircuitOpen { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use mesa_common::resilience::{default_retryable_status_codes, is_retryable};

    use super::*;

    /// Validates parsing of the provider error envelope.
    ///
    /// Assertions:
    /// - The first error entry supplies category, code and detail.
    #[test]
    fn test_from_response_parses_error_envelope() {
        let body = r#"{"errors":[
            {"category":"INVALID_REQUEST_ERROR","code":"NOT_FOUND","detail":"Order not found"},
            {"category":"API_ERROR","code":"INTERNAL_SERVER_ERROR"}
        ]}"#;

        let err = PosError::from_response(404, body, None);
        assert_eq!(
            err,
            PosError::Api {
                status: 404,
                category: Some("INVALID_REQUEST_ERROR".into()),
                code: Some("NOT_FOUND".into()),
                detail: "Order not found".into(),
                retry_after: None,
            }
        );
        assert_eq!(err.to_string(), "POS API returned 404: Order not found");
    }

    #[test]
    fn test_from_response_falls_back_to_body() {
        let err = PosError::from_response(502, "<html>Bad Gateway</html>", None);
        assert!(matches!(&err, PosError::Api { detail, code: None, .. } if detail.contains("Bad Gateway")));

        let err = PosError::from_response(503, "  ", Some(Duration::from_secs(2)));
        assert!(matches!(&err, PosError::Api { detail, .. } if detail == "HTTP 503"));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_categories() {
        let api = |status| PosError::from_response(status, "", None);

        assert_eq!(api(401).category(), PosErrorCategory::Authentication);
        assert_eq!(api(403).category(), PosErrorCategory::Authentication);
        assert_eq!(api(429).category(), PosErrorCategory::RateLimit);
        assert_eq!(api(503).category(), PosErrorCategory::Server);
        assert_eq!(api(422).category(), PosErrorCategory::Client);
        assert_eq!(
            PosError::transport(TransientKind::Timeout, "slow").category(),
            PosErrorCategory::Network
        );
        assert_eq!(PosError::Cancelled.category().to_string(), "cancelled");
    }

    /// Validates the classifier sees the right facts on `PosError`.
    ///
    /// Assertions:
    /// - 503 and timeouts are retryable; 404, decode, config, circuit-open and
    ///   cancellation are not.
    #[test]
    fn test_classification() {
        let codes = default_retryable_status_codes();

        assert!(is_retryable(&PosError::from_response(503, "", None), &codes));
        assert!(is_retryable(&PosError::transport(TransientKind::Timeout, "t"), &codes));
        assert!(is_retryable(&PosError::transport(TransientKind::ConnectionReset, "r"), &codes));
        assert!(!is_retryable(&PosError::transport(TransientKind::Connect, "c"), &codes));
        assert!(!is_retryable(&PosError::from_response(404, "", None), &codes));
        assert!(!is_retryable(&PosError::Decode("bad".into()), &codes));
        assert!(!is_retryable(&PosError::Config("missing".into()), &codes));
        assert!(!is_retryable(&PosError::CircuitOpen { retry_after: None }, &codes));
        assert!(!is_retryable(&PosError::Cancelled, &codes));
    }

    #[test]
    fn test_severity() {
        assert_eq!(PosError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(PosError::Cancelled.severity(), ErrorSeverity::Info);
        assert_eq!(PosError::from_response(500, "", None).severity(), ErrorSeverity::Error);
    }
}
