//! Error classification primitives shared by every Mesa crate.
//!
//! Remote-call errors in Mesa are typed values. Instead of inspecting
//! arbitrary error messages after the fact, the transport layer records two
//! facts on every error it produces:
//!
//! 1. the upstream HTTP status code, when a response was received, and
//! 2. the [`TransientKind`] of a transport failure (timeout, connection reset,
//!    connect failure), when no response was received.
//!
//! The [`ErrorClassification`] trait exposes those facts so that generic
//! resilience code (see `resilience::classifier`) can decide retryability
//! without knowing the concrete error type.
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum MyClientError {
//!     #[error("upstream returned {status}")]
//!     Status { status: u16 },
//!     #[error("transport failure: {kind}")]
//!     Transport { kind: TransientKind },
//!     #[error("bad request: {0}")]
//!     Invalid(String),
//! }
//!
//! impl ErrorClassification for MyClientError {
//!     fn status_code(&self) -> Option<u16> {
//!         match self {
//!             Self::Status { status } => Some(*status),
//!             _ => None,
//!         }
//!     }
//!
//!     fn transient_kind(&self) -> Option<TransientKind> {
//!         match self {
//!             Self::Transport { kind } => Some(*kind),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transport-level failure signatures that are worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientKind {
    /// The request or the connection timed out
    Timeout,
    /// The peer reset the connection (`ECONNRESET`)
    ConnectionReset,
    /// The connection could not be established
    Connect,
}

impl TransientKind {
    /// Recognise a transient failure from an error message.
    ///
    /// Only for transports that hand back nothing richer than a string. The
    /// signatures are a case-insensitive `timeout` / `timed out` substring and
    /// `ECONNRESET` / `connection reset`.
    pub fn from_message(message: &str) -> Option<Self> {
        let lower = message.to_ascii_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            Some(Self::Timeout)
        } else if lower.contains("econnreset") || lower.contains("connection reset") {
            Some(Self::ConnectionReset)
        } else {
            None
        }
    }

    /// Whether the classifier treats this kind as retryable.
    ///
    /// Connect failures are recorded for diagnostics but only timeouts and
    /// resets are retried.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionReset)
    }
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionReset => write!(f, "connection_reset"),
            Self::Connect => write!(f, "connect"),
        }
    }
}

/// Error classification trait for consistent retry decisions across modules
///
/// Implementors report the raw facts; the decision itself lives in
/// `resilience::is_retryable`, which also takes the caller's set of retryable
/// status codes.
pub trait ErrorClassification {
    /// Upstream status code carried by the error, if any
    fn status_code(&self) -> Option<u16>;

    /// Transport failure signature carried by the error, if any
    fn transient_kind(&self) -> Option<TransientKind>;

    /// Get the error severity level
    ///
    /// Used for logging decisions. The default derives the level from the
    /// status code and transient kind.
    fn severity(&self) -> ErrorSeverity {
        match (self.status_code(), self.transient_kind()) {
            (Some(status), _) if status >= 500 => ErrorSeverity::Error,
            (Some(429), _) | (None, Some(_)) => ErrorSeverity::Warning,
            (Some(_), _) => ErrorSeverity::Error,
            (None, None) => ErrorSeverity::Error,
        }
    }

    /// Suggested delay before the next attempt (e.g. from a `Retry-After`
    /// header)
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl<T: ErrorClassification + ?Sized> ErrorClassification for &T {
    fn status_code(&self) -> Option<u16> {
        (**self).status_code()
    }

    fn transient_kind(&self) -> Option<TransientKind> {
        (**self).transient_kind()
    }

    fn severity(&self) -> ErrorSeverity {
        (**self).severity()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        status: Option<u16>,
        kind: Option<TransientKind>,
    }

    impl ErrorClassification for Fake {
        fn status_code(&self) -> Option<u16> {
            self.status
        }

        fn transient_kind(&self) -> Option<TransientKind> {
            self.kind
        }
    }

    /// Validates `TransientKind::from_message` signature detection.
    ///
    /// Assertions:
    /// - Timeout and reset signatures are detected regardless of case.
    /// - Unrelated messages yield `None`.
    #[test]
    fn test_transient_kind_from_message() {
        assert_eq!(
            TransientKind::from_message("request Timeout after 30s"),
            Some(TransientKind::Timeout)
        );
        assert_eq!(
            TransientKind::from_message("operation timed out"),
            Some(TransientKind::Timeout)
        );
        assert_eq!(
            TransientKind::from_message("read ECONNRESET"),
            Some(TransientKind::ConnectionReset)
        );
        assert_eq!(
            TransientKind::from_message("Connection reset by peer (os error 104)"),
            Some(TransientKind::ConnectionReset)
        );
        assert_eq!(TransientKind::from_message("invalid json body"), None);
    }

    #[test]
    fn test_transient_kind_retryability() {
        assert!(TransientKind::Timeout.is_retryable());
        assert!(TransientKind::ConnectionReset.is_retryable());
        assert!(!TransientKind::Connect.is_retryable());
    }

    /// Validates the default `severity` derivation.
    ///
    /// Assertions:
    /// - 5xx maps to `Error`, 429 and bare transport failures to `Warning`.
    /// - Other 4xx and unclassified errors map to `Error`.
    #[test]
    fn test_default_severity() {
        let server = Fake { status: Some(503), kind: None };
        let throttled = Fake { status: Some(429), kind: None };
        let transport = Fake { status: None, kind: Some(TransientKind::Timeout) };
        let client = Fake { status: Some(400), kind: None };
        let opaque = Fake { status: None, kind: None };

        assert_eq!(server.severity(), ErrorSeverity::Error);
        assert_eq!(throttled.severity(), ErrorSeverity::Warning);
        assert_eq!(transport.severity(), ErrorSeverity::Warning);
        assert_eq!(client.severity(), ErrorSeverity::Error);
        assert_eq!(opaque.severity(), ErrorSeverity::Error);
        assert_eq!(opaque.retry_after(), None);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(TransientKind::ConnectionReset.to_string(), "connection_reset");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }
}
