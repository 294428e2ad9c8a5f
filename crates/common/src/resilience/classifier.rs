//! Retry-eligibility classification
//!
//! A single pure function decides whether a failed remote call is worth
//! another attempt. It never looks at anything but the error's typed fields
//! and the caller's set of retryable status codes.

use std::collections::BTreeSet;

use crate::error::ErrorClassification;

/// Status codes retried by default: throttling and upstream 5xx
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Default retryable status code set
pub fn default_retryable_status_codes() -> BTreeSet<u16> {
    DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect()
}

/// Decide whether `error` should be retried.
///
/// 1. An error carrying a status code is retryable iff that code is in
///    `retryable_status_codes`.
/// 2. Otherwise it is retryable iff it is a timeout or connection-reset
///    transport failure.
/// 3. Everything else fails fast.
pub fn is_retryable<E>(error: &E, retryable_status_codes: &BTreeSet<u16>) -> bool
where
    E: ErrorClassification + ?Sized,
{
    if let Some(status) = error.status_code() {
        return retryable_status_codes.contains(&status);
    }

    error.transient_kind().is_some_and(|kind| kind.is_retryable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransientKind;

    #[derive(Debug, Clone, Copy)]
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

    fn status(code: u16) -> Fake {
        Fake { status: Some(code), kind: None }
    }

    /// Validates status-code membership decides retryability.
    ///
    /// Assertions:
    /// - Every default code is retryable.
    /// - 400, 401, 404 and 409 are not.
    #[test]
    fn test_status_membership() {
        let codes = default_retryable_status_codes();

        for code in DEFAULT_RETRYABLE_STATUS_CODES {
            assert!(is_retryable(&status(code), &codes), "{code} should be retryable");
        }
        for code in [400, 401, 404, 409] {
            assert!(!is_retryable(&status(code), &codes), "{code} should fail fast");
        }
    }

    /// Validates a status code wins over a transient signature.
    ///
    /// Assertions:
    /// - A 400 that also carries a timeout kind is not retryable.
    #[test]
    fn test_status_takes_precedence() {
        let codes = default_retryable_status_codes();
        let error = Fake { status: Some(400), kind: Some(TransientKind::Timeout) };

        assert!(!is_retryable(&error, &codes));
    }

    #[test]
    fn test_custom_status_set() {
        let codes: BTreeSet<u16> = [409].into_iter().collect();

        assert!(is_retryable(&status(409), &codes));
        assert!(!is_retryable(&status(503), &codes));
    }

    /// Validates the transport fallback when no status is present.
    ///
    /// Assertions:
    /// - Timeout and reset are retryable, connect failures and opaque errors
    ///   are not.
    #[test]
    fn test_transport_fallback() {
        let codes = default_retryable_status_codes();
        let of = |kind| Fake { status: None, kind };

        assert!(is_retryable(&of(Some(TransientKind::Timeout)), &codes));
        assert!(is_retryable(&of(Some(TransientKind::ConnectionReset)), &codes));
        assert!(!is_retryable(&of(Some(TransientKind::Connect)), &codes));
        assert!(!is_retryable(&of(None), &codes));
    }

    #[test]
    fn test_is_pure() {
        let codes = default_retryable_status_codes();
        let error = status(502);

        let first = is_retryable(&error, &codes);
        for _ in 0..10 {
            assert_eq!(is_retryable(&error, &codes), first);
        }
    }
}
