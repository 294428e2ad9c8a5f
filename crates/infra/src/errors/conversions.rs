//! Conversions between transport, POS and domain errors.

use std::error::Error as StdError;
use std::io;

use mesa_common::error::TransientKind;
use mesa_domain::MesaError;
use reqwest::Error as HttpError;

use super::PosError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → PosError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for PosError {
    fn from(err: HttpError) -> Self {
        if err.is_builder() {
            return Self::Config(format!("invalid request: {err}"));
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }

        let message = error_chain(&err);
        let kind = if err.is_timeout() {
            Some(TransientKind::Timeout)
        } else if is_connection_reset(&err) {
            Some(TransientKind::ConnectionReset)
        } else if err.is_connect() {
            Some(TransientKind::Connect)
        } else {
            TransientKind::from_message(&message)
        };

        Self::Transport { kind, message }
    }
}

/// Render an error and all of its sources on one line
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_connection_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = current {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        current = cause.source();
    }
    false
}

/* -------------------------------------------------------------------------- */
/* PosError → MesaError */
/* -------------------------------------------------------------------------- */

impl From<PosError> for MesaError {
    fn from(err: PosError) -> Self {
        let message = err.to_string();
        match err {
            PosError::Api { status: 401 | 403, .. } => Self::Auth(message),
            PosError::Api { status: 404, .. } => Self::NotFound(message),
            PosError::Api { status: 400 | 422, .. } => Self::InvalidInput(message),
            PosError::Api { .. } | PosError::Decode(_) => Self::Upstream(message),
            PosError::Transport { .. } => Self::Network(message),
            PosError::Config(detail) => Self::Config(detail),
            PosError::CircuitOpen { .. } => Self::Unavailable(message),
            PosError::Cancelled => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_error_into_mesa_error() {
        let api = |status| MesaError::from(PosError::from_response(status, "", None));

        assert!(matches!(api(401), MesaError::Auth(_)));
        assert!(matches!(api(404), MesaError::NotFound(_)));
        assert!(matches!(api(400), MesaError::InvalidInput(_)));
        assert!(matches!(api(503), MesaError::Upstream(_)));
        assert!(matches!(
            MesaError::from(PosError::transport(TransientKind::Timeout, "slow")),
            MesaError::Network(_)
        ));
        assert_eq!(
            MesaError::from(PosError::Config("no token".into())),
            MesaError::Config("no token".into())
        );
        assert!(matches!(
            MesaError::from(PosError::CircuitOpen { retry_after: None }),
            MesaError::Unavailable(_)
        ));
    }

    #[test]
    fn test_connection_reset_detection() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset");
        assert!(is_connection_reset(&reset));

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(!is_connection_reset(&refused));
    }
}
