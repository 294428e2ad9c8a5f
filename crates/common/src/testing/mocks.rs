//! Mock implementations for resilience tests
//!
//! [`ScriptedOperation`] replays a fixed list of results and counts how often
//! it was invoked, which is what retry and breaker assertions care about.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::error::{ErrorClassification, TransientKind};

/// Error with explicit classification facts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptedError {
    /// Upstream answered with a status code
    #[error("upstream returned status {0}")]
    Status(u16),
    /// No response because the transport failed
    #[error("transport failure: {0}")]
    Transport(TransientKind),
    /// Neither a status nor a known transport signature
    #[error("opaque failure: {0}")]
    Opaque(String),
}

impl ScriptedError {
    pub fn status(code: u16) -> Self {
        Self::Status(code)
    }

    pub fn timeout() -> Self {
        Self::Transport(TransientKind::Timeout)
    }

    pub fn connection_reset() -> Self {
        Self::Transport(TransientKind::ConnectionReset)
    }

    pub fn opaque(message: impl Into<String>) -> Self {
        Self::Opaque(message.into())
    }
}

impl ErrorClassification for ScriptedError {
    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }

    fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Self::Transport(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Operation that replays scripted results in order
///
/// Once the script runs out, the last result repeats. Clones share the
/// script and the call counter.
#[derive(Debug, Clone)]
pub struct ScriptedOperation<T> {
    script: Arc<Mutex<VecDeque<Result<T, ScriptedError>>>>,
    last: Arc<Mutex<Option<Result<T, ScriptedError>>>>,
    calls: Arc<AtomicU32>,
}

impl<T: Clone> ScriptedOperation<T> {
    pub fn new(script: impl IntoIterator<Item = Result<T, ScriptedError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// An operation that fails with `error` on every call
    pub fn always_failing(error: ScriptedError) -> Self {
        Self::new([Err(error)])
    }

    /// Produce the next scripted result
    pub async fn call(&self) -> Result<T, ScriptedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().pop_front();
        match next {
            Some(result) => {
                *self.last.lock() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Err(ScriptedError::opaque("empty script"))),
        }
    }

    /// Times `call` has been invoked
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Scripted results not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}
