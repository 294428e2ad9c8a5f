//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted errors and operations for exercising the
//!   resilience primitives without a network
//!
//! ## Usage
//!
//! ```rust
//! use mesa_common::testing::{ScriptedError, ScriptedOperation};
//!
//! let operation = ScriptedOperation::new([
//!     Err(ScriptedError::status(503)),
//!     Ok("ready"),
//! ]);
//! assert_eq!(operation.remaining(), 2);
//! ```

pub mod mocks;

pub use mocks::{ScriptedError, ScriptedOperation};
pub use crate::resilience::{Clock, MockClock, SystemClock};
