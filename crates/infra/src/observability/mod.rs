//! Logging setup
//!
//! Installs the global `tracing` subscriber. The filter comes from
//! `RUST_LOG` (default `info`) and the output format from
//! `MESA_LOG_FORMAT` (`pretty` or `json`).
//!
//! Retry attempts, breaker transitions and rejections are emitted by
//! `mesa-common` as structured events; this module only decides where they
//! go.

use std::fmt;
use std::str::FromStr;

use mesa_domain::{MesaError, Result};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as fmt_layer;
use tracing_subscriber::prelude::*;

pub const LOG_FORMAT_VAR: &str = "MESA_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for development
    #[default]
    Pretty,
    /// One JSON object per event, for log aggregation
    Json,
}

impl LogFormat {
    /// Format from `MESA_LOG_FORMAT`, falling back to [`LogFormat::Pretty`]
    /// when unset or unrecognized.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_VAR).ok().and_then(|raw| raw.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = MesaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(MesaError::Config(format!("Unknown log format: {other}"))),
        }
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns `MesaError::Config` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry.with(fmt_layer::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt_layer::layer().json().with_current_span(true).with_span_list(false))
            .try_init(),
    };

    installed
        .map_err(|e| MesaError::Config(format!("Failed to install tracing subscriber: {e}")))?;
    tracing::debug!(format = %format, "Tracing initialized");
    Ok(())
}
