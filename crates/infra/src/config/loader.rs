//! Configuration loader
//!
//! Loads POS client settings from environment variables and files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory, if present
//! 2. Probes for a `mesa.toml` / `mesa.json` file; its values (or the
//!    defaults, when none is found) form the base
//! 3. Environment variables override the base, one field at a time
//!
//! ## Environment Variables
//! - `ENVIRONMENT`: `sandbox` (default) or `production`
//! - `MESA_POS_BASE_URL`: overrides the environment's base URL
//! - `MESA_POS_API_VERSION`: provider API version header value
//! - `MESA_POS_TIMEOUT_MS`: per-request timeout
//! - `MESA_RETRY_MAX_RETRIES`, `MESA_RETRY_INITIAL_DELAY_MS`,
//!   `MESA_RETRY_MAX_DELAY_MS`, `MESA_RETRY_BACKOFF_MULTIPLIER`
//! - `MESA_BREAKER_FAILURE_THRESHOLD`, `MESA_BREAKER_RESET_TIMEOUT_MS`,
//!   `MESA_BREAKER_HALF_OPEN_MAX_CALLS`
//!
//! Unset or blank variables keep the base value. A malformed value is a
//! configuration error.
//!
//! Access tokens are not part of the settings; see `crate::credentials`.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use mesa_domain::constants::ENVIRONMENT_VAR;
use mesa_domain::{MesaError, PosClientSettings, PosEnvironment, Result};
use tracing::{debug, info};

pub const BASE_URL_VAR: &str = "MESA_POS_BASE_URL";
pub const API_VERSION_VAR: &str = "MESA_POS_API_VERSION";
pub const TIMEOUT_MS_VAR: &str = "MESA_POS_TIMEOUT_MS";
pub const RETRY_MAX_RETRIES_VAR: &str = "MESA_RETRY_MAX_RETRIES";
pub const RETRY_INITIAL_DELAY_MS_VAR: &str = "MESA_RETRY_INITIAL_DELAY_MS";
pub const RETRY_MAX_DELAY_MS_VAR: &str = "MESA_RETRY_MAX_DELAY_MS";
pub const RETRY_BACKOFF_MULTIPLIER_VAR: &str = "MESA_RETRY_BACKOFF_MULTIPLIER";
pub const BREAKER_FAILURE_THRESHOLD_VAR: &str = "MESA_BREAKER_FAILURE_THRESHOLD";
pub const BREAKER_RESET_TIMEOUT_MS_VAR: &str = "MESA_BREAKER_RESET_TIMEOUT_MS";
pub const BREAKER_HALF_OPEN_MAX_CALLS_VAR: &str = "MESA_BREAKER_HALF_OPEN_MAX_CALLS";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `MesaError::Config` if:
/// - A `.env` file exists but cannot be parsed
/// - A probed config file is invalid
/// - An environment variable is malformed
/// - The merged settings fail validation
pub fn load() -> Result<PosClientSettings> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => return Err(MesaError::Config(format!("Failed to load .env file: {e}"))),
    }

    let base = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => PosClientSettings::default(),
    };

    let settings = apply_env_overrides(base)?;
    super::validate(&settings)?;

    info!(
        environment = %settings.environment,
        base_url = settings.base_url(),
        "POS client configuration loaded"
    );
    Ok(settings)
}

/// Load configuration from environment variables over the defaults
///
/// # Errors
/// Returns `MesaError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<PosClientSettings> {
    apply_env_overrides(PosClientSettings::default())
}

/// Apply every set environment variable on top of `settings`
///
/// # Errors
/// Returns `MesaError::Config` if a variable has an invalid value.
pub fn apply_env_overrides(mut settings: PosClientSettings) -> Result<PosClientSettings> {
    if let Some(environment) = env_parse::<PosEnvironment>(ENVIRONMENT_VAR)? {
        settings.environment = environment;
    }
    if let Some(base_url) = env_var(BASE_URL_VAR) {
        settings.base_url_override = Some(base_url);
    }
    if let Some(api_version) = env_var(API_VERSION_VAR) {
        settings.api_version = api_version;
    }
    if let Some(timeout) = env_parse(TIMEOUT_MS_VAR)? {
        settings.request_timeout_ms = timeout;
    }

    let retry = &mut settings.retry;
    if let Some(value) = env_parse(RETRY_MAX_RETRIES_VAR)? {
        retry.max_retries = value;
    }
    if let Some(value) = env_parse(RETRY_INITIAL_DELAY_MS_VAR)? {
        retry.initial_delay_ms = value;
    }
    if let Some(value) = env_parse(RETRY_MAX_DELAY_MS_VAR)? {
        retry.max_delay_ms = value;
    }
    if let Some(value) = env_parse(RETRY_BACKOFF_MULTIPLIER_VAR)? {
        retry.backoff_multiplier = value;
    }

    let breaker = &mut settings.circuit_breaker;
    if let Some(value) = env_parse(BREAKER_FAILURE_THRESHOLD_VAR)? {
        breaker.failure_threshold = value;
    }
    if let Some(value) = env_parse(BREAKER_RESET_TIMEOUT_MS_VAR)? {
        breaker.reset_timeout_ms = value;
    }
    if let Some(value) = env_parse(BREAKER_HALF_OPEN_MAX_CALLS_VAR)? {
        breaker.half_open_max_calls = value;
    }

    Ok(settings)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `MesaError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<PosClientSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MesaError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MesaError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MesaError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<PosClientSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MesaError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MesaError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MesaError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches `mesa.toml`, `mesa.json`, `config/mesa.toml` and
/// `config/mesa.json` in the current working directory, then next to the
/// executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["mesa.toml", "mesa.json", "config/mesa.toml", "config/mesa.json"];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get an environment variable, treating blank values as unset
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an environment variable if it is set
///
/// # Errors
/// Returns `MesaError::Config` naming the variable when parsing fails.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| MesaError::Config(format!("Invalid value for {key} ({raw:?}): {e}")))
        })
        .transpose()
}
