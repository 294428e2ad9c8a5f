//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading settings from files and the
//! environment and turning them into resilience configs.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use mesa_domain::{MesaError, PosEnvironment};
use mesa_infra::config::{self, loader};
use once_cell::sync::Lazy;
use tempfile::NamedTempFile;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

/// Load a complete JSON config and derive the resilience configs
///
/// # Test Steps
/// 1. Write every setting to a `.json` file
/// 2. Load it through `load_from_file`
/// 3. Convert to `RetryConfig` / `CircuitBreakerConfig`
/// 4. Verify values and the resulting delay schedule
#[test]
fn test_load_config_from_json_file() {
    let file = write_config(
        ".json",
        r#"{
            "environment": "production",
            "base_url_override": "http://127.0.0.1:9999",
            "api_version": "2025-01-23",
            "request_timeout_ms": 5000,
            "retry": {
                "max_retries": 2,
                "initial_delay_ms": 200,
                "max_delay_ms": 500,
                "backoff_multiplier": 3.0,
                "retryable_status_codes": [503]
            },
            "circuit_breaker": {
                "failure_threshold": 2,
                "reset_timeout_ms": 10000,
                "half_open_max_calls": 1
            }
        }"#,
    );

    let settings =
        config::load_from_file(Some(file.path().to_path_buf())).expect("Failed to load JSON");

    assert_eq!(settings.environment, PosEnvironment::Production);
    assert_eq!(settings.base_url(), "http://127.0.0.1:9999");
    assert_eq!(settings.api_version, "2025-01-23");
    assert_eq!(settings.request_timeout_ms, 5000);
    config::validate(&settings).expect("settings valid");

    let retry = config::retry_config(&settings.retry).expect("retry config");
    assert_eq!(retry.retryable_status_codes.iter().copied().collect::<Vec<_>>(), vec![503]);
    assert_eq!(
        retry.delay_schedule(),
        vec![Duration::from_millis(200), Duration::from_millis(500)]
    );

    let breaker = config::circuit_breaker_config(&settings.circuit_breaker).expect("breaker");
    assert_eq!(breaker.failure_threshold, 2);
    assert_eq!(breaker.reset_timeout, Duration::from_secs(10));
    assert_eq!(breaker.half_open_max_calls, 1);
}

/// Partial TOML files fall back to defaults for everything omitted
#[test]
fn test_partial_toml_uses_defaults() {
    let file = write_config(
        ".toml",
        r#"
[circuit_breaker]
failure_threshold = 3
"#,
    );

    let settings = config::load_from_file(Some(file.path().to_path_buf())).expect("TOML loads");

    assert_eq!(settings.environment, PosEnvironment::Sandbox);
    assert_eq!(settings.circuit_breaker.failure_threshold, 3);
    assert_eq!(settings.circuit_breaker.half_open_max_calls, 3);
    assert_eq!(
        config::retry_config(&settings.retry).expect("retry config").delay_schedule(),
        vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[test]
fn test_invalid_values_in_file_fail_validation() {
    let file = write_config(
        ".toml",
        r#"
[retry]
backoff_multiplier = 1.0
"#,
    );

    let settings = config::load_from_file(Some(file.path().to_path_buf())).expect("parses");
    assert!(matches!(config::validate(&settings), Err(MesaError::Config(_))));
}

#[test]
fn test_malformed_file_is_config_error() {
    let file = write_config(".json", "{ \"retry\": ");
    let result = config::load_from_file(Some(file.path().to_path_buf()));
    assert!(matches!(result, Err(MesaError::Config(_))));
}

/// Environment variables override file values field by field
///
/// # Test Steps
/// 1. Load a TOML file setting the environment and retry count
/// 2. Set `ENVIRONMENT` and a breaker variable
/// 3. Apply overrides
/// 4. Verify env wins where set and the file wins elsewhere
#[test]
fn test_env_overrides_file() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

    let file = write_config(
        ".toml",
        r#"
environment = "production"

[retry]
max_retries = 5
"#,
    );
    let base = config::load_from_file(Some(file.path().to_path_buf())).expect("TOML loads");

    std::env::set_var("ENVIRONMENT", "sandbox");
    std::env::set_var(loader::BREAKER_RESET_TIMEOUT_MS_VAR, "2500");
    let result = loader::apply_env_overrides(base);
    std::env::remove_var("ENVIRONMENT");
    std::env::remove_var(loader::BREAKER_RESET_TIMEOUT_MS_VAR);

    let settings = result.expect("overrides apply");
    assert_eq!(settings.environment, PosEnvironment::Sandbox);
    assert_eq!(settings.retry.max_retries, 5);
    assert_eq!(settings.circuit_breaker.reset_timeout_ms, 2500);
}

#[test]
fn test_unknown_environment_is_config_error() {
    let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

    std::env::set_var("ENVIRONMENT", "staging");
    let result = config::load_from_env();
    std::env::remove_var("ENVIRONMENT");

    assert!(matches!(result, Err(MesaError::Config(msg)) if msg.contains("ENVIRONMENT")));
}
