//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Credential resolution
pub const DEFAULT_ACCESS_TOKEN_VAR: &str = "DEFAULT_ACCESS_TOKEN";
pub const ACCESS_TOKEN_VAR_PREFIX: &str = "ACCESS_TOKEN_";
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

// POS provider endpoints
pub const SANDBOX_BASE_URL: &str = "https://connect.squareupsandbox.com";
pub const PRODUCTION_BASE_URL: &str = "https://connect.squareup.com";
pub const DEFAULT_POS_API_VERSION: &str = "2024-10-17";
pub const POS_API_VERSION_HEADER: &str = "Square-Version";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

// Circuit breaker defaults
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_HALF_OPEN_MAX_CALLS: u32 = 3;

// Pagination
pub const PAGE_SIZE: u32 = 100;
pub const MAX_PAGINATED_RESULTS: usize = 1_000;
