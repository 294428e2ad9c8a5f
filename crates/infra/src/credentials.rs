//! Tenant credential resolution
//!
//! A tenant may name its POS access token through a free-form credential
//! reference. The reference is normalized and looked up as
//! `ACCESS_TOKEN_<NORMALIZED>`; when that secret is absent the shared
//! `DEFAULT_ACCESS_TOKEN` is used. If neither exists the client cannot be
//! built, which surfaces as a configuration error before any network call.

use std::collections::HashMap;
use std::fmt;

use mesa_domain::constants::{ACCESS_TOKEN_VAR_PREFIX, DEFAULT_ACCESS_TOKEN_VAR};
use mesa_domain::Tenant;
use tracing::debug;

use crate::errors::PosError;

/// Read-only lookup of named secrets
pub trait SecretSource: Send + Sync {
    /// Value of secret `name`; blank values count as absent
    fn get(&self, name: &str) -> Option<String>;
}

/// Secrets from process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretSource;

impl SecretSource for EnvSecretSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.trim().is_empty())
    }
}

/// Fixed in-memory secrets, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticSecretSource {
    secrets: HashMap<String, String>,
}

impl StaticSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticSecretSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { secrets: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl SecretSource for StaticSecretSource {
    fn get(&self, name: &str) -> Option<String> {
        self.secrets.get(name).filter(|value| !value.trim().is_empty()).cloned()
    }
}

impl<S: SecretSource + ?Sized> SecretSource for &S {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

/// A resolved POS access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Normalize a credential reference into a secret-name suffix.
///
/// ASCII letters are uppercased; every character outside `[A-Z0-9]` becomes
/// `_`. `"My Store!"` becomes `"MY_STORE_"`.
pub fn normalize_credential_ref(credential_ref: &str) -> String {
    credential_ref
        .chars()
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            if upper.is_ascii_uppercase() || upper.is_ascii_digit() {
                upper
            } else {
                '_'
            }
        })
        .collect()
}

/// Secret name holding the token for `credential_ref`
pub fn secret_name_for(credential_ref: &str) -> String {
    format!("{ACCESS_TOKEN_VAR_PREFIX}{}", normalize_credential_ref(credential_ref))
}

/// Resolve the POS access token for `tenant`.
///
/// # Errors
/// Returns [`PosError::Config`] naming the secrets that were tried when
/// neither the tenant-specific nor the default secret is set.
pub fn resolve_access_token<S>(tenant: &Tenant, secrets: &S) -> Result<AccessToken, PosError>
where
    S: SecretSource + ?Sized,
{
    let tenant_secret = tenant
        .pos_credential_ref
        .as_deref()
        .filter(|reference| !reference.is_empty())
        .map(secret_name_for);

    if let Some(name) = tenant_secret.as_deref() {
        if let Some(token) = secrets.get(name) {
            debug!(tenant_id = %tenant.id, secret = name, "Resolved tenant POS credential");
            return Ok(AccessToken(token));
        }
    }

    if let Some(token) = secrets.get(DEFAULT_ACCESS_TOKEN_VAR) {
        debug!(
            tenant_id = %tenant.id,
            secret = DEFAULT_ACCESS_TOKEN_VAR,
            "Using default POS credential"
        );
        return Ok(AccessToken(token));
    }

    let tried = match tenant_secret {
        Some(name) => format!("{name} or {DEFAULT_ACCESS_TOKEN_VAR}"),
        None => DEFAULT_ACCESS_TOKEN_VAR.to_string(),
    };
    Err(PosError::Config(format!("no POS access token for tenant {}: set {tried}", tenant.id)))
}
