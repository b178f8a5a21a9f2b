//! Credential loading from the process environment and a runtime `.env` file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

/// Key/value pairs loaded from a `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Load credentials from a specific `.env` path.
///
/// A missing file yields empty credentials.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        debug!(path = %path.display(), "no credentials file");
        return Ok(Credentials::default());
    }

    warn_if_shared(path);

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

#[cfg(unix)]
fn warn_if_shared(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = %format_args!("{mode:o}"),
                "credentials file is readable by other users; expected 0600"
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_shared(_path: &Path) {}

// ---------------------------------------------------------------------------
// API key
// ---------------------------------------------------------------------------

/// Secret key for the generative-text API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

impl ApiKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Resolve the API key named `var`.
///
/// Resolution order:
/// 1. Process environment (through `env`)
/// 2. Loaded `.env` credentials
///
/// Blank values are ignored. Returns `None` when neither source has a key.
pub fn resolve_api_key(
    var: &str,
    credentials: &Credentials,
    env: impl Fn(&str) -> Option<String>,
) -> Option<ApiKey> {
    if let Some(key) = env(var).filter(|k| !k.trim().is_empty()) {
        debug!(var, "using API key from environment");
        return Some(ApiKey::new(key.trim()));
    }

    if let Some(key) = credentials.get(var).filter(|k| !k.trim().is_empty()) {
        debug!(var, "using API key from .env");
        return Some(ApiKey::new(key.trim()));
    }

    None
}
