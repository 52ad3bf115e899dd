//! Verifier configuration loaded from environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use browserid_core::primary::{CacheConfig, ResolverConfig, Shim};
use browserid_core::{PublicKey, SecretKey};
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:10000";
const DEFAULT_ROOT_KEY_FILE: &str = "var/root.publickey";
const DEFAULT_WELL_KNOWN_TIMEOUT_SECS: u64 = 10;

/// Errors during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(String),

    /// An environment variable is set to something unusable.
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: String, value: String },

    /// The root key file could not be read or parsed.
    #[error("can't load root public key from {path}: {reason}")]
    RootKey { path: PathBuf, reason: String },
}

/// Verifier runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (e.g. `0.0.0.0:10000`).
    pub bind_addr: String,
    /// Issuer name of this system's own certificate authority.
    pub hostname: String,
    /// Root public key JSON file.
    pub root_key_file: PathBuf,
    /// When true, only certificates issued by `hostname` are accepted.
    pub disable_primary_support: bool,
    /// Local stand-ins for primaries.
    pub shimmed_primaries: Vec<Shim>,
    pub well_known_timeout: Duration,
    /// Fetch support documents over plain http.
    pub well_known_allow_http: bool,
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `VERIFIER_HOSTNAME` is not set and
    /// [`ConfigError::Invalid`] for unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let hostname = lookup("VERIFIER_HOSTNAME")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Missing("VERIFIER_HOSTNAME".to_owned()))?;

        let shimmed_primaries = match lookup("SHIMMED_PRIMARIES") {
            Some(list) => Shim::parse_list(&list).map_err(|_| ConfigError::Invalid {
                var: "SHIMMED_PRIMARIES".to_owned(),
                value: list.clone(),
            })?,
            None => Vec::new(),
        };

        let timeout_secs = parse_number(&lookup, "WELL_KNOWN_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_WELL_KNOWN_TIMEOUT_SECS);

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned()),
            hostname,
            root_key_file: lookup("ROOT_PUBLIC_KEY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_KEY_FILE)),
            disable_primary_support: parse_flag(&lookup, "DISABLE_PRIMARY_SUPPORT")?,
            shimmed_primaries,
            well_known_timeout: Duration::from_secs(timeout_secs),
            well_known_allow_http: parse_flag(&lookup, "WELL_KNOWN_ALLOW_HTTP")?,
            cache: CacheConfig {
                max_entries: parse_number(&lookup, "PRIMARY_CACHE_MAX_ENTRIES")?,
                time_to_live: parse_number(&lookup, "PRIMARY_CACHE_TTL_SECS")?
                    .map(Duration::from_secs),
            },
        })
    }

    /// Resolver settings implied by this configuration
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            enabled: !self.disable_primary_support,
            ..ResolverConfig::default()
        }
    }
}

fn parse_flag<L>(lookup: &L, var: &str) -> Result<bool, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    match lookup(var).as_deref() {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            var: var.to_owned(),
            value: v.to_owned(),
        }),
    }
}

fn parse_number<L>(lookup: &L, var: &str) -> Result<Option<u64>, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: var.to_owned(),
                value: v.clone(),
            })
        })
        .transpose()
}

/// Load the root public key from a JSON file.
///
/// The file may hold a public key or a secret key, in which case the public
/// half is derived from it.
pub fn load_root_public_key(path: &Path) -> Result<PublicKey, ConfigError> {
    let root_key_error = |reason: String| ConfigError::RootKey {
        path: path.to_path_buf(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| root_key_error(e.to_string()))?;

    // Secret key files carry the public parameters too, so try them first
    if let Ok(secret) = SecretKey::from_json(&contents) {
        return Ok(secret.public_key());
    }
    PublicKey::from_json(&contents).map_err(|e| root_key_error(e.to_string()))
}
