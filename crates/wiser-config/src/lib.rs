//! Shared configuration for Wiser tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `wiser_core::HubConfig`. The CLI adds flag-aware
//! wrappers on top; core never reads files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wiser_core::{HubConfig, ReconnectPolicy};

/// Keyring service name; entries are keyed `<profile>/api-key`.
pub const KEYRING_SERVICE: &str = "wiser";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "WISER_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named hub profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Push channel ping period in seconds; 0 disables the keepalive.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            keepalive_secs: default_keepalive(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_keepalive() -> u64 {
    30
}

/// A named hub profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Hub address, `host` or `host:port` (e.g. "192.168.1.50").
    pub host: String,

    /// API key (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Override REST timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override keepalive period (seconds, 0 disables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_on_abnormal_close: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_on_host_not_found: Option<bool>,
}

impl Config {
    /// Resolve the active profile: explicit name, then `default_profile`,
    /// then "default".
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            "(none)".into()
        } else {
            self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$WISER_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "wiser", "wiser").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wiser");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Layer defaults → TOML file → `WISER_*` environment.
///
/// Nested keys use a double underscore: `WISER_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WISER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/api-key"),
    )?)
}

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_api_key(profile_name: &str, api_key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(api_key)?;
    Ok(())
}

// ── Translation to core ─────────────────────────────────────────────

/// Build a `HubConfig` from a profile, falling back to `defaults`.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }

    let api_key = resolve_api_key(profile, profile_name)?;
    hub_config_with_key(profile, api_key, defaults)
}

/// Build a `HubConfig` from a profile with an already-resolved key.
///
/// Used when the key comes from outside the credential chain (a CLI flag).
pub fn hub_config_with_key(
    profile: &Profile,
    api_key: SecretString,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "no hub host configured".into(),
        });
    }

    let mut config = HubConfig::new(profile.host.trim(), api_key);

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.keepalive_interval = match profile.keepalive_secs.unwrap_or(defaults.keepalive_secs) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    config.reconnect = ReconnectPolicy {
        reconnect_on_abnormal_close: profile.reconnect_on_abnormal_close.unwrap_or(false),
        reconnect_on_host_not_found: profile.reconnect_on_host_not_found.unwrap_or(false),
        ..ReconnectPolicy::default()
    };

    Ok(config)
}

// ── Tests ───────────────────────────────────────────────────────────
