//! CLI configuration: thin wrapper around `wiser_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--host,
//! --api-key, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use wiser_core::HubConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use wiser_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_api_key,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build a `HubConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile the hub is described by `--host` and
/// `--api-key` alone.
pub fn build_hub_config(global: &GlobalOpts, cfg: &Config) -> Result<HubConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global, cfg);
    }

    // An explicitly requested profile must exist.
    if global.profile.is_some() && global.host.is_none() {
        cfg.profile(&profile_name)?;
    }

    let host = global.host.clone().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let key = global
        .api_key
        .clone()
        .ok_or(CliError::NoCredentials {
            profile: profile_name,
        })?;

    let profile = Profile {
        host,
        ..Profile::default()
    };
    let mut config =
        wiser_config::hub_config_with_key(&profile, SecretString::from(key), &cfg.defaults)?;
    apply_timeout(&mut config, global);
    Ok(config)
}

/// Translate a `Profile` + global flags into a `HubConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<HubConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }

    let key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => wiser_config::resolve_api_key(&profile, profile_name)?,
    };

    let mut config = wiser_config::hub_config_with_key(&profile, key, &cfg.defaults)?;
    apply_timeout(&mut config, global);
    Ok(config)
}

fn apply_timeout(config: &mut HubConfig, global: &GlobalOpts) {
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
}

/// Copy of `cfg` with plaintext keys masked.
pub fn redacted(cfg: &Config) -> Config {
    let mut redacted = cfg.clone();
    for profile in redacted.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some("********".into());
        }
    }
    redacted
}

/// Render the config as TOML.
pub fn format_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("<unrenderable config: {e}>"))
}
