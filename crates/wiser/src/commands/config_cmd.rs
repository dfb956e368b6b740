//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, hint: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: hint.into(),
    })
}

/// Apply `config set <key> <value>` to a profile.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "host" => profile.host = value,
        "api_key" | "api-key" => profile.api_key = Some(value),
        "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
        "timeout" => {
            profile.timeout = Some(parse_value(key, &value, "must be a number (seconds)")?);
        }
        "keepalive_secs" | "keepalive-secs" => {
            profile.keepalive_secs = Some(parse_value(
                key,
                &value,
                "must be a number (seconds, 0 disables)",
            )?);
        }
        "reconnect_on_abnormal_close" | "reconnect-on-abnormal-close" => {
            profile.reconnect_on_abnormal_close =
                Some(parse_value(key, &value, "must be 'true' or 'false'")?);
        }
        "reconnect_on_host_not_found" | "reconnect-on-host-not-found" => {
            profile.reconnect_on_host_not_found =
                Some(parse_value(key, &value, "must be 'true' or 'false'")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: host, api_key, api_key_env, \
                     timeout, keepalive_secs, reconnect_on_abnormal_close, \
                     reconnect_on_host_not_found"
                ),
            });
        }
    }
    Ok(())
}

fn init_profile(
    cfg: &mut Config,
    global: &GlobalOpts,
    keyring: bool,
) -> Result<String, CliError> {
    let host = global.host.clone().ok_or_else(|| CliError::Validation {
        field: "host".into(),
        reason: "pass the hub address with --host".into(),
    })?;
    let key = global.api_key.clone().ok_or_else(|| CliError::Validation {
        field: "api_key".into(),
        reason: "pass the hub API key with --api-key".into(),
    })?;
    let name = global.profile.clone().unwrap_or_else(|| "default".into());

    let first = cfg.profiles.is_empty();
    let profile = cfg.profiles.entry(name.clone()).or_default();
    profile.host = host;
    if keyring {
        config::store_api_key(&name, &key)?;
        profile.api_key = None;
    } else {
        profile.api_key = Some(key);
    }

    if first || cfg.default_profile.is_none() {
        cfg.default_profile = Some(name.clone());
    }
    Ok(name)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { keyring } => {
            let mut cfg = config::load_config_or_default();
            let name = init_profile(&mut cfg, global, keyring)?;
            let path = config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
                eprintln!("  Profile: {name}");
                if keyring {
                    eprintln!("  API key stored in system keyring");
                }
                eprintln!("\n  Test it: wiser loads list");
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &config::redacted(&cfg),
                config::format_toml,
                |_| config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!(
                    "No profiles configured. Run: wiser config init --host <address> --api-key <key>"
                );
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            cfg.profile(&name)?;

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}
