// ── Runtime connection configuration ──
//
// Describes *how* to reach a hub: address, credential and tuning. Never
// touches disk; the CLI builds a `HubConfig` and hands it in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use wiser_api::{HubEndpoint, PushConfig, ReconnectPolicy, TransportConfig};

use crate::error::CoreError;

/// Configuration for talking to a single hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub address, `host` or `host:port` without a scheme.
    pub host: String,
    /// Static bearer key.
    pub api_key: SecretString,
    /// REST request timeout.
    pub timeout: Duration,
    /// Push channel ping period; `None` or zero disables the keepalive.
    pub keepalive_interval: Option<Duration>,
    pub reconnect: ReconnectPolicy,
}

impl HubConfig {
    pub fn new(host: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            host: host.into(),
            api_key,
            timeout: Duration::from_secs(30),
            keepalive_interval: Some(Duration::from_secs(30)),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Fail fast on a missing host or key.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.endpoint()?;
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(CoreError::Config {
                message: "hub API key is missing".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self) -> Result<HubEndpoint, CoreError> {
        Ok(HubEndpoint::parse(&self.host)?)
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(self.timeout)
    }

    pub(crate) fn push_config(&self) -> Result<PushConfig, CoreError> {
        let config = PushConfig::with_endpoint(self.endpoint()?, self.api_key.clone())?
            .with_keepalive(self.keepalive_interval)
            .with_reconnect_policy(self.reconnect.clone());
        Ok(config)
    }
}
