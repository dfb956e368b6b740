// Shared transport configuration for building reqwest::Client instances.
//
// The hub speaks plain HTTP on the local network, so the only knobs are
// timeouts. Callers that need bounded latency on the push channel handshake
// use `connect_timeout` as well.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("wiser/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout for REST calls.
    pub timeout: Duration,
    /// TCP connect timeout (REST and push channel).
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn builds_client() {
        let config = TransportConfig::default().with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.build_client().is_ok());
    }
}
