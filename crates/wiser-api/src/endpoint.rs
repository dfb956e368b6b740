// Hub endpoint addressing
//
// Both channels live under `/api` on the same host: REST at
// `http://<host>/api`, the push channel at `ws://<host>/api`.

use url::Url;

use crate::error::Error;

/// Validated hub address (`host` or `host:port`, no scheme).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEndpoint {
    authority: String,
    rest_url: Url,
    ws_url: Url,
}

impl HubEndpoint {
    /// Validate a hub address.
    ///
    /// Fails with [`Error::Configuration`] when the host is blank, carries a
    /// scheme or path, or does not form a valid URL.
    pub fn parse(host: &str) -> Result<Self, Error> {
        let authority = host.trim();
        if authority.is_empty() {
            return Err(Error::Configuration {
                field: "host",
                reason: "hub host is missing".into(),
            });
        }
        if authority.contains("://") || authority.contains('/') {
            return Err(Error::Configuration {
                field: "host",
                reason: format!("expected a bare host or host:port, got '{authority}'"),
            });
        }

        let rest_url = Url::parse(&format!("http://{authority}/api")).map_err(|e| {
            Error::Configuration {
                field: "host",
                reason: format!("'{authority}' is not a valid host: {e}"),
            }
        })?;
        let ws_url = Url::parse(&format!("ws://{authority}/api"))?;

        Ok(Self {
            authority: authority.to_owned(),
            rest_url,
            ws_url,
        })
    }

    /// `host[:port]` as configured.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Host name or address without the port.
    pub fn host(&self) -> &str {
        self.ws_url.host_str().unwrap_or(&self.authority)
    }

    /// Port to dial (80 unless configured).
    pub fn port(&self) -> u16 {
        self.ws_url.port_or_known_default().unwrap_or(80)
    }

    /// `http://<host>/api`
    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    /// `ws://<host>/api`
    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }
}
