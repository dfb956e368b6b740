// Hub REST client
//
// Wraps `reqwest::Client` with bearer authentication, URL construction under
// `/api`, and JSend envelope unwrapping. Endpoint groups (loads, smart
// buttons) are implemented as inherent methods in separate files to keep this
// module focused on transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::endpoint::HubEndpoint;
use crate::error::Error;
use crate::models::{JSendResponse, JSendStatus};
use crate::transport::TransportConfig;

/// Stateless HTTP client for the hub's REST API.
///
/// Every request carries `Authorization: Bearer <key>`. Methods return the
/// unwrapped envelope `data`; nothing is cached and nothing is retried.
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl HubClient {
    /// Create a client for the given hub from a `TransportConfig`.
    pub fn new(
        endpoint: &HubEndpoint,
        api_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, endpoint.rest_url().clone(), api_key)
    }

    /// Create a client with a pre-built `reqwest::Client` and explicit base
    /// URL (everything up to and including `/api`).
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        api_key: SecretString,
    ) -> Result<Self, Error> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Configuration {
                field: "api_key",
                reason: "hub API key is missing".into(),
            });
        }
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// The REST base URL (`http://<host>/api`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and unwrap the envelope.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.get_envelope(url).await?.into_result()
    }

    /// Send a PUT request with JSON body and unwrap the envelope.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        self.put_envelope(url, body).await?.into_result()
    }

    /// Send a GET request and return the envelope, failing on non-success.
    pub(crate) async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<JSendResponse<T>, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_envelope(resp).await
    }

    /// Send a PUT request with JSON body and return the envelope, failing on
    /// non-success.
    pub(crate) async fn put_envelope<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<JSendResponse<T>, Error> {
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_envelope(resp).await
    }

    /// Parse the JSend envelope.
    ///
    /// The hub reports most failures as a JSend `error`/`fail` envelope,
    /// sometimes with a 4xx/5xx status; those become [`Error::Api`]. A
    /// non-2xx response without an envelope becomes [`Error::Http`]. `data`
    /// is only decoded into `T` once the envelope reports success, since
    /// `fail` envelopes carry free-form details there.
    async fn parse_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<JSendResponse<T>, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        let raw: JSendResponse<serde_json::Value> = match serde_json::from_str(&body) {
            Ok(raw) => raw,
            Err(e) if status.is_success() => {
                let preview: String = body.chars().take(200).collect();
                return Err(Error::Decode {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                });
            }
            Err(_) => return Err(Self::http_error(status, &body, None)),
        };

        match raw.status {
            JSendStatus::Success if status.is_success() => {
                let data = raw
                    .data
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| Error::decode(&e, &body))?;
                Ok(JSendResponse {
                    status: raw.status,
                    data,
                    message: raw.message,
                })
            }
            JSendStatus::Success => Err(Self::http_error(status, &body, raw.message)),
            failed => Err(Error::Api {
                status: failed,
                message: raw.message.unwrap_or_else(|| failed.to_string()),
            }),
        }
    }

    fn http_error(status: reqwest::StatusCode, body: &str, message: Option<String>) -> Error {
        Error::Http {
            status: status.as_u16(),
            body: message.unwrap_or_else(|| body.chars().take(200).collect()),
        }
    }
}
