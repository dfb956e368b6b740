// ── Hub facade ──
//
// Single entry point for consumers. Owns the REST client, the event
// registry and (once connected) the push channel coordinator. REST calls
// work without a push connection; subscriptions can be registered before
// or after connecting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use wiser_api::{
    ConnectionHandle, ConnectionState, DeviceEvent, DeviceId, EventDistributor, HubClient,
    JSendResponse, Load, LoadCommand, LoadState, SmartButton, Subscription,
};

use crate::config::HubConfig;
use crate::error::CoreError;

/// Handle to one hub.
///
/// Cheaply cloneable via `Arc<HubInner>`.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    client: HubClient,
    events: EventDistributor,
    cancel: CancellationToken,
    connection: Mutex<Option<ConnectionHandle>>,
}

impl Drop for HubInner {
    /// Stop a push channel the last handle never shut down.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Hub {
    /// Validate the configuration and build the REST client. Does NOT open
    /// the push channel; call [`connect()`](Self::connect) for that.
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = HubClient::new(
            &config.endpoint()?,
            config.api_key.clone(),
            &config.transport(),
        )?;

        Ok(Self {
            inner: Arc::new(HubInner {
                config,
                client,
                events: EventDistributor::new(),
                cancel: CancellationToken::new(),
                connection: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// The registry push events are published into.
    pub fn events(&self) -> &EventDistributor {
        &self.inner.events
    }

    // ── REST ─────────────────────────────────────────────────────────

    pub async fn list_loads(&self) -> Result<Vec<Load>, CoreError> {
        self.inner
            .client
            .list_loads()
            .await
            .map_err(|e| self.translate(e))
    }

    pub async fn list_smart_buttons(&self) -> Result<Vec<SmartButton>, CoreError> {
        self.inner
            .client
            .list_smart_buttons()
            .await
            .map_err(|e| self.translate(e))
    }

    pub async fn get_load_state(&self, id: DeviceId) -> Result<LoadState, CoreError> {
        self.inner
            .client
            .get_load_state(id)
            .await
            .map_err(|e| self.translate(e))
    }

    pub async fn set_load_state(
        &self,
        id: DeviceId,
        state: &LoadState,
    ) -> Result<LoadState, CoreError> {
        self.inner
            .client
            .set_load_state(id, state)
            .await
            .map_err(|e| self.translate(e))
    }

    pub async fn control_load(
        &self,
        id: DeviceId,
        command: LoadCommand,
    ) -> Result<JSendResponse<serde_json::Value>, CoreError> {
        self.inner
            .client
            .control_load(id, command)
            .await
            .map_err(|e| self.translate(e))
    }

    /// Fill in the configured timeout, which the api layer does not know.
    fn translate(&self, err: wiser_api::Error) -> CoreError {
        match CoreError::from(err) {
            CoreError::Timeout { .. } => CoreError::Timeout {
                timeout_secs: self.inner.config.timeout.as_secs(),
            },
            other => other,
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a callback for push events of `id`.
    pub fn subscribe<F>(&self, id: DeviceId, callback: F) -> Subscription
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(id, callback)
    }

    /// Register a channel for push events of `id`.
    pub fn subscribe_channel(
        &self,
        id: DeviceId,
    ) -> (Subscription, mpsc::UnboundedReceiver<DeviceEvent>) {
        self.inner.events.subscribe_channel(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.inner.events.unsubscribe(subscription)
    }

    // ── Push channel lifecycle ───────────────────────────────────────

    /// Start the push channel coordinator. A no-op while one is running.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut slot = self.inner.connection.lock().await;
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("push channel already running");
            return Ok(());
        }

        let push = self.inner.config.push_config()?;
        info!(host = %self.inner.config.host, "starting push channel");
        *slot = Some(ConnectionHandle::spawn(
            push,
            self.inner.events.clone(),
            self.inner.cancel.child_token(),
        ));
        Ok(())
    }

    /// Wait until the push channel is open.
    ///
    /// Fails with [`CoreError::ConnectionFailed`] once the manager gives up
    /// and with [`CoreError::Timeout`] after `timeout`.
    pub async fn wait_until_open(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut states = {
            let slot = self.inner.connection.lock().await;
            slot.as_ref().ok_or(CoreError::NotConnected)?.state_changes()
        };

        let settled = tokio::time::timeout(
            timeout,
            states.wait_for(|s| {
                matches!(
                    s,
                    ConnectionState::Open
                        | ConnectionState::Closed {
                            reconnecting: false
                        }
                        | ConnectionState::Shutdown
                )
            }),
        )
        .await
        .map_err(|_| CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
        })?
        .map(|s| *s)
        .map_err(|_| CoreError::NotConnected)?;

        match settled {
            ConnectionState::Open => Ok(()),
            ConnectionState::Shutdown => Err(CoreError::NotConnected),
            _ => Err(CoreError::ConnectionFailed {
                host: self.inner.config.host.clone(),
                reason: "push channel handshake failed".into(),
            }),
        }
    }

    /// Ask the push channel to reconnect (cycles the socket while open).
    pub async fn reconnect(&self) -> Result<(), CoreError> {
        let slot = self.inner.connection.lock().await;
        match slot.as_ref() {
            Some(handle) if handle.reconnect() => Ok(()),
            _ => Err(CoreError::NotConnected),
        }
    }

    /// Current push channel state; `Closed` before [`connect()`](Self::connect).
    pub async fn connection_state(&self) -> ConnectionState {
        self.inner
            .connection
            .lock()
            .await
            .as_ref()
            .map_or(ConnectionState::Closed { reconnecting: false }, ConnectionHandle::state)
    }

    /// Close the push channel and wait for its task to exit. REST calls
    /// keep working; `connect()` may be called again.
    pub async fn shutdown(&self) {
        let handle = self.inner.connection.lock().await.take();
        if let Some(handle) = handle {
            handle.shutdown();
            handle.join().await;
            debug!("push channel stopped");
        }
    }
}
