//! Push channel connection manager.
//!
//! A single coordinator task owns the WebSocket to `ws://<host>/api`. It
//! authenticates with the bearer key at handshake, asks the hub to replay
//! every load state (`dump_loads`), keeps the socket alive with periodic
//! pings, and publishes each decoded push message into an
//! [`EventDistributor`]. The task is driven through a [`ConnectionHandle`]:
//! reconnection is a message to the coordinator, shutdown a cancellation.
//!
//! # Reconnect policy
//!
//! | Session ended by | Default |
//! |---|---|
//! | close frame with any code but 1006 | reconnect immediately |
//! | stream ended without close frame (1006) | stay closed |
//! | host name did not resolve | stay closed |
//! | any other transport error | reconnect |
//! | failed keepalive ping on a closed socket | reconnect |
//!
//! The two "stay closed" rows are configurable through [`ReconnectPolicy`].
//! The very first handshake is never retried automatically; a failure there
//! leaves the manager idle until [`ConnectionHandle::reconnect`] is called.
//!
//! # Example
//!
//! ```rust,ignore
//! use wiser_api::websocket::{ConnectionHandle, PushConfig};
//! use wiser_api::events::EventDistributor;
//! use tokio_util::sync::CancellationToken;
//!
//! let events = EventDistributor::new();
//! let config = PushConfig::new("192.168.1.50", api_key)?;
//! let handle = ConnectionHandle::spawn(config, events.clone(), CancellationToken::new());
//!
//! events.subscribe(DeviceId(7), |event| println!("{event:?}"));
//! // ...
//! handle.shutdown();
//! handle.join().await;
//! ```

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::endpoint::HubEndpoint;
use crate::error::Error;
use crate::events::EventDistributor;
use crate::models::HubCommand;

type WsStream = WebSocketStream<TcpStream>;

/// Close code for a connection that dropped without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code for a close frame without a status payload.
const NO_STATUS_RECEIVED: u16 = 1005;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// When to re-establish the push channel, and how fast.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Reconnect after the stream ended without a close frame. Default: off.
    pub reconnect_on_abnormal_close: bool,

    /// Keep retrying when the hub's host name does not resolve. Default: off.
    pub reconnect_on_host_not_found: bool,

    /// Delay before the second consecutive attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_on_abnormal_close: false,
            reconnect_on_host_not_found: false,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

// ── PushConfig ───────────────────────────────────────────────────────

/// Validated push channel configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    endpoint: HubEndpoint,
    api_key: SecretString,
    /// Ping period while open; `None` or a zero period disables the
    /// keepalive. Default: 30s.
    pub keepalive_interval: Option<Duration>,
    /// Bound on DNS + TCP connect + handshake. Default: 10s.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl PushConfig {
    /// Fails with [`Error::Configuration`] on an empty host or key, or a
    /// host that does not form a valid `ws://<host>/api` URL.
    pub fn new(host: &str, api_key: SecretString) -> Result<Self, Error> {
        let endpoint = HubEndpoint::parse(host)?;
        Self::with_endpoint(endpoint, api_key)
    }

    pub fn with_endpoint(endpoint: HubEndpoint, api_key: SecretString) -> Result<Self, Error> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Configuration {
                field: "api_key",
                reason: "hub API key is missing".into(),
            });
        }
        Ok(Self {
            endpoint,
            api_key,
            keepalive_interval: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        })
    }

    /// Set the ping period. A zero period is the same as `None`.
    pub fn with_keepalive(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval.filter(|period| !period.is_zero());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn endpoint(&self) -> &HubEndpoint {
        &self.endpoint
    }
}

// ── ConnectionState ──────────────────────────────────────────────────

/// Observable lifecycle of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Resolving, dialing or handshaking. `attempt` counts from 1 since the
    /// last successful open.
    Connecting { attempt: u32 },
    Open,
    /// No socket. `reconnecting` is true when a new attempt is scheduled.
    Closed { reconnecting: bool },
    /// The coordinator has exited.
    Shutdown,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            Self::Open => f.write_str("open"),
            Self::Closed { reconnecting: true } => f.write_str("closed, reconnecting"),
            Self::Closed { reconnecting: false } => f.write_str("closed"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

// ── ConnectionHandle ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Control {
    Reconnect,
}

/// Handle to the running coordinator task.
pub struct ConnectionHandle {
    control_tx: mpsc::UnboundedSender<Control>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Spawn the coordinator. The first connection attempt starts right
    /// away on the background task; watch [`state`](Self::state) or
    /// [`state_changes`](Self::state_changes) to learn when it is open.
    pub fn spawn(config: PushConfig, events: EventDistributor, cancel: CancellationToken) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting { attempt: 1 });

        let coordinator = Coordinator {
            config,
            events,
            control_rx,
            state_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(coordinator.run());

        Self {
            control_tx,
            state_rx,
            cancel,
            task,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver notified on every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Ask the coordinator to (re)connect. While open this closes the
    /// current socket and opens a new one. Returns `false` once the
    /// coordinator has exited.
    pub fn reconnect(&self) -> bool {
        self.control_tx.send(Control::Reconnect).is_ok()
    }

    /// Signal the coordinator to close the socket and exit.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the coordinator task to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "push channel task panicked");
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ── Session outcome ──────────────────────────────────────────────────

/// Why a session (or connection attempt) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disconnect {
    /// Close frame received, or 1006 when the stream just ended.
    Closed { code: u16 },
    HostNotFound,
    TransportError,
    /// A keepalive ping found the socket already closed.
    KeepaliveLost,
    /// `reconnect()` while open.
    Requested,
    Shutdown,
}

fn should_reconnect(reason: Disconnect, policy: &ReconnectPolicy) -> bool {
    match reason {
        Disconnect::Closed {
            code: ABNORMAL_CLOSURE,
        } => policy.reconnect_on_abnormal_close,
        Disconnect::HostNotFound => policy.reconnect_on_host_not_found,
        Disconnect::Closed { .. }
        | Disconnect::TransportError
        | Disconnect::KeepaliveLost
        | Disconnect::Requested => true,
        Disconnect::Shutdown => false,
    }
}

/// Map a read-side stream error onto a session outcome.
///
/// Resets and EOFs without a closing handshake are reported as 1006, the
/// same as a stream that simply ended.
fn classify_stream_error(err: &tungstenite::Error) -> Disconnect {
    match err {
        tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
        | tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed => Disconnect::Closed {
            code: ABNORMAL_CLOSURE,
        },
        tungstenite::Error::Io(e)
            if matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
            ) =>
        {
            Disconnect::Closed {
                code: ABNORMAL_CLOSURE,
            }
        }
        _ => Disconnect::TransportError,
    }
}

/// Whether a failed write means the socket is already gone. Writes after
/// either side started the closing handshake fail with `SendAfterClosing`.
fn write_failed_on_closed_socket(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::SendAfterClosing)
    )
}

fn classify_connect_error(err: &Error) -> Disconnect {
    match err {
        Error::HostNotFound { .. } => Disconnect::HostNotFound,
        _ => Disconnect::TransportError,
    }
}

// ── Coordinator ──────────────────────────────────────────────────────

struct Coordinator {
    config: PushConfig,
    events: EventDistributor,
    control_rx: mpsc::UnboundedReceiver<Control>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Main loop: connect → run session → decide → reconnect or idle.
    async fn run(mut self) {
        let url = self.config.endpoint.ws_url().clone();
        // Consecutive failed attempts since the last open.
        let mut failures: u32 = 0;
        let mut is_reconnect = false;

        loop {
            self.set_state(ConnectionState::Connecting {
                attempt: failures + 1,
            });

            let connected = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = open_socket(&self.config) => result,
            };

            let reconnect = match connected {
                Ok(stream) => {
                    info!(url = %url, "push channel open");
                    failures = 0;
                    self.set_state(ConnectionState::Open);

                    let reason = self.run_session(stream).await;
                    info!(?reason, "push channel session ended");
                    should_reconnect(reason, &self.config.reconnect)
                }
                Err(e) if !is_reconnect => {
                    error!(url = %url, error = %e, "push channel handshake failed");
                    false
                }
                Err(e) => {
                    let reason = classify_connect_error(&e);
                    if should_reconnect(reason, &self.config.reconnect) {
                        let delay = calculate_backoff(failures, &self.config.reconnect);
                        failures += 1;
                        warn!(
                            error = %e,
                            attempt = failures,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "push channel reconnect failed, backing off"
                        );
                        self.set_state(ConnectionState::Closed { reconnecting: true });
                        tokio::select! {
                            biased;
                            () = self.cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                        continue;
                    }
                    error!(error = %e, "push channel reconnect failed, giving up");
                    false
                }
            };

            if self.cancel.is_cancelled() {
                break;
            }

            if reconnect {
                self.set_state(ConnectionState::Closed { reconnecting: true });
            } else {
                failures = 0;
                self.set_state(ConnectionState::Closed {
                    reconnecting: false,
                });
                if !self.wait_for_reconnect().await {
                    break;
                }
                info!("push channel reconnect requested");
            }
            is_reconnect = true;
        }

        self.set_state(ConnectionState::Shutdown);
        debug!("push channel coordinator exiting");
    }

    fn set_state(&self, state: ConnectionState) {
        trace!(%state, "push channel state");
        self.state_tx.send_replace(state);
    }

    /// Idle until `reconnect()`. Returns `false` on shutdown or when every
    /// handle is gone.
    async fn wait_for_reconnect(&mut self) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            msg = self.control_rx.recv() => msg.is_some(),
        }
    }

    /// Drive one open socket until it ends. The socket is always closed
    /// before this returns.
    async fn run_session(&mut self, stream: WsStream) -> Disconnect {
        // Requests that arrived while connecting are satisfied by this socket.
        while self.control_rx.try_recv().is_ok() {}

        let (mut write, mut read) = stream.split();

        let dump = codec::encode_command(HubCommand::DumpLoads);
        if let Err(e) = write.send(Message::Text(dump.into())).await {
            warn!(error = %e, "failed to request load dump");
            let reason = classify_stream_error(&e);
            close_socket(write, read).await;
            return reason;
        }
        debug!("requested load dump");

        // The field is public, so a zero period can bypass `with_keepalive`.
        let period = self.config.keepalive_interval.filter(|p| !p.is_zero());
        let mut keepalive = period.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let reason = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break Disconnect::Shutdown,
                Some(Control::Reconnect) = self.control_rx.recv() => {
                    info!("reconnect requested, cycling push channel");
                    break Disconnect::Requested;
                }
                () = next_tick(&mut keepalive) => {
                    match write.send(Message::Ping(Vec::<u8>::new().into())).await {
                        Ok(()) => trace!("keepalive ping sent"),
                        Err(e) => {
                            if let Some(reason) = keepalive_failed(&e, &mut keepalive) {
                                break reason;
                            }
                        }
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &self.events),
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map_or(NO_STATUS_RECEIVED, |cf| u16::from(cf.code));
                        info!(code, "push channel close frame received");
                        break Disconnect::Closed { code };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "push channel stream error");
                        break classify_stream_error(&e);
                    }
                    None => {
                        info!("push channel stream ended without close frame");
                        break Disconnect::Closed { code: ABNORMAL_CLOSURE };
                    }
                },
            }
        };

        close_socket(write, read).await;
        reason
    }
}

/// Stop the timer after a failed ping. The session only ends when the
/// socket turned out to be closed already.
fn keepalive_failed(
    err: &tungstenite::Error,
    keepalive: &mut Option<Interval>,
) -> Option<Disconnect> {
    warn!(error = %err, "keepalive ping failed");
    *keepalive = None;
    write_failed_on_closed_socket(err).then_some(Disconnect::KeepaliveLost)
}

async fn next_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Send a close frame (best effort) and drop both halves.
async fn close_socket(mut write: SplitSink<WsStream, Message>, read: SplitStream<WsStream>) {
    match tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await {
        Ok(Ok(())) => trace!("push channel socket closed"),
        Ok(Err(e)) => debug!(error = %e, "push channel socket already closed"),
        Err(_) => debug!("timed out closing push channel socket"),
    }
    drop(read);
}

/// Decode one text frame and route it. Undecodable frames are dropped.
fn dispatch(text: &str, events: &EventDistributor) {
    match codec::decode_push(text) {
        Ok(Some(msg)) => {
            let id = msg.id();
            let delivered = events.publish_message(msg);
            trace!(%id, delivered, "push message routed");
        }
        Ok(None) => trace!("ignoring push frame without payload"),
        Err(e) => warn!(error = %e, "dropping undecodable push message"),
    }
}

// ── Connecting ───────────────────────────────────────────────────────

/// Resolve, dial and handshake.
async fn open_socket(config: &PushConfig) -> Result<WsStream, Error> {
    let endpoint = &config.endpoint;
    info!(url = %endpoint.ws_url(), "connecting push channel");

    let host = endpoint.host().trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, endpoint.port()))
        .await
        .map_err(|e| {
            debug!(host, error = %e, "host lookup failed");
            Error::HostNotFound {
                host: host.to_owned(),
            }
        })?
        .collect();
    if addrs.is_empty() {
        return Err(Error::HostNotFound {
            host: host.to_owned(),
        });
    }

    let tcp = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addrs.as_slice()))
        .await
        .map_err(|_| Error::WebSocket("connect timed out".into()))?
        .map_err(|e| Error::WebSocket(e.to_string()))?;

    let uri: tungstenite::http::Uri = endpoint
        .ws_url()
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocket(e.to_string()))?;
    let request = ClientRequestBuilder::new(uri).with_header(
        "Authorization",
        format!("Bearer {}", config.api_key.expose_secret()),
    );

    let (stream, _response) = tokio::time::timeout(
        config.connect_timeout,
        tokio_tungstenite::client_async(request, tcp),
    )
    .await
    .map_err(|_| Error::WebSocket("handshake timed out".into()))??;

    Ok(stream)
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
#[allow(clippy::cast_possible_wrap, clippy::as_conversions)]
fn calculate_backoff(attempt: u32, policy: &ReconnectPolicy) -> Duration {
    let exponent = attempt.min(16) as i32;
    let base = policy.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(policy.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
