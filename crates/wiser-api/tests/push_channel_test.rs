// Integration tests for the push channel against a local WebSocket hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;

use wiser_api::{
    ButtonAction, ConnectionHandle, ConnectionState, DeviceEvent, DeviceId, EventDistributor,
    PushConfig,
};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(750);

// ── Test hub ────────────────────────────────────────────────────────

struct Session {
    auth: Option<String>,
    path: String,
    ws: WebSocketStream<TcpStream>,
}

impl Session {
    async fn next_message(&mut self) -> Message {
        timeout(WAIT, self.ws.next())
            .await
            .expect("timed out waiting for client frame")
            .expect("client stream ended")
            .expect("client stream error")
    }

    async fn next_text(&mut self) -> String {
        loop {
            if let Message::Text(text) = self.next_message().await {
                return text.as_str().to_owned();
            }
        }
    }

    async fn send_text(&mut self, text: &str) {
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    /// Read until the client side is gone; panics if it stays open.
    async fn expect_closed(&mut self) {
        loop {
            match timeout(WAIT, self.ws.next()).await {
                Ok(None | Some(Err(_))) => return,
                Ok(Some(Ok(_))) => {}
                Err(_) => panic!("old socket was not closed"),
            }
        }
    }
}

struct TestHub {
    addr: SocketAddr,
    sessions: mpsc::UnboundedReceiver<Session>,
    attempts: Arc<AtomicUsize>,
}

impl TestHub {
    /// Start a hub that rejects the first `reject` handshakes with 401.
    async fn start(reject: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, sessions) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let rejects = Arc::new(AtomicUsize::new(reject));

        let counter = Arc::clone(&attempts);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let reject = rejects
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();

                let mut auth = None;
                let mut path = String::new();
                let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    auth = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    path = req.uri().path().to_owned();
                    if reject {
                        let mut err = ErrorResponse::new(Some("unauthorized".into()));
                        *err.status_mut() = StatusCode::UNAUTHORIZED;
                        return Err(err);
                    }
                    Ok(resp)
                };

                if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    let _ = tx.send(Session { auth, path, ws });
                }
            }
        });

        Self {
            addr,
            sessions,
            attempts,
        }
    }

    fn config(&self) -> PushConfig {
        PushConfig::new(&self.addr.to_string(), SecretString::from("test-key"))
            .unwrap()
            .with_keepalive(None)
    }

    async fn next_session(&mut self) -> Session {
        timeout(WAIT, self.sessions.recv())
            .await
            .expect("timed out waiting for handshake")
            .expect("hub listener stopped")
    }

    async fn assert_no_session(&mut self) {
        assert!(
            timeout(QUIET, self.sessions.recv()).await.is_err(),
            "unexpected new handshake"
        );
    }

    /// Accept a session and consume the `dump_loads` request.
    async fn open_session(&mut self) -> Session {
        let mut session = self.next_session().await;
        assert_eq!(session.next_text().await, r#"{"command":"dump_loads"}"#);
        session
    }
}

async fn wait_for_state(handle: &ConnectionHandle, want: ConnectionState) {
    let mut states = handle.state_changes();
    timeout(WAIT, states.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want}, at {}", handle.state()))
        .unwrap();
}

async fn recv_event(rx: &mut mpsc::UnboundedReceiver<DeviceEvent>) -> DeviceEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("subscription closed")
}

fn spawn(hub: &TestHub, events: &EventDistributor) -> ConnectionHandle {
    ConnectionHandle::spawn(hub.config(), events.clone(), CancellationToken::new())
}

// ── Handshake ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_sends_bearer_and_dump_loads() {
    let mut hub = TestHub::start(0).await;
    let handle = spawn(&hub, &EventDistributor::new());

    let mut session = hub.next_session().await;
    assert_eq!(session.auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(session.path, "/api");
    assert_eq!(session.next_text().await, r#"{"command":"dump_loads"}"#);

    wait_for_state(&handle, ConnectionState::Open).await;
    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_keepalive_sends_pings() {
    let mut hub = TestHub::start(0).await;
    let config = hub.config().with_keepalive(Some(Duration::from_millis(100)));
    let handle = ConnectionHandle::spawn(config, EventDistributor::new(), CancellationToken::new());

    let mut session = hub.open_session().await;
    assert!(matches!(session.next_message().await, Message::Ping(_)));
    assert!(matches!(session.next_message().await, Message::Ping(_)));

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_zero_keepalive_keeps_session_running() {
    let mut hub = TestHub::start(0).await;
    let events = EventDistributor::new();
    let (_sub, mut rx) = events.subscribe_channel(DeviceId(7));
    let mut config = hub.config().with_keepalive(Some(Duration::ZERO));
    assert_eq!(config.keepalive_interval, None);
    // Bypass the builder through the public field.
    config.keepalive_interval = Some(Duration::ZERO);
    let handle = ConnectionHandle::spawn(config, events, CancellationToken::new());

    let mut session = hub.open_session().await;
    wait_for_state(&handle, ConnectionState::Open).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!handle.is_finished(), "coordinator must survive a zero period");

    session
        .send_text(r#"{"load":{"id":7,"state":{"bri":5}}}"#)
        .await;
    assert!(matches!(recv_event(&mut rx).await, DeviceEvent::Load(_)));
    assert_eq!(handle.state(), ConnectionState::Open);

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_close_during_keepalive_reconnects_exactly_once() {
    let mut hub = TestHub::start(0).await;
    let config = hub.config().with_keepalive(Some(Duration::from_millis(20)));
    let handle = ConnectionHandle::spawn(config, EventDistributor::new(), CancellationToken::new());

    let mut old = hub.open_session().await;
    assert!(matches!(old.next_message().await, Message::Ping(_)));
    // Either the pending ping or the reader sees the closed socket first;
    // both must end in a single new handshake.
    old.ws
        .close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "restart".into(),
        }))
        .await
        .unwrap();

    let mut new = hub.open_session().await;
    old.expect_closed().await;
    hub.assert_no_session().await;
    assert_eq!(hub.attempts.load(Ordering::SeqCst), 2);

    // The fresh session has its own timer.
    assert!(matches!(new.next_message().await, Message::Ping(_)));

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_initial_handshake_failure_waits_for_reconnect() {
    let mut hub = TestHub::start(1).await;
    let handle = spawn(&hub, &EventDistributor::new());

    wait_for_state(&handle, ConnectionState::Closed { reconnecting: false }).await;
    hub.assert_no_session().await;
    assert_eq!(hub.attempts.load(Ordering::SeqCst), 1);

    assert!(handle.reconnect());
    let _session = hub.open_session().await;
    wait_for_state(&handle, ConnectionState::Open).await;

    handle.shutdown();
    handle.join().await;
}

// ── Routing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_load_update_reaches_subscriber_once() {
    let mut hub = TestHub::start(0).await;
    let events = EventDistributor::new();
    let (_sub, mut rx) = events.subscribe_channel(DeviceId(7));
    let handle = spawn(&hub, &events);

    let mut session = hub.open_session().await;
    session
        .send_text(r#"{"load":{"id":7,"state":{"bri":50}}}"#)
        .await;
    // Nobody listens on 8: dropped silently.
    session
        .send_text(r#"{"load":{"id":8,"state":{"bri":1}}}"#)
        .await;

    let DeviceEvent::Load(state) = recv_event(&mut rx).await else {
        panic!("expected load state");
    };
    assert_eq!(state.bri(), Some(50));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err(), "exactly one callback expected");
    assert_eq!(handle.state(), ConnectionState::Open);

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_button_event_reaches_only_its_subscribers() {
    let mut hub = TestHub::start(0).await;
    let events = EventDistributor::new();
    let (_three, mut rx3) = events.subscribe_channel(DeviceId(3));
    let (_four, mut rx4) = events.subscribe_channel(DeviceId(4));
    let handle = spawn(&hub, &events);

    let mut session = hub.open_session().await;
    session
        .send_text(r#"{"smb":{"id":3,"action":"double"}}"#)
        .await;

    let DeviceEvent::Button(press) = recv_event(&mut rx3).await else {
        panic!("expected button event");
    };
    assert_eq!(press.id, DeviceId(3));
    assert_eq!(press.action, ButtonAction::Double);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx4.try_recv().is_err());

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_malformed_json_does_not_break_session() {
    let mut hub = TestHub::start(0).await;
    let events = EventDistributor::new();
    let (_sub, mut rx) = events.subscribe_channel(DeviceId(7));
    let handle = spawn(&hub, &events);

    let mut session = hub.open_session().await;
    session.send_text("{this is not json").await;
    session
        .send_text(r#"{"load":{"id":7},"smb":{"id":7,"action":"click"}}"#)
        .await;
    session.send_text(r#"{"hello":"hub"}"#).await;
    session
        .send_text(r#"{"load":{"id":7,"state":{"bri":75}}}"#)
        .await;

    let DeviceEvent::Load(state) = recv_event(&mut rx).await else {
        panic!("expected load state");
    };
    assert_eq!(state.bri(), Some(75));
    assert_eq!(handle.state(), ConnectionState::Open);
    hub.assert_no_session().await;

    handle.shutdown();
    handle.join().await;
}

// ── Reconnect policy ────────────────────────────────────────────────

#[tokio::test]
async fn test_normal_close_reconnects_exactly_once() {
    let mut hub = TestHub::start(0).await;
    let events = EventDistributor::new();
    let (_sub, mut rx) = events.subscribe_channel(DeviceId(7));
    let handle = spawn(&hub, &events);

    let mut old = hub.open_session().await;
    old.ws
        .close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "restart".into(),
        }))
        .await
        .unwrap();

    let mut new = hub.open_session().await;
    old.expect_closed().await;
    hub.assert_no_session().await;
    assert_eq!(hub.attempts.load(Ordering::SeqCst), 2);

    // Events keep flowing on the new socket.
    new.send_text(r#"{"load":{"id":7,"state":{"bri":10}}}"#)
        .await;
    assert!(matches!(recv_event(&mut rx).await, DeviceEvent::Load(_)));

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_abnormal_close_does_not_reconnect() {
    let mut hub = TestHub::start(0).await;
    let handle = spawn(&hub, &EventDistributor::new());

    let session = hub.open_session().await;
    wait_for_state(&handle, ConnectionState::Open).await;
    // Drop the TCP connection without a close frame.
    drop(session);

    wait_for_state(&handle, ConnectionState::Closed { reconnecting: false }).await;
    hub.assert_no_session().await;
    assert_eq!(hub.attempts.load(Ordering::SeqCst), 1);

    // An explicit reconnect still works.
    assert!(handle.reconnect());
    let _session = hub.open_session().await;

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_reconnect_while_open_cycles_socket() {
    let mut hub = TestHub::start(0).await;
    let handle = spawn(&hub, &EventDistributor::new());

    let mut old = hub.open_session().await;
    wait_for_state(&handle, ConnectionState::Open).await;

    assert!(handle.reconnect());
    let _new = hub.open_session().await;
    old.expect_closed().await;
    hub.assert_no_session().await;

    handle.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn test_shutdown_closes_socket() {
    let mut hub = TestHub::start(0).await;
    let handle = spawn(&hub, &EventDistributor::new());

    let mut session = hub.open_session().await;
    handle.shutdown();

    match timeout(WAIT, session.ws.next()).await.unwrap() {
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {}
        Some(Ok(other)) => panic!("expected close, got {other:?}"),
    }

    let states = handle.state_changes();
    handle.join().await;
    assert_eq!(*states.borrow(), ConnectionState::Shutdown);
    hub.assert_no_session().await;
}
