// wiser-api: Async Rust client for the Wiser hub (REST + WebSocket push channel)

pub mod client;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod events;
mod loads;
pub mod models;
mod smartbuttons;
pub mod transport;
pub mod websocket;

pub use client::HubClient;
pub use endpoint::HubEndpoint;
pub use error::Error;
pub use events::{DeviceEvent, EventDistributor, Subscription};
pub use models::{
    ButtonAction, ButtonEvent, CtrlButton, CtrlEvent, DeviceId, JSendResponse, JSendStatus, Load,
    LoadCommand, LoadState, LoadType, PushMessage, SmartButton,
};
pub use transport::TransportConfig;
pub use websocket::{ConnectionHandle, ConnectionState, PushConfig, ReconnectPolicy};
