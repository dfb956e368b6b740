// wiser-core: Hub facade between wiser-api and consumers (CLI, integrations).

pub mod config;
pub mod error;
pub mod hub;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::HubConfig;
pub use error::CoreError;
pub use hub::Hub;

// Re-export the wire model at the crate root for ergonomics.
pub use wiser_api::{
    ButtonAction, ButtonEvent, ConnectionState, CtrlButton, CtrlEvent, DeviceEvent, DeviceId,
    JSendResponse, JSendStatus, Load, LoadCommand, LoadState, LoadType, ReconnectPolicy,
    SmartButton, Subscription,
};
