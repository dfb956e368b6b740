// Load endpoints
//
// Discovery (`/loads`), state read (`/loads/{id}/state`), target-state write
// (`/loads/{id}/target_state`) and button emulation (`/loads/{id}/ctrl`).

use tracing::debug;

use crate::client::HubClient;
use crate::error::Error;
use crate::models::{DeviceId, JSendResponse, Load, LoadCommand, LoadState, LoadStateRecord};

impl HubClient {
    /// List every load known to the hub.
    ///
    /// `GET /api/loads`
    pub async fn list_loads(&self) -> Result<Vec<Load>, Error> {
        let url = self.api_url("loads")?;
        debug!("listing loads");
        self.get(url).await
    }

    /// Read the current state of a load.
    ///
    /// `GET /api/loads/{id}/state`
    pub async fn get_load_state(&self, id: DeviceId) -> Result<LoadState, Error> {
        let url = self.api_url(&format!("loads/{id}/state"))?;
        debug!(%id, "fetching load state");
        let record: LoadStateRecord = self.get(url).await?;
        Ok(record.state)
    }

    /// Set the target state of a load. Returns the state confirmed by the hub.
    ///
    /// `PUT /api/loads/{id}/target_state`
    pub async fn set_load_state(&self, id: DeviceId, state: &LoadState) -> Result<LoadState, Error> {
        let url = self.api_url(&format!("loads/{id}/target_state"))?;
        debug!(%id, ?state, "setting load target state");
        let record: LoadStateRecord = self.put(url, state).await?;
        Ok(record.state)
    }

    /// Emulate a button press on a load. Returns the hub's acknowledgement.
    ///
    /// `PUT /api/loads/{id}/ctrl`
    pub async fn control_load(
        &self,
        id: DeviceId,
        command: LoadCommand,
    ) -> Result<JSendResponse<serde_json::Value>, Error> {
        let url = self.api_url(&format!("loads/{id}/ctrl"))?;
        debug!(%id, button = %command.button, event = %command.event, "sending load control");
        self.put_envelope(url, &command).await
    }
}
