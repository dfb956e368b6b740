// Smart button endpoints

use tracing::debug;

use crate::client::HubClient;
use crate::error::Error;
use crate::models::SmartButton;

impl HubClient {
    /// List every smart button configured on the hub.
    ///
    /// `GET /api/smartbuttons`
    pub async fn list_smart_buttons(&self) -> Result<Vec<SmartButton>, Error> {
        let url = self.api_url("smartbuttons")?;
        debug!("listing smart buttons");
        self.get(url).await
    }
}
