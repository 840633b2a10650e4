use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;

use crate::emby::types::{ItemDetails, ItemsResponse};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra item fields requested from the Items endpoint. The default
/// projection omits all of these.
const ITEM_FIELDS: &str =
    "Overview,PremiereDate,ProviderIds,RemoteTrailers,ProductionYear,DateCreated";

#[derive(Debug, Error)]
pub enum EmbyError {
    #[error("Emby request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("no library item with id {0}")]
    NotFound(String),
}

/// Client for the Emby server REST API.
pub struct EmbyClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EmbyClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch the full detail record for one library item.
    ///
    /// Queries `/emby/Items` filtered to the given id. A well-formed reply
    /// with an empty `Items` array means the id is unknown to the server.
    pub async fn item_details(&self, item_id: &str) -> Result<ItemDetails, EmbyError> {
        let url = format!("{}/emby/Items", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("Recursive", "true"),
                ("Fields", ITEM_FIELDS),
                ("Ids", item_id),
            ])
            .send()
            .await?
            .error_for_status()?;

        let items: ItemsResponse = response.json().await?;
        items
            .items
            .into_iter()
            .next()
            .ok_or_else(|| EmbyError::NotFound(item_id.to_string()))
    }

    /// Fetch an item's primary poster image as raw bytes.
    ///
    /// Image routes are served without the API key.
    pub async fn primary_image(&self, item_id: &str) -> Result<Bytes, EmbyError> {
        let url = format!("{}/Items/{}/Images/Primary", self.base_url, item_id);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }
}
