pub mod telegram;

pub use telegram::{NotifyError, TelegramClient};

use std::sync::Arc;

use crate::emby::EmbyClient;

/// Delivers notifications to Telegram, attaching a poster image pulled from
/// Emby when one is requested.
pub struct Notifier {
    telegram: TelegramClient,
    emby: Arc<EmbyClient>,
}

impl Notifier {
    pub fn new(telegram: TelegramClient, emby: Arc<EmbyClient>) -> Self {
        Self { telegram, emby }
    }

    /// Send `text` to the configured chat.
    ///
    /// With an item id the item's primary image is fetched and the text goes
    /// out as its caption; without one it goes out as a plain message. No
    /// retries here; callers decide what a failed delivery means.
    pub async fn send(&self, text: &str, image_item_id: Option<&str>) -> Result<(), NotifyError> {
        match image_item_id {
            Some(item_id) => {
                let photo = self.emby.primary_image(item_id).await?;
                self.telegram.send_photo(photo, text).await
            }
            None => self.telegram.send_message(text).await,
        }
    }
}
