pub mod client;
pub mod types;

pub use client::{EmbyClient, EmbyError};
pub use types::{ItemDetails, ItemKind, WebhookPayload};
