use serde::Deserialize;

/// Sentinel Emby itself uses for string fields that are not populated yet.
pub const UNKNOWN: &str = "Unknown";

/// Date stand-in for items with no premiere/created timestamp. Sorts before
/// every real date, so recency checks treat the item as arbitrarily old.
pub const NO_DATE: &str = "0000-00-00";

/// Envelope of the `/emby/Items` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<ItemDetails>,
}

/// Broad classification of an item's `Type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Movie,
    Episode,
    Other,
}

/// Snapshot of one media item as returned by the Items query.
///
/// Every field is optional: Emby omits whatever has not been indexed yet,
/// and a freshly added item can be missing almost everything but its id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDetails {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub production_year: Option<i64>,
    pub premiere_date: Option<String>,
    pub overview: Option<String>,
    pub series_name: Option<String>,
    pub series_id: Option<String>,
    pub season_id: Option<String>,
    pub index_number: Option<i64>,
    pub parent_index_number: Option<i64>,
    pub run_time_ticks: Option<i64>,
    #[serde(default)]
    pub remote_trailers: Vec<RemoteTrailer>,
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteTrailer {
    pub url: Option<String>,
}

impl ItemDetails {
    pub fn kind(&self) -> ItemKind {
        match self.item_type.as_deref() {
            Some("Movie") => ItemKind::Movie,
            Some("Episode") => ItemKind::Episode,
            _ => ItemKind::Other,
        }
    }

    /// Raw `Type` string for logging unsupported items.
    pub fn type_name(&self) -> &str {
        self.item_type.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN)
    }

    /// Whether the synopsis has been populated. An empty string counts as
    /// absent: Emby reports it while metadata indexing is still running.
    pub fn has_overview(&self) -> bool {
        self.overview.as_deref().is_some_and(|o| !o.is_empty())
    }

    pub fn overview_or_unknown(&self) -> &str {
        self.overview.as_deref().filter(|o| !o.is_empty()).unwrap_or(UNKNOWN)
    }

    /// Production year as display text, `"Unknown"` when absent.
    pub fn year_or_unknown(&self) -> String {
        match self.production_year {
            Some(y) => y.to_string(),
            None => UNKNOWN.to_string(),
        }
    }

    pub fn series_name_or_unknown(&self) -> &str {
        self.series_name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn series_id_or_unknown(&self) -> &str {
        self.series_id.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn season_id_or_unknown(&self) -> &str {
        self.season_id.as_deref().unwrap_or(UNKNOWN)
    }

    /// Date part (`YYYY-MM-DD`) of the premiere timestamp.
    pub fn premiere_day(&self) -> &str {
        date_part(self.premiere_date.as_deref())
    }

    /// Date part (`YYYY-MM-DD`) of the library-insertion timestamp.
    pub fn created_day(&self) -> &str {
        date_part(self.date_created.as_deref())
    }

    /// First remote trailer URL, if the item carries one.
    pub fn trailer_url(&self) -> Option<&str> {
        self.remote_trailers.first().and_then(|t| t.url.as_deref())
    }
}

fn date_part(timestamp: Option<&str>) -> &str {
    match timestamp {
        Some(ts) => ts.split('T').next().unwrap_or(NO_DATE),
        None => NO_DATE,
    }
}

/// Inbound webhook payload, PascalCase straight from Emby.
///
/// Two shapes arrive on the same endpoint: a real item event carrying
/// `Item.Id`, and the "Test Notification" the server sends when the admin
/// presses the test button.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookPayload {
    pub title: Option<String>,
    pub server: Option<ServerInfo>,
    pub item: Option<ItemRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRef {
    pub id: Option<String>,
}

impl WebhookPayload {
    /// Whether this is the sample payload Emby sends from the webhook UI.
    pub fn is_test_notification(&self) -> bool {
        self.title.as_deref() == Some("Test Notification")
    }
}
