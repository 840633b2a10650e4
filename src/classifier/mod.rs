//! Decides what a webhook item means and sends the matching notification.
//!
//! One classification walks forward through fixed stages: fetch the item,
//! wait out missing metadata, branch on the item type, then deliver and
//! record. Dedup keys are `"{name} {year}"` for movies,
//! `"{series} Season {nn}"` for seasons and `"{series} S{nn}E{nn}"` for
//! episodes, so a season announcement suppresses nothing at episode level
//! and vice versa.

pub mod format;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::config::Config;
use crate::emby::types::{ItemDetails, ItemKind, UNKNOWN};
use crate::emby::{EmbyClient, EmbyError};
use crate::notify::Notifier;
use crate::state::NotifiedStore;

/// Terminal result of classifying one webhook item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    MovieAdded,
    SeasonAdded,
    EpisodeAdded { image_fallback: bool },
    AlreadyNotified,
    PremiereTooOld,
    Unsupported,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::MovieAdded => write!(f, "movie notification sent"),
            Outcome::SeasonAdded => write!(f, "season notification sent"),
            Outcome::EpisodeAdded {
                image_fallback: false,
            } => write!(f, "episode notification sent"),
            Outcome::EpisodeAdded {
                image_fallback: true,
            } => write!(f, "episode notification sent with series image"),
            Outcome::AlreadyNotified => write!(f, "notification was already sent"),
            Outcome::PremiereTooOld => write!(f, "premiered too long ago"),
            Outcome::Unsupported => write!(f, "item type not supported"),
        }
    }
}

pub struct Classifier {
    emby: Arc<EmbyClient>,
    notifier: Arc<Notifier>,
    store: Arc<NotifiedStore>,
    episode_premiered_within_days: i64,
    season_added_within_days: i64,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl Classifier {
    pub fn new(
        config: &Config,
        emby: Arc<EmbyClient>,
        notifier: Arc<Notifier>,
        store: Arc<NotifiedStore>,
    ) -> Self {
        Self {
            emby,
            notifier,
            store,
            episode_premiered_within_days: config.episode_premiered_within_days,
            season_added_within_days: config.season_added_within_days,
            poll_interval: Duration::from_secs(config.metadata_poll_secs),
            poll_attempts: config.metadata_poll_attempts,
        }
    }

    /// Classify one item and send whatever notification it warrants.
    ///
    /// Fetch errors abort the run; delivery errors do not, they degrade to
    /// log entries so a Telegram hiccup cannot wedge the dedup state.
    pub async fn classify(&self, item_id: &str) -> Result<Outcome, EmbyError> {
        let item = self.fetch_awaiting_metadata(item_id).await?;

        match item.kind() {
            ItemKind::Movie => Ok(self.handle_movie(item_id, &item).await),
            ItemKind::Episode => self.handle_episode(&item).await,
            ItemKind::Other => {
                tracing::error!("Item type {} not supported", item.type_name());
                Ok(Outcome::Unsupported)
            }
        }
    }

    /// Fetch the item, re-polling while its overview is still unindexed.
    ///
    /// Emby fires the webhook before its metadata scan finishes, so a fresh
    /// item often arrives without an overview. Gives up after the configured
    /// attempt count and proceeds with whatever data is there.
    async fn fetch_awaiting_metadata(&self, item_id: &str) -> Result<ItemDetails, EmbyError> {
        let mut item = self.emby.item_details(item_id).await?;

        if item.has_overview() {
            return Ok(item);
        }

        for _ in 0..self.poll_attempts {
            tracing::info!(
                "Waiting {}s for {} metadata",
                self.poll_interval.as_secs(),
                wait_subject(&item)
            );
            tokio::time::sleep(self.poll_interval).await;

            item = self.emby.item_details(item_id).await?;
            if item.has_overview() {
                return Ok(item);
            }
        }

        tracing::warn!("Timed out waiting for {} metadata", wait_subject(&item));
        Ok(item)
    }

    async fn handle_movie(&self, item_id: &str, item: &ItemDetails) -> Outcome {
        let name = item.display_name();
        let year = item.year_or_unknown();
        let key = format!("{name} {year}");

        if self.store.contains(&key) {
            tracing::info!("(Movie) {} notification was already sent", name);
            return Outcome::AlreadyNotified;
        }

        let title = format::strip_year_suffix(name, &year);
        let runtime = format::format_runtime(item.run_time_ticks);
        let trailer = item.trailer_url().filter(|url| *url != UNKNOWN);
        let message =
            format::movie_message(&title, &year, item.overview_or_unknown(), &runtime, trailer);

        self.store.mark(&key);

        match self.notifier.send(&message, Some(item_id)).await {
            Ok(()) => {
                tracing::info!("(Movie) {} {} notification sent to Telegram", name, year);
            }
            Err(e) => {
                tracing::error!("(Movie) {} notification failed: {}", name, e);
            }
        }

        Outcome::MovieAdded
    }

    async fn handle_episode(&self, item: &ItemDetails) -> Result<Outcome, EmbyError> {
        let year = item.year_or_unknown();
        let series = format::strip_year_suffix(item.series_name_or_unknown(), &year);
        let season_num = format::pad2(item.parent_index_number);
        let episode_num = format::pad2(item.index_number);

        let season = self.emby.item_details(item.season_id_or_unknown()).await?;
        let series_details = self.emby.item_details(item.series_id_or_unknown()).await?;

        let season_key = format!("{series} Season {season_num}");
        let episode_key = format!("{series} S{season_num}E{episode_num}");
        let season_is_recent =
            self.within_last_days(season.created_day(), self.season_added_within_days);

        if !self.store.contains(&season_key) && season_is_recent {
            return Ok(self
                .announce_season(item, &season, &series_details, &series, &year, &season_num)
                .await);
        }

        if !self.store.contains(&episode_key) && !season_is_recent {
            let premiere_day = item.premiere_day();
            if !self.within_last_days(premiere_day, self.episode_premiered_within_days) {
                tracing::info!(
                    "(Episode) {} S{}E{} premiered more than {} days ago",
                    item.series_name_or_unknown(),
                    season_num,
                    episode_num,
                    self.episode_premiered_within_days
                );
                return Ok(Outcome::PremiereTooOld);
            }

            return Ok(self
                .announce_episode(item, &series, &season_num, &episode_num)
                .await);
        }

        tracing::info!(
            "(Episode) {} S{}E{} notification was already sent",
            item.series_name_or_unknown(),
            season_num,
            episode_num
        );
        Ok(Outcome::AlreadyNotified)
    }

    async fn announce_season(
        &self,
        item: &ItemDetails,
        season: &ItemDetails,
        series_details: &ItemDetails,
        series: &str,
        year: &str,
        season_num: &str,
    ) -> Outcome {
        let overview = if season.has_overview() {
            season.overview_or_unknown()
        } else {
            series_details.overview_or_unknown()
        };
        let message = format::season_message(series, year, season_num, overview);

        self.store.mark(&format!("{series} Season {season_num}"));

        match self
            .notifier
            .send(&message, Some(item.season_id_or_unknown()))
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "(Season) {} Season {} notification sent to Telegram",
                    series,
                    season_num
                );
            }
            Err(e) => {
                tracing::error!("(Season) {} notification failed: {}", series, e);
            }
        }

        Outcome::SeasonAdded
    }

    /// Deliver an episode notification, retrying once with the series
    /// image when the season image cannot be used.
    async fn announce_episode(
        &self,
        item: &ItemDetails,
        series: &str,
        season_num: &str,
        episode_num: &str,
    ) -> Outcome {
        let message = format::episode_message(
            item.premiere_day(),
            series,
            season_num,
            episode_num,
            item.display_name(),
            item.overview_or_unknown(),
        );

        self.store.mark(&format!("{series} S{season_num}E{episode_num}"));

        match self
            .notifier
            .send(&message, Some(item.season_id_or_unknown()))
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "(Episode) {} S{}E{} notification sent to Telegram",
                    series,
                    season_num,
                    episode_num
                );
                Outcome::EpisodeAdded {
                    image_fallback: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "(Episode) {} season image unusable ({}), falling back to series image",
                    item.series_name_or_unknown(),
                    e
                );

                match self
                    .notifier
                    .send(&message, Some(item.series_id_or_unknown()))
                    .await
                {
                    Ok(()) => {
                        tracing::info!(
                            "(Episode) {} S{}E{} notification sent to Telegram",
                            series,
                            season_num,
                            episode_num
                        );
                    }
                    Err(e) => {
                        tracing::error!("(Episode) {} notification failed: {}", series, e);
                    }
                }

                Outcome::EpisodeAdded {
                    image_fallback: true,
                }
            }
        }
    }

    fn within_last_days(&self, day: &str, window_days: i64) -> bool {
        is_within_last_days(day, window_days, Utc::now().date_naive())
    }
}

/// Whether `day` (`YYYY-MM-DD`) falls on or after the date `window_days`
/// before `today`. Zero-padded day strings compare lexically in date order;
/// the boundary date itself counts as within the window.
fn is_within_last_days(day: &str, window_days: i64, today: NaiveDate) -> bool {
    let cutoff = today
        .checked_sub_signed(chrono::Duration::days(window_days))
        .unwrap_or(NaiveDate::MIN);
    day >= cutoff.format("%Y-%m-%d").to_string().as_str()
}

fn wait_subject(item: &ItemDetails) -> String {
    match item.kind() {
        ItemKind::Movie => item.display_name().to_string(),
        _ => format!(
            "{} S{}E{}",
            item.series_name_or_unknown(),
            format::pad2(item.parent_index_number),
            format::pad2(item.index_number)
        ),
    }
}
