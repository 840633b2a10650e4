//! Telegram message templates and the small text helpers behind them.
//!
//! Everything here is pure string work. Messages use Telegram's Markdown
//! parse mode, so `*bold*` markers and raw newlines are significant.

use crate::emby::types::UNKNOWN;

/// Emby stores runtimes in 100-nanosecond ticks.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Render a tick count as `HH:MM:SS`. Missing runtimes render as 00:00:00.
pub fn format_runtime(ticks: Option<i64>) -> String {
    let total_secs = ticks.unwrap_or(0) / TICKS_PER_SECOND;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Drop a `" (year)"` suffix some libraries embed in titles.
///
/// `"Dune (2020)"` with year `"2020"` becomes `"Dune"`; names without the
/// suffix pass through untouched.
pub fn strip_year_suffix(name: &str, year: &str) -> String {
    name.replace(&format!(" ({year})"), "").trim().to_string()
}

/// Zero-pad a season or episode index to width 2, `"Unknown"` when absent.
pub fn pad2(index: Option<i64>) -> String {
    match index {
        Some(n) => format!("{:02}", n),
        None => UNKNOWN.to_string(),
    }
}

pub fn movie_message(
    title: &str,
    year: &str,
    overview: &str,
    runtime: &str,
    trailer_url: Option<&str>,
) -> String {
    let mut message = format!(
        "*🍿New Movie Added🍿*\n\n*{title}* *({year})*\n\n{overview}\n\nRuntime\n{runtime}"
    );

    if let Some(url) = trailer_url {
        message.push_str(&format!("\n\n[🎥]({url})[Trailer]({url})"));
    }

    message
}

pub fn season_message(series: &str, year: &str, season_num: &str, overview: &str) -> String {
    format!("*New Season Added*\n\n*{series}* *({year})*\n\n*Season* *{season_num}*\n\n{overview}\n\n")
}

pub fn episode_message(
    premiere_date: &str,
    series: &str,
    season_num: &str,
    episode_num: &str,
    title: &str,
    overview: &str,
) -> String {
    format!(
        "*New Episode Added*\n\n*Release Date*: {premiere_date}\n\n*Series*: {series} \
         *S*{season_num}*E*{episode_num}\n*Episode Title*: {title}\n\n{overview}\n\n"
    )
}

/// Reply to the sample payload Emby sends from the webhook settings page.
pub fn test_message(server_name: &str, version: &str) -> String {
    format!("Success!\n\n*Server Name*: {server_name}\n\n*Server Version*: {version}")
}
