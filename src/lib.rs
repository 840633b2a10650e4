//! Embygram - Emby to Telegram notification bridge
//!
//! The library crate exposes the components the integration tests drive.

pub mod classifier;
pub mod config;
pub mod emby;
pub mod notify;
pub mod server;
pub mod state;
