//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`, turns updates into dialogue events and delivers
//! outbound messages. Only the handful of API methods the bot uses are wrapped.

mod client;
mod poller;
mod types;

pub use client::{TelegramClient, TelegramError};
pub use poller::poll_updates;
pub use types::*;
