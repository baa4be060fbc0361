//! Runtime for dispatching inbound events
//!
//! Owns the I/O side of the bot: the order store, outbound delivery and the
//! session registry, all behind traits so the dispatcher can run on mocks.

mod executor;
mod sessions;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{Dispatcher, DispatcherSettings};
pub use sessions::InMemorySessionStore;
pub use traits::*;

use crate::telegram::TelegramClient;
use std::sync::Arc;

/// Type alias for the production dispatcher with concrete implementations
pub type ProductionDispatcher =
    Dispatcher<Arc<dyn OrderStore>, TelegramClient, InMemorySessionStore>;
