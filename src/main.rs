//! Order intake bot
//!
//! A Telegram bot that walks customers through a scripted order dialogue and
//! relays price quotes between administrators and customers.

mod config;
mod db;
mod runtime;
mod state_machine;
mod telegram;

use config::{BotConfig, StoreBackend};
use db::{Database, JsonFileStore};
use runtime::{InMemorySessionStore, OrderStore, ProductionDispatcher};
use std::sync::Arc;
use std::time::Duration;
use telegram::TelegramClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headroom on top of the long-poll timeout before the HTTP request gives up
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_intake_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;
    if config.admin_ids.is_empty() {
        tracing::warn!("No administrators configured. Set ORDER_BOT_ADMIN_IDS.");
    }

    // Ensure store directory exists
    if let Some(parent) = config.orders_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(
        path = %config.orders_path.display(),
        backend = ?config.store,
        "Opening order store"
    );
    let orders: Arc<dyn OrderStore> = match config.store {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&config.orders_path)),
        StoreBackend::Sqlite => Arc::new(Database::open(&config.orders_path)?),
    };

    let client = TelegramClient::new(
        &config.api_url,
        &config.bot_token,
        config.poll_timeout + HTTP_TIMEOUT_MARGIN,
    )?;

    let dispatcher: ProductionDispatcher = runtime::Dispatcher::new(
        orders,
        client.clone(),
        InMemorySessionStore::new(),
        (&config).into(),
    );

    let cancel = CancellationToken::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(256);

    let poller = tokio::spawn(telegram::poll_updates(
        client,
        inbound_tx,
        config.poll_timeout,
        cancel.clone(),
    ));

    // Ctrl-C stops polling and dispatching
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
    });

    tracing::info!(admins = ?config.admin_ids, "Order intake bot running");
    dispatcher.run(inbound_rx, cancel).await;

    poller.await?;
    Ok(())
}
