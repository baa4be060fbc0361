//! Long-polling update source

use super::client::{TelegramClient, TelegramError};
use super::types::Update;
use crate::state_machine::Inbound;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// The two Bot API calls the poller makes
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn get_updates(&self, offset: i64, timeout: Duration)
        -> Result<Vec<Update>, TelegramError>;

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        TelegramClient::get_updates(self, offset, timeout).await
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        TelegramClient::answer_callback_query(self, callback_query_id).await
    }
}

/// Feed inbound events into `tx` until cancelled or the receiver goes away
///
/// Button presses are acknowledged as they arrive. API errors back off
/// exponentially, or by the server-requested delay when one is given.
pub async fn poll_updates<U: UpdateSource>(
    source: U,
    tx: mpsc::Sender<Inbound>,
    poll_timeout: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(poll_timeout_secs = poll_timeout.as_secs(), "Starting update poller");

    let mut offset = 0;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let polled = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            polled = source.get_updates(offset, poll_timeout) => polled,
        };

        match polled {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    offset = offset.max(update.update_id + 1);

                    if let Some(id) = update.callback_id() {
                        if let Err(e) = source.answer_callback_query(id).await {
                            tracing::debug!(error = %e, "Callback acknowledgement failed");
                        }
                    }

                    let Some(inbound) = update.into_inbound() else {
                        continue;
                    };
                    if tx.send(inbound).await.is_err() {
                        tracing::info!("Dispatcher gone, stopping update poller");
                        return;
                    }
                }
            }
            Err(e) => {
                let delay = e.retry_after().unwrap_or(backoff);
                tracing::warn!(error = %e, delay_secs = delay.as_secs(), "Polling failed");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
                backoff = next_backoff(backoff);
            }
        }
    }

    tracing::info!("Update poller stopped");
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}
