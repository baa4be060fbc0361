//! Inbound event dispatcher

use super::traits::{Messenger, OrderStore, SessionStore};
use crate::config::BotConfig;
use crate::db::UserId;
use crate::state_machine::{
    handoff, prompts, transition, DialogueContext, Effect, Event, Inbound, OutboundMessage,
    PriceCapture,
};
use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Knobs the dispatcher needs from configuration
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub admins: Vec<UserId>,
    pub guide_url: Option<String>,
    pub send_timeout: Duration,
    pub session_idle: Duration,
    pub reap_interval: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            guide_url: None,
            send_timeout: Duration::from_secs(10),
            session_idle: Duration::from_secs(6 * 60 * 60),
            reap_interval: Duration::from_secs(300),
        }
    }
}

impl From<&BotConfig> for DispatcherSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            admins: config.admin_ids.clone(),
            guide_url: config.guide_url.clone(),
            send_timeout: config.send_timeout,
            session_idle: config.session_idle,
            reap_interval: config.reap_interval,
        }
    }
}

/// A store write failed; the remaining effects of the event are abandoned
#[derive(Debug, Error)]
#[error("Order store write failed: {0}")]
pub struct StoreWriteError(String);

/// Routes inbound events through the dialogue state machine, one at a time
pub struct Dispatcher<O, M, S>
where
    O: OrderStore,
    M: Messenger,
    S: SessionStore,
{
    orders: O,
    messenger: M,
    sessions: S,
    settings: DispatcherSettings,
}

impl<O, M, S> Dispatcher<O, M, S>
where
    O: OrderStore,
    M: Messenger,
    S: SessionStore,
{
    pub fn new(orders: O, messenger: M, sessions: S, settings: DispatcherSettings) -> Self {
        Self {
            orders,
            messenger,
            sessions,
            settings,
        }
    }

    /// Consume the inbound stream until it closes or `cancel` fires
    pub async fn run(self, mut inbound_rx: mpsc::Receiver<Inbound>, cancel: CancellationToken) {
        tracing::info!(admins = self.settings.admins.len(), "Starting dispatcher");

        let mut reap = tokio::time::interval(self.settings.reap_interval);
        reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Process events in a loop - one at a time, in arrival order
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                inbound = inbound_rx.recv() => match inbound {
                    Some(inbound) => self.dispatch(inbound).await,
                    None => break,
                },
                _ = reap.tick() => self.reap().await,
            }
        }

        tracing::info!("Dispatcher stopped");
    }

    /// Handle one inbound event to completion
    pub async fn dispatch(&self, inbound: Inbound) {
        let Inbound { actor, event } = inbound;
        let ctx = DialogueContext::new(actor, self.settings.admins.clone())
            .with_guide_url(self.settings.guide_url.clone());
        let actor_id = ctx.actor.id;

        // A pending price capture consumes the admin's next text before the dialogue sees it
        if let Event::Text { text } = &event {
            if let Some(capture) = self.sessions.take_capture(actor_id).await {
                self.relay_price(&ctx, capture, text).await;
                return;
            }
        }

        let before = self.sessions.load(actor_id).await.unwrap_or_default();
        let mut session = before.clone();

        // We need to process events in a loop to handle chained effects
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            // Pure state transition
            let result = match transition(&session, &ctx, current_event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(actor = actor_id, error = %e, "Event dropped");
                    continue;
                }
            };

            if result.new_state.step != session.step {
                tracing::debug!(
                    actor = actor_id,
                    from = ?session.step,
                    to = ?result.new_state.step,
                    "Step changed"
                );
            }
            session = result.new_state;

            match self.execute_effects(&ctx, result.effects).await {
                Ok(generated) => events_to_process.extend(generated),
                Err(e) => {
                    tracing::error!(actor = actor_id, error = %e, "Abandoning event");
                    self.deliver(&OutboundMessage::text(actor_id, prompts::STORE_FAILURE))
                        .await;
                    session = before;
                    break;
                }
            }
        }

        if session.step.is_terminal() {
            self.sessions.remove(actor_id).await;
        } else {
            self.sessions.save(actor_id, session).await;
        }
    }

    /// A failed relay puts the capture back so the admin can resend the quote
    async fn relay_price(&self, ctx: &DialogueContext, capture: PriceCapture, text: &str) {
        tracing::info!(
            admin = ctx.actor.id,
            customer = capture.customer,
            "Relaying price quote"
        );
        let effects = handoff::on_captured_text(ctx, &capture, text);
        if let Err(e) = self.execute_effects(ctx, effects).await {
            tracing::error!(admin = ctx.actor.id, error = %e, "Price relay failed");
            self.sessions.begin_capture(ctx.actor.id, capture).await;
            self.deliver(&OutboundMessage::text(ctx.actor.id, prompts::STORE_FAILURE))
                .await;
        }
    }

    /// Execute effects in order, collecting the events they generate
    ///
    /// Boxed because status changes carry nested follow-up effects.
    fn execute_effects<'a>(
        &'a self,
        ctx: &'a DialogueContext,
        effects: Vec<Effect>,
    ) -> BoxFuture<'a, Result<Vec<Event>, StoreWriteError>> {
        Box::pin(async move {
            let mut generated = Vec::new();
            for effect in effects {
                generated.extend(self.execute_effect(ctx, effect).await?);
            }
            Ok(generated)
        })
    }

    async fn execute_effect(
        &self,
        ctx: &DialogueContext,
        effect: Effect,
    ) -> Result<Vec<Event>, StoreWriteError> {
        match effect {
            Effect::Send(message) => {
                self.deliver(&message).await;
                Ok(vec![])
            }

            Effect::ResolveMenu { owner } => {
                let has_orders = self.orders.has_orders(owner).await.unwrap_or_else(|e| {
                    tracing::warn!(owner, error = %e, "Order lookup failed, assuming none");
                    false
                });
                Ok(vec![Event::MenuResolved { has_orders }])
            }

            Effect::LoadOrders { owner, handle } => {
                let handle = Some(handle.as_str()).filter(|h| !h.is_empty());
                let orders = self
                    .orders
                    .query_by_owner_or_handle(owner, handle)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(owner, error = %e, "Order query failed, assuming none");
                        vec![]
                    });
                Ok(vec![Event::OrdersLoaded { orders }])
            }

            Effect::AppendOrder(order) => {
                self.orders.append(&order).await.map_err(StoreWriteError)?;
                tracing::info!(
                    owner = order.user_id,
                    article = %order.article,
                    photo = order.photo_file_id.is_some(),
                    "Order submitted"
                );
                Ok(vec![])
            }

            Effect::FanOut { batches } => {
                join_all(batches.iter().map(|batch| self.deliver_batch(batch))).await;
                Ok(vec![])
            }

            Effect::BeginPriceCapture { admin, customer } => {
                tracing::info!(admin, customer, "Awaiting price quote");
                self.sessions
                    .begin_capture(
                        admin,
                        PriceCapture {
                            customer,
                            started_at: Utc::now(),
                        },
                    )
                    .await;
                Ok(vec![])
            }

            Effect::CancelPriceCapture { admin } => {
                if self.sessions.cancel_capture(admin).await {
                    tracing::info!(admin, "Price capture cancelled");
                }
                Ok(vec![])
            }

            Effect::ChangeStatus {
                change,
                on_success,
                on_noop,
            } => {
                let changed = self
                    .orders
                    .update_status(&change)
                    .await
                    .map_err(StoreWriteError)?;
                tracing::info!(
                    owner = change.owner,
                    from = %change.from,
                    to = %change.to,
                    changed,
                    "Status change"
                );
                let follow_ups = if changed > 0 { on_success } else { on_noop };
                self.execute_effects(ctx, follow_ups).await
            }
        }
    }

    /// Messages within a batch go out in order; a failure does not stop the rest
    async fn deliver_batch(&self, batch: &[OutboundMessage]) {
        for message in batch {
            self.deliver(message).await;
        }
    }

    /// Send one message under the configured timeout; failures are logged, not retried
    async fn deliver(&self, message: &OutboundMessage) {
        match tokio::time::timeout(self.settings.send_timeout, self.messenger.send(message)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(chat = message.chat_id, error = %e, "Send failed");
            }
            Err(_) => {
                tracing::warn!(
                    chat = message.chat_id,
                    timeout_secs = self.settings.send_timeout.as_secs(),
                    "Send timed out"
                );
            }
        }
    }

    async fn reap(&self) {
        let Ok(idle) = chrono::Duration::from_std(self.settings.session_idle) else {
            return;
        };
        let reaped = self.sessions.reap_idle(Utc::now() - idle).await;
        if reaped > 0 {
            tracing::info!(reaped, "Reaped idle sessions");
        }
    }
}
