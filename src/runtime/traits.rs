//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the dispatcher with mock implementations.

use crate::db::{Database, JsonFileStore, Order, StatusChange, UserId};
use crate::state_machine::{OutboundMessage, PriceCapture, Session};
use crate::telegram::TelegramClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Durable order records
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Add one record
    async fn append(&self, order: &Order) -> Result<(), String>;

    /// Move every `(owner, from)` record; returns how many moved
    async fn update_status(&self, change: &StatusChange) -> Result<usize, String>;

    /// Records owned by `owner` or carrying `handle`, oldest first
    async fn query_by_owner_or_handle(
        &self,
        owner: UserId,
        handle: Option<&str>,
    ) -> Result<Vec<Order>, String>;

    async fn has_orders(&self, owner: UserId) -> Result<bool, String>;
}

/// Outbound message delivery
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), String>;
}

/// Per-actor dialogue sessions and admin price captures
///
/// Every write refreshes the actor's last-activity timestamp.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, actor: UserId) -> Option<Session>;

    async fn save(&self, actor: UserId, session: Session);

    async fn remove(&self, actor: UserId);

    /// Replaces any capture the admin already had
    async fn begin_capture(&self, admin: UserId, capture: PriceCapture);

    /// Remove and return the admin's pending capture
    async fn take_capture(&self, admin: UserId) -> Option<PriceCapture>;

    async fn cancel_capture(&self, admin: UserId) -> bool;

    /// Drop sessions and captures last touched before `cutoff`; returns how many went
    async fn reap_idle(&self, cutoff: DateTime<Utc>) -> usize;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn append(&self, order: &Order) -> Result<(), String> {
        (**self).append(order).await
    }

    async fn update_status(&self, change: &StatusChange) -> Result<usize, String> {
        (**self).update_status(change).await
    }

    async fn query_by_owner_or_handle(
        &self,
        owner: UserId,
        handle: Option<&str>,
    ) -> Result<Vec<Order>, String> {
        (**self).query_by_owner_or_handle(owner, handle).await
    }

    async fn has_orders(&self, owner: UserId) -> Result<bool, String> {
        (**self).has_orders(owner).await
    }
}

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn send(&self, message: &OutboundMessage) -> Result<(), String> {
        (**self).send(message).await
    }
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, actor: UserId) -> Option<Session> {
        (**self).load(actor).await
    }

    async fn save(&self, actor: UserId, session: Session) {
        (**self).save(actor, session).await;
    }

    async fn remove(&self, actor: UserId) {
        (**self).remove(actor).await;
    }

    async fn begin_capture(&self, admin: UserId, capture: PriceCapture) {
        (**self).begin_capture(admin, capture).await;
    }

    async fn take_capture(&self, admin: UserId) -> Option<PriceCapture> {
        (**self).take_capture(admin).await
    }

    async fn cancel_capture(&self, admin: UserId) -> bool {
        (**self).cancel_capture(admin).await
    }

    async fn reap_idle(&self, cutoff: DateTime<Utc>) -> usize {
        (**self).reap_idle(cutoff).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

#[async_trait]
impl OrderStore for Database {
    async fn append(&self, order: &Order) -> Result<(), String> {
        self.append_order(order).map_err(|e| e.to_string())
    }

    async fn update_status(&self, change: &StatusChange) -> Result<usize, String> {
        Database::update_status(self, change).map_err(|e| e.to_string())
    }

    async fn query_by_owner_or_handle(
        &self,
        owner: UserId,
        handle: Option<&str>,
    ) -> Result<Vec<Order>, String> {
        self.orders_for(owner, handle).map_err(|e| e.to_string())
    }

    async fn has_orders(&self, owner: UserId) -> Result<bool, String> {
        Database::has_orders(self, owner).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl OrderStore for JsonFileStore {
    async fn append(&self, order: &Order) -> Result<(), String> {
        JsonFileStore::append(self, order).map_err(|e| e.to_string())
    }

    async fn update_status(&self, change: &StatusChange) -> Result<usize, String> {
        JsonFileStore::update_status(self, change).map_err(|e| e.to_string())
    }

    async fn query_by_owner_or_handle(
        &self,
        owner: UserId,
        handle: Option<&str>,
    ) -> Result<Vec<Order>, String> {
        self.orders_for(owner, handle).map_err(|e| e.to_string())
    }

    async fn has_orders(&self, owner: UserId) -> Result<bool, String> {
        JsonFileStore::has_orders(self, owner).map_err(|e| e.to_string())
    }
}

/// Messages with an image go out as a photo with the text as caption
#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, message: &OutboundMessage) -> Result<(), String> {
        let keyboard = message.keyboard.as_ref();
        let sent = match &message.photo {
            Some(file_id) => {
                let caption = Some(message.text.as_str()).filter(|c| !c.is_empty());
                self.send_photo(message.chat_id, file_id, caption, keyboard)
                    .await
            }
            None => {
                self.send_message(message.chat_id, &message.text, keyboard)
                    .await
            }
        };
        sent.map_err(|e| e.to_string())
    }
}
