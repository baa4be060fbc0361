//! In-memory session registry

use super::traits::SessionStore;
use crate::db::UserId;
use crate::state_machine::{PriceCapture, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

struct Tracked {
    session: Session,
    last_activity: DateTime<Utc>,
}

/// Sessions and price captures held in process memory
///
/// Lost on restart; a customer mid-dialogue starts over with `/start`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, Tracked>>,
    captures: Mutex<HashMap<UserId, PriceCapture>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)] // Used in tests
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    #[allow(dead_code)] // Used in tests
    pub async fn capture_count(&self) -> usize {
        self.captures.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, actor: UserId) -> Option<Session> {
        self.sessions
            .lock()
            .await
            .get(&actor)
            .map(|t| t.session.clone())
    }

    async fn save(&self, actor: UserId, session: Session) {
        self.sessions.lock().await.insert(
            actor,
            Tracked {
                session,
                last_activity: Utc::now(),
            },
        );
    }

    async fn remove(&self, actor: UserId) {
        self.sessions.lock().await.remove(&actor);
    }

    async fn begin_capture(&self, admin: UserId, capture: PriceCapture) {
        self.captures.lock().await.insert(admin, capture);
    }

    async fn take_capture(&self, admin: UserId) -> Option<PriceCapture> {
        self.captures.lock().await.remove(&admin)
    }

    async fn cancel_capture(&self, admin: UserId) -> bool {
        self.captures.lock().await.remove(&admin).is_some()
    }

    async fn reap_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, t| t.last_activity >= cutoff);
        let mut reaped = before - sessions.len();
        drop(sessions);

        let mut captures = self.captures.lock().await;
        let before = captures.len();
        captures.retain(|_, c| c.started_at >= cutoff);
        reaped += before - captures.len();
        reaped
    }
}
