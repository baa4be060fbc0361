//! Dialogue state types

use crate::db::{Order, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Dialogue Steps
// ============================================================================

/// Position of one actor in the order dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Returning-customer menu (or the welcome screen, decided by order history)
    #[default]
    Menu,
    /// First-time welcome with instructions
    Welcome,
    /// Waiting for the article code; the start-order trigger lands here directly
    Article,
    Size,
    Color,
    City,
    Delivery,
    /// Waiting for the attach-photo / skip choice
    WantPhoto,
    /// Waiting for an image
    WaitPhotoUpload,
    Contact,
    /// Order appended and fanned out; the session is dropped
    Submitted,
}

impl Step {
    /// Terminal steps end the session
    pub fn is_terminal(self) -> bool {
        matches!(self, Step::Submitted)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One actor's position in a dialogue plus the in-progress order draft
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub step: Step,
    pub draft: Order,
    /// Set between the "attach photo" choice and the first image
    #[serde(default)]
    pub waiting_photo: bool,
}

impl Session {
    pub fn at(step: Step) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    /// Same draft, different step
    pub fn advance(&self, step: Step) -> Self {
        Self {
            step,
            ..self.clone()
        }
    }
}

/// An administrator's next text message is owed to `customer` as a price quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCapture {
    pub customer: UserId,
    pub started_at: DateTime<Utc>,
}

// ============================================================================
// Actor & Context
// ============================================================================

/// Who sent an inbound event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    /// Chat id; replies and order ownership are keyed by it
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Actor {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: Option<&str>) -> Self {
        self.first_name = first.into();
        self.last_name = last.map(String::from);
        self
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}

/// Everything a transition may read besides the session itself (immutable)
#[derive(Debug, Clone)]
pub struct DialogueContext {
    pub actor: Actor,
    pub admins: Vec<UserId>,
    /// Link shown next to the menu buttons, if configured
    pub guide_url: Option<String>,
}

impl DialogueContext {
    pub fn new(actor: Actor, admins: Vec<UserId>) -> Self {
        Self {
            actor,
            admins,
            guide_url: None,
        }
    }

    pub fn with_guide_url(mut self, url: Option<String>) -> Self {
        self.guide_url = url;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.admins.contains(&self.actor.id)
    }
}
