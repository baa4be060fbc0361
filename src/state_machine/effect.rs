//! Effects produced by state transitions

use super::event::Action;
use crate::db::{Order, StatusChange, UserId};

/// Button in a choice set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Sends `action` back as a button press
    Action { label: String, action: Action },
    /// Opens a link
    Link { label: String, url: String },
}

impl Button {
    pub fn action(label: impl Into<String>, action: Action) -> Self {
        Button::Action {
            label: label.into(),
            action,
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Button::Link {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Choice set attached to an outbound message, row by row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.rows.push(buttons.into_iter().collect());
        self
    }

    /// Actions reachable from this keyboard, in layout order
    #[allow(dead_code)] // Used in tests
    pub fn actions(&self) -> Vec<Action> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match b {
                Button::Action { action, .. } => Some(*action),
                Button::Link { .. } => None,
            })
            .collect()
    }
}

/// One outbound message: text, optional choice set, optional image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: UserId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    /// Image reference; when set, `text` is sent as its caption
    pub photo: Option<String>,
}

impl OutboundMessage {
    pub fn text(chat_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
            photo: None,
        }
    }

    pub fn photo(chat_id: UserId, file_id: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: String::new(),
            keyboard: None,
            photo: Some(file_id.into()),
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver one message
    Send(OutboundMessage),

    /// Decide between menu and welcome; yields `Event::MenuResolved`
    ResolveMenu { owner: UserId },

    /// Load the actor's orders; yields `Event::OrdersLoaded`
    LoadOrders { owner: UserId, handle: String },

    /// Append a submitted order to the store
    AppendOrder(Order),

    /// Send every batch independently; messages within a batch go in order
    FanOut { batches: Vec<Vec<OutboundMessage>> },

    /// Treat the admin's next text as a price quote for `customer`
    BeginPriceCapture { admin: UserId, customer: UserId },

    /// Drop any pending price capture of `admin`
    CancelPriceCapture { admin: UserId },

    /// Move order status; follow-ups depend on whether any record moved
    ChangeStatus {
        change: StatusChange,
        on_success: Vec<Effect>,
        on_noop: Vec<Effect>,
    },
}

impl Effect {
    pub fn send(message: OutboundMessage) -> Self {
        Effect::Send(message)
    }

    pub fn say(chat_id: UserId, text: impl Into<String>) -> Self {
        Effect::Send(OutboundMessage::text(chat_id, text))
    }
}
