//! Events that can occur in a dialogue

use super::state::Actor;
use crate::db::{Order, UserId};

/// Slash commands recognized at any step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reset to the menu
    Start,
    /// List the actor's own orders
    MyOrders,
}

impl Command {
    /// Parse a message text; unknown commands are not commands
    ///
    /// Accepts the `/cmd@botname` form and ignores trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Command::Start),
            "myorders" => Some(Command::MyOrders),
            _ => None,
        }
    }
}

/// Decoded button payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartOrder,
    MyOrders,
    ContactAdmins,
    AttachPhoto,
    SkipPhoto,
    /// Admin: quote a price to the customer
    AdminPrice { customer: UserId },
    /// Admin: reject the customer's pending order
    AdminReject { customer: UserId },
    /// Customer: accept the quoted price
    Accept,
    /// Customer: decline the quoted price
    Decline,
}

impl Action {
    pub fn payload(self) -> String {
        match self {
            Action::StartOrder => "start_order".to_string(),
            Action::MyOrders => "myorders".to_string(),
            Action::ContactAdmins => "contact_admins".to_string(),
            Action::AttachPhoto => "yes_photo".to_string(),
            Action::SkipPhoto => "skip_photo".to_string(),
            Action::AdminPrice { customer } => format!("admin_price:{customer}"),
            Action::AdminReject { customer } => format!("admin_reject:{customer}"),
            Action::Accept => "user_accept".to_string(),
            Action::Decline => "user_decline".to_string(),
        }
    }

    pub fn parse(payload: &str) -> Option<Self> {
        if let Some((kind, id)) = payload.split_once(':') {
            let customer: UserId = id.trim().parse().ok()?;
            return match kind {
                "admin_price" => Some(Action::AdminPrice { customer }),
                "admin_reject" => Some(Action::AdminReject { customer }),
                _ => None,
            };
        }
        match payload {
            "start_order" => Some(Action::StartOrder),
            "myorders" => Some(Action::MyOrders),
            "contact_admins" => Some(Action::ContactAdmins),
            "yes_photo" => Some(Action::AttachPhoto),
            "skip_photo" => Some(Action::SkipPhoto),
            "user_accept" => Some(Action::Accept),
            "user_decline" => Some(Action::Decline),
            _ => None,
        }
    }

    /// Actions handled by the admin handoff protocol rather than the dialogue
    pub fn is_handoff(self) -> bool {
        matches!(
            self,
            Action::AdminPrice { .. } | Action::AdminReject { .. } | Action::Accept | Action::Decline
        )
    }
}

/// Events that trigger dialogue transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Actor events
    Command(Command),
    Text {
        text: String,
    },
    Photo {
        /// Reference to the largest image variant
        file_id: String,
    },
    /// Button press; `None` when the payload was not recognized
    Button {
        action: Option<Action>,
    },

    // Events generated by effect execution
    MenuResolved {
        has_orders: bool,
    },
    OrdersLoaded {
        orders: Vec<Order>,
    },
}

#[allow(dead_code)] // Constructors used in tests
impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    pub fn button(action: Action) -> Self {
        Event::Button {
            action: Some(action),
        }
    }

    /// Message text: commands become `Command`, everything else is `Text`
    pub fn from_message_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match Command::parse(&text) {
            Some(command) => Event::Command(command),
            None => Event::Text { text },
        }
    }

    pub fn from_button_payload(payload: &str) -> Self {
        Event::Button {
            action: Action::parse(payload),
        }
    }
}

/// One element of the inbound stream: who, and what happened
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub actor: Actor,
    pub event: Event,
}

impl Inbound {
    pub fn new(actor: Actor, event: Event) -> Self {
        Self { actor, event }
    }
}
