//! Bot API wire types

use crate::state_machine::effect::{Button, Keyboard};
use crate::state_machine::{Actor, Event, Inbound};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Responses
// ============================================================================

/// Envelope around every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after a flood-control error
    pub retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn retry_after(&self) -> Option<Duration> {
        self.parameters
            .as_ref()
            .and_then(|p| p.retry_after)
            .map(Duration::from_secs)
    }
}

// ============================================================================
// Updates
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    /// Variants of one image, in the order Telegram sent them
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

fn actor(chat_id: i64, user: Option<&User>) -> Actor {
    let actor = Actor::new(chat_id);
    match user {
        Some(u) => {
            let actor = actor.with_name(u.first_name.clone(), u.last_name.as_deref());
            match &u.username {
                Some(username) => actor.with_username(username.clone()),
                None => actor,
            }
        }
        None => actor,
    }
}

/// The variant with the most pixels; later variants win ties
fn largest(photo: &[PhotoSize]) -> Option<&PhotoSize> {
    photo
        .iter()
        .max_by_key(|p| (u64::from(p.width) * u64::from(p.height), p.file_size))
}

impl Update {
    /// Callback query to acknowledge, if this update is a button press
    pub fn callback_id(&self) -> Option<&str> {
        self.callback_query.as_ref().map(|q| q.id.as_str())
    }

    /// Convert into a dialogue event; updates the bot has no use for yield `None`
    ///
    /// The actor is keyed by the originating chat so replies go back where the
    /// event came from.
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map_or(query.from.id, |m| m.chat.id);
            let event = Event::from_button_payload(query.data.as_deref().unwrap_or_default());
            return Some(Inbound::new(actor(chat_id, Some(&query.from)), event));
        }

        let message = self.message?;
        let event = if let Some(text) = message.text {
            Event::from_message_text(text)
        } else {
            let file_id = largest(message.photo.as_deref()?)?.file_id.clone();
            Event::Photo { file_id }
        };
        Some(Inbound::new(
            actor(message.chat.id, message.from.as_ref()),
            event,
        ))
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&Button> for InlineKeyboardButton {
    fn from(button: &Button) -> Self {
        match button {
            Button::Action { label, action } => Self {
                text: label.clone(),
                callback_data: Some(action.payload()),
                url: None,
            },
            Button::Link { label, url } => Self {
                text: label.clone(),
                callback_data: None,
                url: Some(url.clone()),
            },
        }
    }
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| row.iter().map(InlineKeyboardButton::from).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetUpdates {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub struct SendPhoto<'a> {
    pub chat_id: i64,
    pub photo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQuery<'a> {
    pub callback_query_id: &'a str,
}
