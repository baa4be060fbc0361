//! HTTP client for the Bot API

use super::types::{
    AnswerCallbackQuery, ApiResponse, GetUpdates, InlineKeyboardMarkup, SendMessage, SendPhoto,
    Update,
};
use crate::state_machine::effect::Keyboard;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        retry_after: Option<Duration>,
    },
}

impl TelegramError {
    /// Server-requested delay before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TelegramError::Api { retry_after, .. } => *retry_after,
            TelegramError::Http(_) => None,
        }
    }
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TelegramError> {
        let retry_after = self.retry_after();
        match self.result {
            Some(result) if self.ok => Ok(result),
            _ => Err(TelegramError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
                retry_after,
            }),
        }
    }
}

/// Bot API client; cheap to clone
///
/// Deliberately not `Debug`: the base URL embeds the bot token.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    /// `request_timeout` must exceed the long-poll timeout
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> Result<Self, TelegramError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response: ApiResponse<R> = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: vec!["message", "callback_query"],
            },
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text,
                    reply_markup: keyboard.map(InlineKeyboardMarkup::from),
                },
            )
            .await?;
        Ok(())
    }

    /// Send a previously uploaded image by its file id
    pub async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendPhoto",
                &SendPhoto {
                    chat_id,
                    photo: file_id,
                    caption,
                    reply_markup: keyboard.map(InlineKeyboardMarkup::from),
                },
            )
            .await?;
        Ok(())
    }

    /// Stop the client-side spinner on a pressed button
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery { callback_query_id },
            )
            .await?;
        Ok(())
    }
}
