//! Telegram client using teloxide.

use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::bot::format::{Markup, RenderedMessage};
use crate::bot::router::Command;
use crate::error::Error;

/// The messaging-platform calls the handlers need.
pub trait Messenger: Send + Sync + 'static {
    /// Send a message, returning its id.
    fn send_message(
        &self,
        chat_id: i64,
        message: &RenderedMessage,
    ) -> impl Future<Output = Result<i64, Error>> + Send;

    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Bot username, used to accept `/start@username`.
    pub async fn username(&self) -> Result<String, Error> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("getMe failed: {e}")))?;
        info!("Bot user ID: {}, username: @{}", me.id, me.username());
        Ok(me.username().to_string())
    }

    pub async fn set_webhook(&self, url: &str) -> Result<(), Error> {
        let url: reqwest::Url = url
            .parse()
            .map_err(|e| Error::UpstreamUnavailable(format!("invalid webhook url '{url}': {e}")))?;
        info!("🔗 Registering webhook {}", url);
        self.bot
            .set_webhook(url)
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("setWebhook failed: {e}")))?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<(), Error> {
        info!("Removing webhook");
        self.bot
            .delete_webhook()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("deleteWebhook failed: {e}")))?;
        Ok(())
    }

    /// Publish the command list shown in the Telegram client menu.
    pub async fn register_commands(&self) -> Result<(), Error> {
        self.bot
            .set_my_commands(Command::bot_commands())
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("setMyCommands failed: {e}")))?;
        Ok(())
    }
}

impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, message: &RenderedMessage) -> Result<i64, Error> {
        let mut request = self.bot.send_message(ChatId(chat_id), &message.text);

        if message.markup == Markup::Html {
            request = request.parse_mode(ParseMode::Html);
        }

        if let Some(button) = &message.button {
            let url: reqwest::Url = button
                .url
                .parse()
                .map_err(|e| Error::SendFailed(format!("invalid button url '{}': {e}", button.url)))?;
            let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
                button.label.clone(),
                url,
            )]]);
            request = request.reply_markup(keyboard);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            Error::SendFailed(msg)
        })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), Error> {
        info!("🗑️ Deleting message {} in chat {}", message_id, chat_id);

        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id as i32))
            .await
            .map_err(|e| Error::DeleteFailed(e.to_string()))?;

        Ok(())
    }
}
