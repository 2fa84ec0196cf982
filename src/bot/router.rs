//! Maps inbound updates to named intents.

use teloxide::types::{Update, UpdateKind};
use teloxide::utils::command::BotCommands;

/// Commands the bot understands.
#[derive(BotCommands, Debug, Clone, Copy, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Send any text to search.")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "how to search")]
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    Search,
}

impl From<Command> for Intent {
    fn from(command: Command) -> Self {
        match command {
            Command::Start | Command::Help => Intent::Start,
        }
    }
}

/// A routed message, ready for a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub intent: Intent,
    pub chat_id: i64,
    pub text: String,
    pub sender: Option<String>,
}

/// Resolves text messages to intents.
///
/// Known commands go to their intent, other commands are ignored, and any
/// other text is a search.
#[derive(Debug, Clone, Default)]
pub struct IntentRouter {
    bot_username: String,
}

impl IntentRouter {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
        }
    }

    pub fn resolve_text(&self, text: &str) -> Option<Intent> {
        if !text.trim_start().starts_with('/') {
            return Some(Intent::Search);
        }
        // Deep-link payloads ("/start abc") are not arguments we care about.
        // Commands are case-insensitive; the @username part already is.
        let command = text.split_whitespace().next().unwrap_or_default().to_lowercase();
        Command::parse(&command, &self.bot_username).ok().map(Intent::from)
    }

    /// Route an update. Anything but a new text message is ignored.
    pub fn route(&self, update: &Update) -> Option<Routed> {
        let UpdateKind::Message(msg) = &update.kind else {
            return None;
        };
        let text = msg.text()?;
        let intent = self.resolve_text(text)?;

        let sender = msg
            .from
            .as_ref()
            .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()));

        Some(Routed {
            intent,
            chat_id: msg.chat.id.0,
            text: text.to_string(),
            sender,
        })
    }
}
