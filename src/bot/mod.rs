//! Bot module - webhook updates in, spreadsheet matches out.

pub mod cleanup;
pub mod format;
pub mod handlers;
pub mod matcher;
pub mod router;
pub mod telegram;
pub mod webhook;


pub use cleanup::{CleanupScheduler, PendingDeletion};
pub use format::{Formatter, LinkButton, RenderedMessage};
pub use handlers::{BotContext, DeletionPolicy, HandlerSettings, SearchOutcome};
pub use matcher::MatchScope;
pub use router::{Intent, IntentRouter};
pub use telegram::{Messenger, TelegramClient};
pub use webhook::Dispatcher;
