//! Start and search handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::bot::cleanup::{CleanupScheduler, PendingDeletion};
use crate::bot::format::{self, Formatter, LinkButton, RenderedMessage};
use crate::bot::matcher::{self, MatchScope};
use crate::bot::telegram::Messenger;
use crate::sheets::RowStore;

/// Which replies get auto-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionPolicy {
    pub start_replies: bool,
    pub search_replies: bool,
    pub no_match_replies: bool,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self {
            start_replies: true,
            search_replies: true,
            no_match_replies: true,
        }
    }
}

/// Handler settings that do not involve an external session.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub scope: MatchScope,
    pub formatter: Formatter,
    pub dedupe_titles: bool,
    pub delete_after: Duration,
    pub policy: DeletionPolicy,
    pub start_button: Option<LinkButton>,
    pub query_log_range: Option<String>,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            scope: MatchScope::AnyCell,
            formatter: Formatter::default(),
            dedupe_titles: false,
            delete_after: Duration::from_secs(43200),
            policy: DeletionPolicy::default(),
            start_button: None,
            query_log_range: None,
        }
    }
}

/// Everything a handler needs, built once at startup.
pub struct BotContext<S, M> {
    store: Arc<S>,
    messenger: Arc<M>,
    cleanup: CleanupScheduler<M>,
    settings: HandlerSettings,
}

/// What a search produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Matched(usize),
    NoMatch,
    Failed,
}

impl<S: RowStore, M: Messenger> BotContext<S, M> {
    pub fn new(store: Arc<S>, messenger: Arc<M>, settings: HandlerSettings) -> Self {
        Self {
            store,
            cleanup: CleanupScheduler::new(messenger.clone()),
            messenger,
            settings,
        }
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    pub async fn handle_start(&self, chat_id: i64) -> Option<PendingDeletion> {
        info!("👋 /start in chat {}", chat_id);
        let message = format::start_message(self.settings.start_button.clone());
        self.reply(chat_id, &message, self.settings.policy.start_replies).await
    }

    pub async fn handle_search(&self, chat_id: i64, query: &str, sender: Option<&str>) -> SearchOutcome {
        let preview: String = query.chars().take(100).collect();
        info!("🔍 Search from {} in chat {}: \"{}\"", sender.unwrap_or("unknown"), chat_id, preview);

        let rows = match self.store.fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Row fetch failed: {e}");
                self.reply(chat_id, &format::search_error(), self.settings.policy.no_match_replies)
                    .await;
                return SearchOutcome::Failed;
            }
        };

        let mut matches = matcher::find_matches(query, &rows, &self.settings.scope);
        if self.settings.dedupe_titles {
            matches = matcher::dedupe_by(matches, &self.settings.formatter.title_column);
        }
        info!("{} of {} rows matched", matches.len(), rows.len());

        let outcome = if matches.is_empty() {
            SearchOutcome::NoMatch
        } else {
            SearchOutcome::Matched(matches.len())
        };
        let delete = match outcome {
            SearchOutcome::Matched(_) => self.settings.policy.search_replies,
            _ => self.settings.policy.no_match_replies,
        };

        for message in self.settings.formatter.format(&matches) {
            self.reply(chat_id, &message, delete).await;
        }

        self.log_query(chat_id, query, sender, matches.len()).await;
        outcome
    }

    /// Send one reply and, if asked, schedule its deletion.
    ///
    /// The deletion is only scheduled once the send has returned an id.
    async fn reply(&self, chat_id: i64, message: &RenderedMessage, delete: bool) -> Option<PendingDeletion> {
        let message_id = match self.messenger.send_message(chat_id, message).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Reply to chat {} failed: {e}", chat_id);
                return None;
            }
        };
        if !delete {
            return None;
        }
        Some(
            self.cleanup
                .schedule_delete(chat_id, message_id, self.settings.delete_after),
        )
    }

    async fn log_query(&self, chat_id: i64, query: &str, sender: Option<&str>, matched: usize) {
        let Some(range) = &self.settings.query_log_range else {
            return;
        };
        let row = vec![
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            chat_id.to_string(),
            sender.unwrap_or_default().to_string(),
            query.trim().to_string(),
            matched.to_string(),
        ];
        if let Err(e) = self.store.append_row(range, row).await {
            warn!("Failed to log query: {e}");
        }
    }
}
