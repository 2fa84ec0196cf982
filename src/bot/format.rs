//! Rendering of matched rows into Telegram messages.

use teloxide::utils::html;

use crate::sheets::Record;

pub const NO_MATCH_TEXT: &str = "🚫 No match found. Try something else?";
pub const ERROR_TEXT: &str = "⚠️ Search is unavailable right now. Please try again later.";
pub const START_TEXT: &str =
    "Hey there! 👋\nSend me the name of the movie or topic you're looking for 🎥";
/// Shown in place of a missing title.
pub const UNTITLED: &str = "Untitled";

/// How the messaging client should interpret `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    Html,
}

/// A single URL button attached under a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// Text ready to hand to the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub markup: Markup,
    pub button: Option<LinkButton>,
}

impl RenderedMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::Plain,
            button: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::Html,
            button: None,
        }
    }

    pub fn with_button(mut self, button: LinkButton) -> Self {
        self.button = Some(button);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    pub title_column: String,
    pub link_column: String,
    pub limit: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            title_column: "Title".to_string(),
            link_column: "Link".to_string(),
            limit: 5,
        }
    }
}

impl Formatter {
    /// One message per match up to `limit`, or a single "no match" message.
    pub fn format(&self, matches: &[Record]) -> Vec<RenderedMessage> {
        if matches.is_empty() {
            return vec![no_match()];
        }
        matches
            .iter()
            .take(self.limit)
            .map(|record| self.render(record))
            .collect()
    }

    fn render(&self, record: &Record) -> RenderedMessage {
        // A sheet with neither configured column is read as title, link.
        let (title, link) = match (record.get(&self.title_column), record.get(&self.link_column)) {
            (None, None) => (record.value_at(0), record.value_at(1)),
            columns => columns,
        };
        let title = title.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(UNTITLED);
        let link = link.map(str::trim).unwrap_or("");

        let mut text = format!("🎥 <b>{}</b>", html::escape(title));
        if !link.is_empty() {
            text.push_str(&format!("\n👉 <a href=\"{}\">Watch Now</a>", escape_attr(link)));
        }
        RenderedMessage::html(text)
    }
}

/// Escape for use inside a double-quoted attribute.
fn escape_attr(value: &str) -> String {
    html::escape(value).replace('"', "&quot;")
}

pub fn no_match() -> RenderedMessage {
    RenderedMessage::plain(NO_MATCH_TEXT)
}

pub fn search_error() -> RenderedMessage {
    RenderedMessage::plain(ERROR_TEXT)
}

pub fn start_message(button: Option<LinkButton>) -> RenderedMessage {
    let message = RenderedMessage::plain(START_TEXT);
    match button {
        Some(button) => message.with_button(button),
        None => message,
    }
}
