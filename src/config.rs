use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::bot::format::{Formatter, LinkButton};
use crate::bot::handlers::{DeletionPolicy, HandlerSettings};
use crate::bot::matcher::MatchScope;
use crate::sheets::{Credentials, ServiceAccountKey};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is not set (or is blank).
    Missing(&'static str),
    /// A variable is set but unusable.
    Invalid { key: &'static str, reason: String },
    /// Failed to read the credentials file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Service-account JSON did not parse.
    ParseCredentials(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting {}", key),
            Self::Invalid { key, reason } => write!(f, "invalid {}: {}", key, reason),
            Self::ReadFile { path, source } => {
                write!(f, "failed to read credentials file '{}': {}", path.display(), source)
            }
            Self::ParseCredentials(source) => {
                write!(f, "failed to parse service account credentials: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseCredentials(source) => Some(source),
            Self::Missing(_) | Self::Invalid { .. } => None,
        }
    }
}

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_START_BUTTON_LABEL: &str = "📺 Visit Website";
/// Telegram refuses to delete messages older than 48 hours.
const MAX_DELETE_AFTER_SECS: u64 = 48 * 3600;

pub struct Config {
    pub bot_token: String,
    /// Public base URL; the webhook path is appended on registration.
    pub webhook_url: String,
    pub webhook_path: String,
    pub listen_addr: SocketAddr,
    pub spreadsheet_id: String,
    pub sheet_range: String,
    pub credentials: Credentials,
    pub settings: HandlerSettings,
    pub strict_webhook: bool,
    /// Directory for the log file. No file logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bot_token = require("BOT_TOKEN")?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_valid = bot_token
            .split_once(':')
            .is_some_and(|(id, secret)| id.parse::<u64>().is_ok() && !secret.is_empty());
        if !token_valid {
            return Err(ConfigError::Invalid {
                key: "BOT_TOKEN",
                reason: "expected format 123456789:ABCdefGHI...".into(),
            });
        }

        let webhook_url = require("WEBHOOK_URL")?.trim_end_matches('/').to_string();
        if !(webhook_url.starts_with("https://") || webhook_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_URL",
                reason: "must start with http:// or https://".into(),
            });
        }

        let spreadsheet_id = require("SPREADSHEET_ID")?;
        let credentials = load_credentials(&get)?;

        let webhook_path = match get("WEBHOOK_PATH") {
            Some(path) if path.starts_with('/') => path,
            Some(path) => format!("/{path}"),
            None => "/telegram".to_string(),
        };

        let listen_addr = match (get("LISTEN_ADDR"), get("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{port}"),
            (None, None) => DEFAULT_LISTEN_ADDR.to_string(),
        };
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "LISTEN_ADDR",
            reason: format!("'{listen_addr}': {e}"),
        })?;

        let limit = parse_or(&get, "RESULT_LIMIT", 5usize)?;
        if limit == 0 {
            return Err(ConfigError::Invalid {
                key: "RESULT_LIMIT",
                reason: "must be at least 1".into(),
            });
        }
        let formatter = Formatter {
            title_column: get("TITLE_COLUMN").unwrap_or_else(|| "Title".to_string()),
            link_column: get("LINK_COLUMN").unwrap_or_else(|| "Link".to_string()),
            limit,
        };

        let delete_after = parse_or(&get, "DELETE_AFTER_SECS", 43200u64)?;
        if delete_after > MAX_DELETE_AFTER_SECS {
            return Err(ConfigError::Invalid {
                key: "DELETE_AFTER_SECS",
                reason: format!("{delete_after} exceeds the 48 hour limit ({MAX_DELETE_AFTER_SECS})"),
            });
        }

        let start_button = get("START_BUTTON_URL").map(|url| LinkButton {
            label: get("START_BUTTON_LABEL").unwrap_or_else(|| DEFAULT_START_BUTTON_LABEL.to_string()),
            url,
        });

        let settings = HandlerSettings {
            scope: MatchScope::parse(&get("MATCH_COLUMNS").unwrap_or_else(|| "*".to_string())),
            formatter,
            dedupe_titles: parse_bool(&get, "DEDUPLICATE_TITLES", false)?,
            delete_after: Duration::from_secs(delete_after),
            policy: DeletionPolicy {
                start_replies: parse_bool(&get, "DELETE_START_REPLIES", true)?,
                search_replies: parse_bool(&get, "DELETE_SEARCH_REPLIES", true)?,
                no_match_replies: parse_bool(&get, "DELETE_NO_MATCH_REPLIES", true)?,
            },
            start_button,
            query_log_range: get("QUERY_LOG_RANGE"),
        };

        Ok(Self {
            bot_token,
            webhook_url,
            webhook_path,
            listen_addr,
            spreadsheet_id,
            sheet_range: get("SHEET_RANGE").unwrap_or_else(|| "Sheet1".to_string()),
            credentials,
            settings,
            strict_webhook: parse_bool(&get, "STRICT_WEBHOOK", false)?,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }

    /// Full URL registered with Telegram.
    pub fn webhook_endpoint(&self) -> String {
        format!("{}{}", self.webhook_url, self.webhook_path)
    }
}

/// Inline JSON wins over a file path; a bare access token is the fallback.
fn load_credentials<G>(get: &G) -> Result<Credentials, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let json = match (get("GOOGLE_CREDS_JSON"), get("GOOGLE_CREDS_FILE")) {
        (Some(json), _) => Some(json),
        (None, Some(path)) => {
            let path = PathBuf::from(path);
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFile { path: path.clone(), source: e })?;
            Some(content)
        }
        (None, None) => None,
    };

    match (json, get("GOOGLE_ACCESS_TOKEN")) {
        (Some(json), _) => ServiceAccountKey::from_json(&json)
            .map(Credentials::ServiceAccount)
            .map_err(ConfigError::ParseCredentials),
        (None, Some(token)) => Ok(Credentials::AccessToken(token)),
        (None, None) => Err(ConfigError::Missing("GOOGLE_CREDS_JSON")),
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: format!("'{value}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}
