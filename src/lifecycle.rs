//! Startup and shutdown of the external sessions.

use std::fmt;
use std::sync::Arc;

use teloxide::Bot;
use tracing::{info, warn};

use crate::bot::telegram::TelegramClient;
use crate::bot::webhook::{self, Dispatcher};
use crate::bot::{BotContext, IntentRouter};
use crate::config::Config;
use crate::error::Error;
use crate::sheets::google::{self, GoogleSheetsClient};

pub type LiveDispatcher = Dispatcher<GoogleSheetsClient, TelegramClient>;

#[derive(Debug)]
pub enum StartupError {
    /// Spreadsheet session could not be opened.
    Sheets(Error),
    /// Bot identity or webhook registration failed.
    Telegram(Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sheets(e) => write!(f, "failed to connect to spreadsheet: {e}"),
            Self::Telegram(e) => write!(f, "failed to set up Telegram bot: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sheets(e) | Self::Telegram(e) => Some(e),
        }
    }
}

/// Where the external APIs live.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    /// Telegram Bot API base. teloxide's default when unset.
    pub telegram: Option<reqwest::Url>,
    pub sheets: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            telegram: None,
            sheets: google::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// A running bot: sessions opened and webhook registered.
pub struct App {
    dispatcher: Arc<LiveDispatcher>,
    telegram: Arc<TelegramClient>,
    webhook_path: String,
}

impl App {
    /// Open the spreadsheet session, build the bot client and register the
    /// webhook. Any failure aborts startup; nothing is retried.
    pub async fn on_start(config: &Config) -> Result<Self, StartupError> {
        Self::on_start_with(config, &ApiEndpoints::default()).await
    }

    pub async fn on_start_with(config: &Config, endpoints: &ApiEndpoints) -> Result<Self, StartupError> {
        let sheets = GoogleSheetsClient::with_api_base(
            config.credentials.clone(),
            config.spreadsheet_id.clone(),
            config.sheet_range.clone(),
            endpoints.sheets.clone(),
            google::REQUEST_TIMEOUT,
        )
        .map_err(StartupError::Sheets)?;
        sheets.connect().await.map_err(StartupError::Sheets)?;

        let mut bot = Bot::new(&config.bot_token);
        if let Some(url) = &endpoints.telegram {
            bot = bot.set_api_url(url.clone());
        }
        let telegram = Arc::new(TelegramClient::new(bot));
        let username = telegram.username().await.map_err(StartupError::Telegram)?;
        if let Err(e) = telegram.register_commands().await {
            warn!("Failed to register commands: {e}");
        }
        telegram
            .set_webhook(&config.webhook_endpoint())
            .await
            .map_err(StartupError::Telegram)?;
        info!("✅ Webhook set");

        let context = BotContext::new(Arc::new(sheets), telegram.clone(), config.settings.clone());
        let dispatcher = Dispatcher::new(context, IntentRouter::new(username), config.strict_webhook);

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            telegram,
            webhook_path: config.webhook_path.clone(),
        })
    }

    pub fn router(&self) -> axum::Router {
        webhook::router(self.dispatcher.clone(), &self.webhook_path)
    }

    /// Deregister the webhook. Pending deletions are dropped with the runtime.
    pub async fn on_stop(self) {
        match self.telegram.delete_webhook().await {
            Ok(()) => info!("🛑 Webhook deleted"),
            Err(e) => warn!("Failed to delete webhook: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    fn config() -> Config {
        let env = HashMap::from([
            ("BOT_TOKEN", TOKEN.to_string()),
            ("WEBHOOK_URL", "https://bot.example.com/".to_string()),
            ("WEBHOOK_PATH", "/hook".to_string()),
            ("SPREADSHEET_ID", "sheet-key".to_string()),
            ("GOOGLE_ACCESS_TOKEN", "ya29.test".to_string()),
        ]);
        Config::from_lookup(|key| env.get(key).cloned()).unwrap()
    }

    fn endpoints(sheets: &mockito::Server, telegram: &mockito::Server) -> ApiEndpoints {
        ApiEndpoints {
            telegram: Some(telegram.url().parse().unwrap()),
            sheets: sheets.url(),
        }
    }

    fn method(name: &str) -> Matcher {
        Matcher::Regex(format!("^/bot{TOKEN}/{name}$"))
    }

    fn ok(result: serde_json::Value) -> String {
        json!({ "ok": true, "result": result }).to_string()
    }

    async fn sheet_ok(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("GET", "/v4/spreadsheets/sheet-key")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"properties":{"title":"Movies"}}"#)
            .create_async()
            .await
    }

    async fn telegram_ok(server: &mut mockito::Server) -> Vec<mockito::Mock> {
        let get_me = server
            .mock("POST", method("GetMe"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok(json!({
                "id": 123456789,
                "is_bot": true,
                "first_name": "Movies",
                "username": "moviebot",
                "can_join_groups": true,
                "can_read_all_group_messages": false,
                "supports_inline_queries": false,
                "can_connect_to_business": false,
                "has_main_web_app": false
            })))
            .create_async()
            .await;
        let commands = server
            .mock("POST", method("SetMyCommands"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok(json!(true)))
            .create_async()
            .await;
        vec![get_me, commands]
    }

    #[tokio::test]
    async fn test_start_registers_joined_webhook_url() {
        let mut sheets = mockito::Server::new_async().await;
        let mut telegram = mockito::Server::new_async().await;
        let sheet = sheet_ok(&mut sheets).await;
        let _telegram = telegram_ok(&mut telegram).await;
        let set_webhook = telegram
            .mock("POST", method("SetWebhook"))
            .match_body(Matcher::PartialJson(json!({ "url": "https://bot.example.com/hook" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok(json!(true)))
            .expect(1)
            .create_async()
            .await;

        let app = App::on_start_with(&config(), &endpoints(&sheets, &telegram)).await;

        assert!(app.is_ok(), "startup failed: {:?}", app.err().map(|e| e.to_string()));
        sheet.assert_async().await;
        set_webhook.assert_async().await;
    }

    #[tokio::test]
    async fn test_sheet_failure_aborts_before_telegram() {
        let mut sheets = mockito::Server::new_async().await;
        let mut telegram = mockito::Server::new_async().await;
        let _sheet = sheets
            .mock("GET", "/v4/spreadsheets/sheet-key")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"denied"}}"#)
            .create_async()
            .await;
        let untouched = telegram
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = App::on_start_with(&config(), &endpoints(&sheets, &telegram)).await;

        assert!(matches!(result, Err(StartupError::Sheets(Error::UpstreamUnavailable(_)))));
        untouched.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_rejection_aborts_startup() {
        let mut sheets = mockito::Server::new_async().await;
        let mut telegram = mockito::Server::new_async().await;
        let _sheet = sheet_ok(&mut sheets).await;
        let _telegram = telegram_ok(&mut telegram).await;
        let _set_webhook = telegram
            .mock("POST", method("SetWebhook"))
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: bad webhook"}"#)
            .create_async()
            .await;

        let result = App::on_start_with(&config(), &endpoints(&sheets, &telegram)).await;

        assert!(matches!(result, Err(StartupError::Telegram(_))));
    }

    #[tokio::test]
    async fn test_stop_deletes_webhook() {
        let mut sheets = mockito::Server::new_async().await;
        let mut telegram = mockito::Server::new_async().await;
        let _sheet = sheet_ok(&mut sheets).await;
        let _telegram = telegram_ok(&mut telegram).await;
        let _set_webhook = telegram
            .mock("POST", method("SetWebhook"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok(json!(true)))
            .create_async()
            .await;
        let delete_webhook = telegram
            .mock("POST", method("DeleteWebhook"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok(json!(true)))
            .expect(1)
            .create_async()
            .await;

        let app = App::on_start_with(&config(), &endpoints(&sheets, &telegram))
            .await
            .unwrap();
        app.on_stop().await;

        delete_webhook.assert_async().await;
    }
}
