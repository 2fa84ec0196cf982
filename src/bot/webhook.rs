//! Webhook HTTP surface and update dispatch.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use teloxide::types::Update;
use tracing::{debug, warn};

use crate::bot::handlers::BotContext;
use crate::bot::router::{Intent, IntentRouter};
use crate::bot::telegram::Messenger;
use crate::error::Error;
use crate::sheets::RowStore;

/// Decodes webhook payloads and runs the matching handler.
pub struct Dispatcher<S, M> {
    context: BotContext<S, M>,
    router: IntentRouter,
    /// Reject undecodable payloads instead of acknowledging them.
    strict: bool,
}

impl<S: RowStore, M: Messenger> Dispatcher<S, M> {
    pub fn new(context: BotContext<S, M>, router: IntentRouter, strict: bool) -> Self {
        Self {
            context,
            router,
            strict,
        }
    }

    pub fn context(&self) -> &BotContext<S, M> {
        &self.context
    }

    /// Handle one raw update. Returns the intent that ran, if any.
    pub async fn handle(&self, raw: &[u8]) -> Result<Option<Intent>, Error> {
        let update: Update =
            serde_json::from_slice(raw).map_err(|e| Error::MalformedUpdate(e.to_string()))?;

        let Some(routed) = self.router.route(&update) else {
            debug!("Ignoring update without a routable message");
            return Ok(None);
        };

        match routed.intent {
            Intent::Start => {
                self.context.handle_start(routed.chat_id).await;
            }
            Intent::Search => {
                self.context
                    .handle_search(routed.chat_id, &routed.text, routed.sender.as_deref())
                    .await;
            }
        }
        Ok(Some(routed.intent))
    }
}

/// `GET /` health check and `POST {path}` for updates.
pub fn router<S: RowStore, M: Messenger>(dispatcher: Arc<Dispatcher<S, M>>, path: &str) -> Router {
    Router::new()
        .route("/", get(health))
        .route(path, post(receive::<S, M>))
        .with_state(dispatcher)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn receive<S: RowStore, M: Messenger>(
    State(dispatcher): State<Arc<Dispatcher<S, M>>>,
    body: Bytes,
) -> Response {
    match dispatcher.handle(&body).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => {
            warn!("Webhook payload rejected: {e}");
            if dispatcher.strict {
                (StatusCode::BAD_REQUEST, Json(json!({ "ok": false }))).into_response()
            } else {
                (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
            }
        }
    }
}
