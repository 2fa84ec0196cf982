//! Google Sheets v4 REST client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::Error;
use crate::sheets::auth::{Credentials, TokenProvider};
use crate::sheets::{Record, RowStore, records_from_grid};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
/// Applies to every Sheets and token request, so a hung upstream fails the
/// search instead of holding it (and the token lock) open.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    properties: SpreadsheetProperties,
}

#[derive(Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

/// Reads (and optionally appends to) one spreadsheet.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    api_base: String,
    spreadsheet_id: String,
    range: String,
}

impl GoogleSheetsClient {
    pub fn new(credentials: Credentials, spreadsheet_id: String, range: String) -> Result<Self, Error> {
        Self::with_api_base(
            credentials,
            spreadsheet_id,
            range,
            DEFAULT_API_BASE.to_string(),
            REQUEST_TIMEOUT,
        )
    }

    pub fn with_api_base(
        credentials: Credentials,
        spreadsheet_id: String,
        range: String,
        api_base: String,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            tokens: TokenProvider::new(credentials, http.clone()),
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id,
            range,
        })
    }

    /// Authenticate and check the spreadsheet is reachable.
    ///
    /// Returns the spreadsheet title.
    pub async fn connect(&self) -> Result<String, Error> {
        let url = format!(
            "{}/v4/spreadsheets/{}?fields=properties.title",
            self.api_base,
            urlencoding::encode(&self.spreadsheet_id)
        );
        let response = self.get(&url).await?;
        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("bad spreadsheet metadata: {e}")))?;
        info!("✅ Connected to spreadsheet \"{}\"", meta.properties.title);
        Ok(meta.properties.title)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.api_base,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, Error> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| request_error("sheets request", e))?;
        check_status(response).await
    }
}

pub(crate) fn request_error(what: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        warn!("{what} timed out");
        Error::UpstreamUnavailable(format!("{what} timed out: {e}"))
    } else {
        Error::UpstreamUnavailable(format!("{what} failed: {e}"))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!("Sheets API error: {status}");
    Err(Error::UpstreamUnavailable(format!("{status}: {body}")))
}

impl RowStore for GoogleSheetsClient {
    async fn fetch_all(&self) -> Result<Vec<Record>, Error> {
        let response = self.get(&self.values_url(&self.range)).await?;
        let grid: ValueRange = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("bad value range: {e}")))?;
        Ok(records_from_grid(grid.values))
    }

    async fn append_row(&self, range: &str, values: Vec<String>) -> Result<(), Error> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}:append", self.values_url(range));
        let response = self
            .http
            .post(&url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(token)
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .map_err(|e| request_error("sheets append", e))?;
        check_status(response).await?;
        Ok(())
    }
}
