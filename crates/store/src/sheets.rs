//! Google Sheets v4 implementation of [`TabularStore`].

use crate::address::{cell_address, column_range, sheet_range};
use crate::credentials::{CredentialSource, TokenProvider};
use crate::error::{StoreError, StoreResult};
use crate::TabularStore;
use async_trait::async_trait;
use ledgerline_core::{CellValue, CellWrite};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tokio::sync::OnceCell;

pub const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_DRIVE_BASE: &str = "https://www.googleapis.com";

/// Cells are stored exactly as sent; text such as "May-25" or "007" is
/// never reinterpreted as a date or number.
const VALUE_INPUT_OPTION: &str = "RAW";

/// Connection settings for one spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet title, looked up through Drive when no id is given.
    pub spreadsheet_name: String,
    pub spreadsheet_id: Option<String>,
    pub sheets_base: String,
    pub drive_base: String,
    pub timeout_secs: u64,
}

impl SheetsConfig {
    pub fn new(spreadsheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_name: spreadsheet_name.into(),
            spreadsheet_id: None,
            sheets_base: DEFAULT_SHEETS_BASE.to_string(),
            drive_base: DEFAULT_DRIVE_BASE.to_string(),
            timeout_secs: 30,
        }
    }

    #[must_use]
    pub fn with_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_base_urls(mut self, sheets_base: impl Into<String>, drive_base: impl Into<String>) -> Self {
        self.sheets_base = sheets_base.into();
        self.drive_base = drive_base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
}

/// A spreadsheet opened through the Sheets REST API.
pub struct SheetsStore {
    client: Client,
    tokens: TokenProvider,
    config: SheetsConfig,
    spreadsheet_id: OnceCell<String>,
}

impl SheetsStore {
    /// Open a spreadsheet handle.
    ///
    /// No request is made here; the spreadsheet id and the access token are
    /// resolved on first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Http` if building the underlying HTTP client fails.
    pub fn open(config: SheetsConfig, credentials: CredentialSource) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let spreadsheet_id = match &config.spreadsheet_id {
            Some(id) => OnceCell::new_with(Some(id.clone())),
            None => OnceCell::new(),
        };
        Ok(Self {
            tokens: TokenProvider::new(credentials, client.clone()),
            client,
            config,
            spreadsheet_id,
        })
    }

    async fn spreadsheet_id(&self) -> StoreResult<&str> {
        self.spreadsheet_id
            .get_or_try_init(|| self.find_spreadsheet())
            .await
            .map(String::as_str)
    }

    async fn find_spreadsheet(&self) -> StoreResult<String> {
        let name = &self.config.spreadsheet_name;
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let url = endpoint(&self.config.drive_base, &["drive", "v3", "files"])?;
        let request = self
            .client
            .get(url)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);
        let list: FileList = self.send_json(request).await?;

        let id = list
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| StoreError::TableNotFound { name: name.clone() })?;
        tracing::info!(spreadsheet = %name, id = %id, "resolved spreadsheet");
        Ok(id)
    }

    async fn values_url(&self, range: &str) -> StoreResult<Url> {
        let id = self.spreadsheet_id().await?;
        endpoint(&self.config.sheets_base, &["v4", "spreadsheets", id, "values", range])
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<reqwest::Response> {
        let token = self.tokens.token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = api_message(&body).unwrap_or(body);
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            self.tokens.invalidate().await;
            return Err(StoreError::Auth(format!("{status}: {message}")));
        }
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn read_values(&self, range: &str, columns: bool) -> StoreResult<Vec<Vec<String>>> {
        let url = self.values_url(range).await?;
        let major = if columns { "COLUMNS" } else { "ROWS" };
        let request = self.client.get(url).query(&[
            ("majorDimension", major),
            ("valueRenderOption", "FORMATTED_VALUE"),
        ]);
        let range: ValueRange = self.send_json(request).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let id = self.spreadsheet_id().await?;
        let url = endpoint(&self.config.sheets_base, &["v4", "spreadsheets", id])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let meta: SpreadsheetMeta = self.send_json(request).await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn get_table(&self, table: &str) -> StoreResult<Vec<Vec<String>>> {
        self.read_values(&sheet_range(table), false).await
    }

    async fn get_column(&self, table: &str, index: usize) -> StoreResult<Vec<String>> {
        let mut columns = self.read_values(&column_range(table, index), true).await?;
        Ok(if columns.is_empty() {
            Vec::new()
        } else {
            columns.swap_remove(0)
        })
    }

    async fn append_row(&self, table: &str, row: &[CellValue]) -> StoreResult<()> {
        let url = self
            .values_url(&format!("{}:append", sheet_range(table)))
            .await?;
        let request = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", VALUE_INPUT_OPTION),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [row] }));
        self.send(request).await?;
        tracing::info!(table, cells = row.len(), "appended row");
        Ok(())
    }

    async fn write_cells(&self, table: &str, cells: &[CellWrite]) -> StoreResult<()> {
        if cells.is_empty() {
            return Ok(());
        }
        let id = self.spreadsheet_id().await?;
        let url = endpoint(
            &self.config.sheets_base,
            &["v4", "spreadsheets", id, "values:batchUpdate"],
        )?;
        let data: Vec<JsonValue> = cells
            .iter()
            .map(|cell| {
                json!({
                    "range": cell_address(table, cell.row, cell.col),
                    "values": [[cell.value]],
                })
            })
            .collect();
        let request = self.client.post(url).json(&json!({
            "valueInputOption": VALUE_INPUT_OPTION,
            "data": data,
        }));
        self.send(request).await?;
        tracing::info!(table, cells = cells.len(), "wrote cells");
        Ok(())
    }
}

/// Build `base/seg/seg/...`, percent-encoding each segment.
fn endpoint(base: &str, segments: &[&str]) -> StoreResult<Url> {
    let mut url =
        Url::parse(base).map_err(|e| StoreError::Config(format!("invalid API base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| StoreError::Config(format!("API base URL cannot hold a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Render one returned cell as display text.
fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Pull `error.message` out of a Google API error body.
fn api_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}
