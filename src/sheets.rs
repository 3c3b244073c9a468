//! Google Sheets source reader.
//!
//! Blocking reqwest client. A spreadsheet is found by its display name
//! through the Drive files API unless the dataset pins its id, then the
//! configured range is read from the Sheets values API.

use crate::config::DatasetConfig;
use crate::credentials::{AccessToken, ServiceAccountKey};
use crate::error::{Result, SheetSyncError};
use crate::source::SourceReader;
use crate::table::RemoteTable;
use reqwest::Url;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Reads ranges from Google Sheets with a service-account key
pub struct SheetsReader {
    http: reqwest::blocking::Client,
    credentials_path: PathBuf,
    key: Mutex<Option<ServiceAccountKey>>,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsReader {
    /// The key file is read on first fetch, so a missing key fails the
    /// first dataset rather than construction.
    pub fn new(credentials_path: PathBuf) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("sheetsync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SheetSyncError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials_path,
            key: Mutex::new(None),
            token: Mutex::new(None),
        })
    }

    fn access_token(&self, sheet: &str) -> Result<String> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| SheetSyncError::source_unavailable(sheet, "token cache poisoned"))?;
        if let Some(cached) = token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(cached.token.clone());
        }

        let mut key = self
            .key
            .lock()
            .map_err(|_| SheetSyncError::source_unavailable(sheet, "credential cache poisoned"))?;
        if key.is_none() {
            log::info!("Authorizing Google Sheets client...");
            *key = Some(ServiceAccountKey::load(&self.credentials_path, sheet)?);
        }
        let fresh = match key.as_ref() {
            Some(k) => k.fetch_token(&self.http, sheet)?,
            None => return Err(SheetSyncError::source_unavailable(sheet, "credentials not loaded")),
        };

        let value = fresh.token.clone();
        *token = Some(fresh);
        Ok(value)
    }

    fn get_json(&self, url: Url, sheet: &str) -> Result<Value> {
        let token = self.access_token(sheet)?;
        log::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|e| SheetSyncError::source_unavailable(sheet, format!("network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SheetSyncError::source_unavailable(
                sheet,
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }

        response
            .json()
            .map_err(|e| SheetSyncError::source_unavailable(sheet, format!("unreadable response: {}", e)))
    }

    /// Find a spreadsheet id by exact display name
    fn find_spreadsheet(&self, sheet: &str) -> Result<String> {
        let mut url = parse_url(DRIVE_FILES_URL, sheet)?;
        url.query_pairs_mut()
            .append_pair("q", &drive_query(sheet))
            .append_pair("fields", "files(id,name)")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        let json = self.get_json(url, sheet)?;
        spreadsheet_id_from_listing(&json)
            .ok_or_else(|| SheetSyncError::source_unavailable(sheet, "spreadsheet not found or not shared"))
    }

    /// Title of the first worksheet tab
    fn first_worksheet(&self, spreadsheet_id: &str, sheet: &str) -> Result<String> {
        let mut url = parse_url(SHEETS_API_BASE, sheet)?;
        url.path_segments_mut()
            .map_err(|_| SheetSyncError::source_unavailable(sheet, "bad API base URL"))?
            .push(spreadsheet_id);
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(title,index)");

        let json = self.get_json(url, sheet)?;
        first_worksheet_title(&json)
            .ok_or_else(|| SheetSyncError::source_unavailable(sheet, "spreadsheet has no worksheets"))
    }

    fn read_values(&self, spreadsheet_id: &str, a1_range: &str, sheet: &str) -> Result<Vec<Vec<String>>> {
        let mut url = parse_url(SHEETS_API_BASE, sheet)?;
        url.path_segments_mut()
            .map_err(|_| SheetSyncError::source_unavailable(sheet, "bad API base URL"))?
            .push(spreadsheet_id)
            .push("values")
            .push(a1_range);
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");

        let json = self.get_json(url, sheet)?;
        Ok(grid_from_values(&json))
    }
}

impl SourceReader for SheetsReader {
    fn fetch(&self, dataset: &DatasetConfig) -> Result<RemoteTable> {
        log::info!("Opening Google Sheet '{}'...", dataset.sheet);
        let spreadsheet_id = match &dataset.spreadsheet_id {
            Some(id) => id.clone(),
            None => self.find_spreadsheet(&dataset.sheet)?,
        };
        let worksheet = match &dataset.worksheet {
            Some(title) => title.clone(),
            None => self.first_worksheet(&spreadsheet_id, &dataset.sheet)?,
        };

        log::info!("Fetching data range {} from the Google Sheet...", dataset.range);
        let grid = self.read_values(&spreadsheet_id, &qualified_range(&worksheet, &dataset.range.to_string()), &dataset.sheet)?;
        RemoteTable::from_grid(&dataset.sheet, &dataset.range, grid)
    }

    fn describe(&self) -> String {
        format!("Google Sheets (credentials: {})", self.credentials_path.display())
    }
}

fn parse_url(url: &str, sheet: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| SheetSyncError::source_unavailable(sheet, format!("bad URL '{}': {}", url, e)))
}

/// Drive search query matching one spreadsheet by exact name
pub fn drive_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME
    )
}

/// `'Tab title'!A1:K21`
pub fn qualified_range(worksheet: &str, range: &str) -> String {
    format!("'{}'!{}", worksheet.replace('\'', "''"), range)
}

/// First file id of a Drive listing
pub fn spreadsheet_id_from_listing(json: &Value) -> Option<String> {
    json["files"]
        .as_array()?
        .iter()
        .find_map(|f| f["id"].as_str().map(String::from))
}

/// Title of the lowest-index worksheet in a spreadsheet resource
pub fn first_worksheet_title(json: &Value) -> Option<String> {
    json["sheets"]
        .as_array()?
        .iter()
        .filter_map(|s| {
            let props = &s["properties"];
            Some((props["index"].as_i64().unwrap_or(0), props["title"].as_str()?.to_string()))
        })
        .min_by_key(|(index, _)| *index)
        .map(|(_, title)| title)
}

/// Cell grid of a values response. A missing `values` field means the
/// range is empty.
pub fn grid_from_values(json: &Value) -> Vec<Vec<String>> {
    json["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
