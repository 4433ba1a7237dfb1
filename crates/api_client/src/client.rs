//! Spreadsheet API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). The client holds no
//! credentials: every authenticated call takes a [`Credentials`] value, so
//! there is no shared token cache to keep in sync.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use swatchsheet_core::{hex_to_hsl, hex_to_rgb, AuthUser, Column, DriveFile, RowData, SheetRef};

/// Bearer credentials for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into() }
    }
}

impl From<&AuthUser> for Credentials {
    fn from(user: &AuthUser) -> Self {
        Self::new(user.access_token.clone())
    }
}

/// Error type for API operations.
#[derive(Debug)]
pub enum ApiError {
    /// No signed-in user to take credentials from
    NotAuthenticated,
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Server rejected the request (400/422 with message)
    Validation(String),
    /// JSON parsing error
    Parse(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotAuthenticated => write!(f, "Not signed in"),
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ApiError::Validation(msg) => write!(f, "{}", msg),
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// A spreadsheet as described by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub spreadsheet_id: String,
    pub file_name: String,
    pub sheet: SheetRef,
    #[serde(default)]
    pub additional_columns: Vec<Column>,
}

impl SheetInfo {
    pub fn into_drive_file(self) -> DriveFile {
        DriveFile {
            additional_columns: self.additional_columns,
            ..DriveFile::new(self.spreadsheet_id, self.file_name, self.sheet)
        }
    }
}

/// Body of "create sheet".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSheetRequest {
    pub file_name: String,
    pub sheet_name: String,
    pub additional_columns: Vec<Column>,
}

/// One color row as written to the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRow {
    pub spreadsheet_id: String,
    pub sheet_id: i64,
    pub sheet_name: String,
    pub hex: String,
    pub rgb: String,
    pub hsl: String,
    pub url: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub ranking: u8,
    pub comments: String,
    pub additional_columns: Vec<Column>,
}

impl ColorRow {
    /// Row for `hex` in `file`, with the derived RGB/HSL strings and the
    /// file's pending comment/ranking/extra column values.
    pub fn new(file: &DriveFile, hex: &str, url: Option<&str>, timestamp: String) -> Self {
        Self {
            spreadsheet_id: file.id.clone(),
            sheet_id: file.sheet.id,
            sheet_name: file.sheet.name.clone(),
            hex: hex.to_string(),
            rgb: hex_to_rgb(hex),
            hsl: hex_to_hsl(hex),
            url: url.unwrap_or_default().to_string(),
            timestamp,
            ranking: file.ranking,
            comments: file.comment.clone(),
            additional_columns: file.additional_columns.clone(),
        }
    }
}

/// Answer of "check add-or-update": whether this color already has a row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOrUpdate {
    pub exists: bool,
    #[serde(default)]
    pub row_index: Option<u32>,
}

/// New access token from the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefresh {
    pub access_token: String,
    /// Epoch millis.
    pub expiry: i64,
}

/// Current UTC time as RFC 3339, the timestamp format rows carry.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Spreadsheet API client (blocking).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    api_base: String,
}

impl ApiClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("swatchsheet/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Create a spreadsheet with the standard columns plus `additional_columns`.
    pub fn create_sheet(&self, creds: &Credentials, req: &CreateSheetRequest) -> Result<SheetInfo, ApiError> {
        let url = format!("{}/sheets", self.api_base);
        let resp = self.send(self.http.post(&url).json(req), Some(creds))?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Resolve a pasted Google Sheets URL.
    pub fn get_sheet_by_url(&self, creds: &Credentials, sheet_url: &str) -> Result<SheetInfo, ApiError> {
        let url = format!("{}/sheets/by-url", self.api_base);
        let resp = self.send(self.http.get(&url).query(&[("url", sheet_url)]), Some(creds))?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Whether the spreadsheet still exists and is writable.
    pub fn check_sheet(&self, creds: &Credentials, spreadsheet_id: &str) -> Result<bool, ApiError> {
        let url = format!("{}/sheets/{}/check", self.api_base, spreadsheet_id);
        let resp = self.send(self.http.get(&url), Some(creds))?;
        let json: serde_json::Value = resp.json().map_err(|e| ApiError::Parse(e.to_string()))?;
        json["valid"]
            .as_bool()
            .ok_or_else(|| ApiError::Parse("Missing valid in response".into()))
    }

    /// All rows of the file's selected sheet, already formatted.
    pub fn list_rows(&self, creds: &Credentials, file: &DriveFile) -> Result<Vec<RowData>, ApiError> {
        let url = format!("{}/sheets/{}/rows", self.api_base, file.id);
        let req = self.http.get(&url).query(&[("sheetName", file.sheet.name.as_str())]);
        let resp = self.send(req, Some(creds))?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub fn add_color(&self, creds: &Credentials, row: &ColorRow) -> Result<(), ApiError> {
        let url = format!("{}/sheets/{}/rows", self.api_base, row.spreadsheet_id);
        self.send(self.http.post(&url).json(row), Some(creds))?;
        Ok(())
    }

    pub fn update_row(&self, creds: &Credentials, row_index: u32, row: &ColorRow) -> Result<(), ApiError> {
        let url = format!("{}/sheets/{}/rows/{}", self.api_base, row.spreadsheet_id, row_index);
        self.send(self.http.put(&url).json(row), Some(creds))?;
        Ok(())
    }

    pub fn check_add_or_update(&self, creds: &Credentials, row: &ColorRow) -> Result<AddOrUpdate, ApiError> {
        let url = format!("{}/sheets/{}/rows/check", self.api_base, row.spreadsheet_id);
        let resp = self.send(self.http.post(&url).json(row), Some(creds))?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Add an extra column to the file's sheet. The server assigns the id.
    pub fn add_column(&self, creds: &Credentials, file: &DriveFile, name: &str) -> Result<Column, ApiError> {
        let url = format!("{}/sheets/{}/columns", self.api_base, file.id);
        let body = serde_json::json!({
            "sheetId": file.sheet.id,
            "sheetName": file.sheet.name,
            "name": name,
        });
        let resp = self.send(self.http.post(&url).json(&body), Some(creds))?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub fn remove_column(&self, creds: &Credentials, file: &DriveFile, column_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/sheets/{}/columns/{}", self.api_base, file.id, column_id);
        let req = self.http.delete(&url).query(&[("sheetName", file.sheet.name.as_str())]);
        self.send(req, Some(creds))?;
        Ok(())
    }

    /// Exchange a refresh token (or an expired JWT) for a new access token.
    /// Unauthenticated: the expired token is the credential.
    pub fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefresh, ApiError> {
        let url = format!("{}/auth/refresh", self.api_base);
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let resp = self.send(self.http.post(&url).json(&body), None)?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send(
        &self,
        req: reqwest::blocking::RequestBuilder,
        creds: Option<&Credentials>,
    ) -> Result<reqwest::blocking::Response, ApiError> {
        let req = match creds {
            Some(creds) => req.bearer_auth(&creds.access_token),
            None => req,
        };

        let response = req.send().map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            if status == 422 || status == 400 {
                return Err(ApiError::Validation(body));
            }
            return Err(ApiError::Http(status, body));
        }

        Ok(response)
    }
}
