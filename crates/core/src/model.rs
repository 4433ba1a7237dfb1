use serde::{Deserialize, Serialize};

use crate::history::ColorHistory;

/// Signed-in user. Lives in [`GlobalState::user`] only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Access token expiry, epoch millis.
    pub expiry: i64,
}

impl AuthUser {
    pub fn new(access_token: impl Into<String>, expiry: i64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            name: None,
            email: None,
            expiry,
        }
    }

    /// Strictly past expiry; a token expiring exactly now is still valid.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expiry
    }

    /// Token sent to the refresh endpoint: the refresh token when we have
    /// one, otherwise the (expired) access token itself.
    pub fn refresh_credential(&self) -> &str {
        self.refresh_token.as_deref().unwrap_or(&self.access_token)
    }
}

/// A tab inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    pub id: i64,
    pub name: String,
}

/// User-defined extra field attached to every row of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Column {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: String::new(),
        }
    }
}

/// A linked spreadsheet. Identity is the spreadsheet `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub file_name: String,
    pub sheet: SheetRef,
    /// Comment attached to the next submitted row.
    #[serde(default)]
    pub comment: String,
    /// Ranking (0-5) attached to the next submitted row.
    #[serde(default)]
    pub ranking: u8,
    #[serde(default)]
    pub additional_columns: Vec<Column>,
}

impl DriveFile {
    pub fn new(id: impl Into<String>, file_name: impl Into<String>, sheet: SheetRef) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            sheet,
            comment: String::new(),
            ranking: 0,
            additional_columns: Vec::new(),
        }
    }
}

/// One spreadsheet row as formatted by the remote API. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowData {
    pub day: String,
    pub month: String,
    pub year: String,
    pub time: String,
    pub url: String,
    pub hex: String,
    pub rgb: String,
    pub hsl: String,
    pub ranking: String,
    pub comments: String,
    pub additional_columns: Vec<Column>,
}

impl RowData {
    /// Case-insensitive substring match over the displayed fields.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            &self.hex,
            &self.rgb,
            &self.hsl,
            &self.url,
            &self.comments,
            &self.ranking,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
            || self
                .additional_columns
                .iter()
                .any(|c| c.value.to_lowercase().contains(&query))
    }
}

/// Whether the next submission appends a row or rewrites an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    #[default]
    Add,
    Update,
}

/// Aggregate root of the popup. Rehydrated on popup start, persisted after
/// every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalState {
    pub user: Option<AuthUser>,
    pub selected_tab: usize,
    /// Active color (`#RRGGBB`), empty before the first pick.
    pub color: String,
    pub files: Vec<DriveFile>,
    pub selected_file: Option<DriveFile>,
    pub submit_mode: SubmitMode,
    pub update_row_index: Option<u32>,
    pub parsed_data: Vec<RowData>,
    /// Columns drafted for a sheet that has not been created yet.
    pub new_columns: Vec<Column>,
    pub color_history: ColorHistory,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            user: None,
            selected_tab: 0,
            color: String::new(),
            files: Vec::new(),
            selected_file: None,
            submit_mode: SubmitMode::Add,
            update_row_index: None,
            parsed_data: Vec::new(),
            new_columns: Vec::new(),
            color_history: ColorHistory::default(),
        }
    }
}

impl GlobalState {
    /// Fresh state starting from the given (usually empty) history.
    pub fn with_history(history: ColorHistory) -> Self {
        Self {
            color_history: history,
            ..Self::default()
        }
    }

    pub fn file(&self, id: &str) -> Option<&DriveFile> {
        self.files.iter().find(|f| f.id == id)
    }

    /// Signed in and a sheet is selected: everything a row write needs.
    pub fn sheet_context(&self) -> Option<(&AuthUser, &DriveFile)> {
        Some((self.user.as_ref()?, self.selected_file.as_ref()?))
    }
}
