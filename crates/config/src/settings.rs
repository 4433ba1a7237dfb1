// Application settings
// Loaded from ~/.config/swatchsheet/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use swatchsheet_core::{ColorHistory, DuplicatePolicy, DEFAULT_HISTORY_MAX, DEFAULT_TOAST_TIMEOUT_MS};

/// Browser-internal schemes the picker script may not be injected into.
pub const DEFAULT_RESTRICTED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "chrome-search",
    "edge",
    "brave",
    "about",
    "devtools",
    "view-source",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Remote API
    #[serde(rename = "api.baseUrl")]
    pub api_base_url: String,

    #[serde(rename = "api.timeoutSecs")]
    pub api_timeout_secs: u64,

    // Color history
    #[serde(rename = "history.max")]
    pub history_max: usize,

    #[serde(rename = "history.onDuplicate")]
    pub history_on_duplicate: DuplicatePolicy,

    // Capacity limits (checked by the popup before dispatching)
    #[serde(rename = "files.max")]
    pub files_max: usize,

    #[serde(rename = "columns.max")]
    pub columns_max: usize,

    // Notifications
    #[serde(rename = "toast.timeoutMs")]
    pub toast_timeout_ms: u64,

    // Picker
    #[serde(rename = "picker.injectDelayMs")]
    pub picker_inject_delay_ms: u64,

    #[serde(rename = "picker.restrictedSchemes")]
    pub picker_restricted_schemes: Vec<String>,

    // Cookies
    #[serde(rename = "auth.cookieName")]
    pub auth_cookie_name: String,

    #[serde(rename = "auth.fileCookieName")]
    pub file_cookie_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.swatchsheet.app".to_string(),
            api_timeout_secs: 30,
            history_max: DEFAULT_HISTORY_MAX,
            history_on_duplicate: DuplicatePolicy::MoveToFront,
            files_max: 10,
            columns_max: 5,
            toast_timeout_ms: DEFAULT_TOAST_TIMEOUT_MS,
            picker_inject_delay_ms: 100,
            picker_restricted_schemes: DEFAULT_RESTRICTED_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            auth_cookie_name: "swatchsheet_auth".to_string(),
            file_cookie_name: "swatchsheet_file".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swatchsheet");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load from an explicit path. Missing or broken files give defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(&path, json).map_err(|e| e.to_string())
    }

    /// Empty history configured with this cap and duplicate policy.
    pub fn empty_history(&self) -> ColorHistory {
        ColorHistory::new(self.history_max, self.history_on_duplicate)
    }

    pub fn toast_timeout(&self) -> Duration {
        Duration::from_millis(self.toast_timeout_ms)
    }

    pub fn inject_delay(&self) -> Duration {
        Duration::from_millis(self.picker_inject_delay_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Remote spreadsheet API
    "api.baseUrl": "https://api.swatchsheet.app",
    "api.timeoutSecs": 30,

    // Color history: cap and what a re-pick does ("moveToFront" or "keepPosition")
    "history.max": 20,
    "history.onDuplicate": "moveToFront",

    // Linked spreadsheets and extra columns per sheet
    "files.max": 10,
    "columns.max": 5,

    // Notification auto-hide
    "toast.timeoutMs": 2000,

    // Delay between the popup closing and the picker appearing
    "picker.injectDelayMs": 100,

    // Cookie names
    "auth.cookieName": "swatchsheet_auth",
    "auth.fileCookieName": "swatchsheet_file"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }
}
