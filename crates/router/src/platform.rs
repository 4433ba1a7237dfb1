//! Browser seams the router drives: tabs, screen capture, script injection.

/// A browser tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u32,
    pub url: String,
}

/// What the browser gives the background router. Errors are plain strings:
/// they are only ever logged or forwarded verbatim in a reply.
pub trait BrowserPlatform: Send + Sync {
    /// Active tab of the focused window.
    fn active_tab(&self) -> Option<Tab>;

    /// Visible area of the active tab as a `data:image/png;base64,...` URL.
    fn capture_visible_tab(&self) -> Result<String, String>;

    /// Inject the in-page picker script. The script reports back with
    /// exactly one COLOR_PICKED or COLOR_PICKER_CANCELLED.
    fn inject_picker(&self, tab_id: u32) -> Result<(), String>;

    /// Programmatically show the popup again. Not supported everywhere.
    fn open_popup(&self) -> Result<(), String>;
}

/// Whether the picker must not run on `url`: privileged browser pages, or
/// anything that is not a parseable URL.
pub fn is_restricted_url(url: &str, restricted_schemes: &[String]) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => restricted_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(parsed.scheme())),
        Err(_) => true,
    }
}
