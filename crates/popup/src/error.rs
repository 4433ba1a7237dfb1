use swatchsheet_api::ApiError;

/// Why a popup effect did not happen. Its `Display` text is what the user
/// sees in the error toast.
#[derive(Debug)]
pub enum PopupError {
    /// No signed-in user
    NotSignedIn,
    /// No sheet selected to write to
    NoSheetSelected,
    /// Files or columns at their configured maximum
    LimitReached { what: &'static str, max: usize },
    /// Empty column name, malformed hex, ...
    Invalid(String),
    /// File id not in the linked files
    UnknownFile(String),
    /// Remote sheet exists but is no longer accessible
    SheetUnavailable(String),
    /// Router refused or did not answer START_COLOR_PICKER
    Picker(String),
    /// Remote API failure
    Api(ApiError),
}

impl std::fmt::Display for PopupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PopupError::NotSignedIn => write!(f, "Please sign in first"),
            PopupError::NoSheetSelected => write!(f, "Select a sheet first"),
            PopupError::LimitReached { what, max } => write!(f, "You can have at most {} {}", max, what),
            PopupError::Invalid(msg) => write!(f, "{}", msg),
            PopupError::UnknownFile(id) => write!(f, "Unknown sheet: {}", id),
            PopupError::SheetUnavailable(name) => write!(f, "Sheet \"{}\" is no longer accessible", name),
            PopupError::Picker(msg) => write!(f, "{}", msg),
            PopupError::Api(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PopupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PopupError::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for PopupError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotAuthenticated => PopupError::NotSignedIn,
            other => PopupError::Api(other),
        }
    }
}
