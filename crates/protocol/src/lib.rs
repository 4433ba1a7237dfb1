//! Swatchsheet router protocol.
//!
//! Two transports carry these types, both as JSON:
//!
//! - one-shot request/reply: the in-page picker script and the popup send a
//!   [`RouterMessage`], the background router answers with a [`Reply`];
//! - the long-lived popup channel (named [`POPUP_CHANNEL`]): the router
//!   pushes [`PopupEvent`]s to the popup while it is open.
//!
//! Messages are tagged unions on `"type"`. A message with an unknown type
//! fails to parse and is dropped by the router, never answered.
//!
//! ```ignore
//! use swatchsheet_protocol::{RouterMessage, Reply};
//!
//! let msg = RouterMessage::from_json(r##"{"type":"COLOR_PICKED","color":"#FF0000"}"##)?;
//! let reply = Reply::ok();
//! ```

use serde::{Deserialize, Serialize};

/// Name the popup connects under. Connections with any other name are
/// not tracked by the router.
pub const POPUP_CHANNEL: &str = "swatchsheet-popup";

// =============================================================================
// Page / Popup → Router
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouterMessage {
    /// Screenshot of the visible area of the active tab. Answered
    /// asynchronously.
    CaptureScreen,
    /// Terminal message of a picker run: the user clicked a pixel.
    ColorPicked {
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Terminal message of a picker run: the user pressed Escape.
    ColorPickerCancelled,
    /// Ask the browser to show the popup again.
    OpenPopup,
    /// Validate the active tab and inject the picker script into it.
    StartColorPicker,
}

impl RouterMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // Serializing these variants cannot fail: no maps with non-string keys.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RouterMessage::CaptureScreen => "CAPTURE_SCREEN",
            RouterMessage::ColorPicked { .. } => "COLOR_PICKED",
            RouterMessage::ColorPickerCancelled => "COLOR_PICKER_CANCELLED",
            RouterMessage::OpenPopup => "OPEN_POPUP",
            RouterMessage::StartColorPicker => "START_COLOR_PICKER",
        }
    }
}

/// Router answer to a one-shot message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub success: bool,
    /// `data:image/png;base64,...` for CAPTURE_SCREEN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self { success: true, data_url: None, error: None }
    }

    pub fn capture(data_url: String) -> Self {
        Self { success: true, data_url: Some(data_url), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data_url: None, error: Some(message.into()) }
    }
}

/// One-shot request/reply transport to the background router.
///
/// `None` means the router dropped the message without answering (unknown
/// message, or the reply channel closed).
pub trait RouterLink {
    fn send(&self, message: RouterMessage) -> Option<Reply>;
}

// =============================================================================
// Router → Popup (channel)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PopupEvent {
    ColorPicked {
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

// =============================================================================
// Stored picker records
// =============================================================================

/// Last color the in-page picker reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPickedColor {
    pub color: String,
    /// Epoch millis.
    pub timestamp: i64,
}

/// Written when the user aborts the in-page picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerCancelled {
    pub cancelled: bool,
    /// Epoch millis.
    pub timestamp: i64,
}

// =============================================================================
// Capture pipeline
// =============================================================================

/// Where the color capture pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    #[default]
    Idle,
    /// Tab validated, injection scheduled.
    Requested,
    /// Picker script injected; waiting for its terminal message.
    Capturing,
    Picked,
    Cancelled,
}

impl CapturePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CapturePhase::Picked | CapturePhase::Cancelled)
    }

    /// A new run may start from idle or from a finished run.
    pub fn can_start(self) -> bool {
        self == CapturePhase::Idle || self.is_terminal()
    }
}
