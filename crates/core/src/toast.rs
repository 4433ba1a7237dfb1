//! Transient notifications.
//!
//! Idle (`message == None`) -> Displaying -> Idle. Each `Display` bumps
//! `serial`, so a timer armed for an older message can tell it is stale.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOAST_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToastState {
    pub kind: Option<ToastKind>,
    pub message: Option<String>,
    pub serial: u64,
}

impl ToastState {
    pub fn is_displaying(&self) -> bool {
        self.message.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastAction {
    Display { kind: ToastKind, message: String },
    Hide,
}

pub fn reduce_toast(state: &ToastState, action: ToastAction) -> ToastState {
    match action {
        ToastAction::Display { kind, message } => ToastState {
            kind: Some(kind),
            message: Some(message),
            serial: state.serial.wrapping_add(1),
        },
        ToastAction::Hide => ToastState {
            kind: None,
            message: None,
            serial: state.serial,
        },
    }
}
