//! Core types shared by the background router and the popup.
//!
//! Pure code only: no I/O, no clocks, no threads.

pub mod color;
pub mod history;
pub mod model;
pub mod state;
pub mod toast;

pub use color::{hex_to_hsl, hex_to_rgb, is_dark, normalize_hex, parse_hex, Rgb, INVALID_COLOR};
pub use history::{ColorHistory, DuplicatePolicy, DEFAULT_HISTORY_MAX};
pub use model::{AuthUser, Column, DriveFile, GlobalState, RowData, SheetRef, SubmitMode};
pub use state::{reduce, Action};
pub use toast::{reduce_toast, ToastAction, ToastKind, ToastState, DEFAULT_TOAST_TIMEOUT_MS};
