//! Popup session: the single `GlobalState` store, toasts with auto-hide,
//! and the sheet effects behind each popup action.

mod error;
mod session;
mod store;
mod toaster;

pub use error::PopupError;
pub use session::{Limits, PopupSession};
pub use store::PopupStore;
pub use toaster::{Toaster, ToastTimer};
