//! Background message router: relays between the in-page picker and the
//! popup, drives picker injection and syncs picked colors to the sheet.
//!
//! The browser is reached only through [`BrowserPlatform`] and
//! [`PopupPort`], so the router runs natively in tests and in the CLI.

mod platform;
mod port;
mod router;
mod submit;

pub use platform::{is_restricted_url, BrowserPlatform, Tab};
pub use port::{popup_channel, ChannelPort, PopupPort, PortClosed};
pub use router::{
    BackgroundRouter, ConnectionId, Responder, RouterConfig, DEFAULT_INJECT_DELAY,
};
pub use submit::{prepare_submission, submit_detached};
