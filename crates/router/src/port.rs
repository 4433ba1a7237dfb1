//! The popup's long-lived channel, as seen from the router.

use std::sync::mpsc;

use swatchsheet_protocol::PopupEvent;

/// Posting to a popup that has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortClosed;

impl std::fmt::Display for PortClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "popup channel closed")
    }
}

impl std::error::Error for PortClosed {}

pub trait PopupPort: Send + Sync {
    fn post(&self, event: &PopupEvent) -> Result<(), PortClosed>;
}

/// In-process popup channel backed by an mpsc pair.
pub struct ChannelPort {
    tx: mpsc::Sender<PopupEvent>,
}

impl PopupPort for ChannelPort {
    fn post(&self, event: &PopupEvent) -> Result<(), PortClosed> {
        self.tx.send(event.clone()).map_err(|_| PortClosed)
    }
}

/// Router end and popup end of a fresh channel.
pub fn popup_channel() -> (ChannelPort, mpsc::Receiver<PopupEvent>) {
    let (tx, rx) = mpsc::channel();
    (ChannelPort { tx }, rx)
}
