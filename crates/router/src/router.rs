//! Background message router.
//!
//! One instance per browser profile, living as long as the extension. It owns
//! the only reference to the open popup's channel and the capture pipeline
//! phase. Everything else it needs comes from the platform and the store on
//! each message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use swatchsheet_api::ApiClient;
use swatchsheet_config::{
    save_last_picked, save_picker_cancelled, KeyValueStore, Settings, DEFAULT_RESTRICTED_SCHEMES,
};
use swatchsheet_protocol::{
    CapturePhase, LastPickedColor, PickerCancelled, PopupEvent, Reply, RouterLink, RouterMessage,
    POPUP_CHANNEL,
};

use crate::platform::{is_restricted_url, BrowserPlatform};
use crate::port::PopupPort;
use crate::submit::{prepare_submission, submit_detached};

/// Default pause between replying to START_COLOR_PICKER and injecting, so the
/// popup has closed before the page changes.
pub const DEFAULT_INJECT_DELAY: Duration = Duration::from_millis(100);

/// Identifies one popup connection.
pub type ConnectionId = u64;

/// Reply callback for one-shot messages. Called at most once.
pub type Responder = Box<dyn FnOnce(Reply) + Send>;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub inject_delay: Duration,
    pub restricted_schemes: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            inject_delay: DEFAULT_INJECT_DELAY,
            restricted_schemes: DEFAULT_RESTRICTED_SCHEMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RouterConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            inject_delay: settings.inject_delay(),
            restricted_schemes: settings.picker_restricted_schemes.clone(),
        }
    }
}

#[derive(Clone)]
struct PopupHandle {
    id: ConnectionId,
    port: Arc<dyn PopupPort>,
}

pub struct BackgroundRouter {
    platform: Arc<dyn BrowserPlatform>,
    store: Arc<dyn KeyValueStore>,
    /// `None` disables background submission.
    api: Option<ApiClient>,
    config: RouterConfig,
    popup: Mutex<Option<PopupHandle>>,
    next_connection: AtomicU64,
    phase: Arc<Mutex<CapturePhase>>,
    /// Bumped by every START; a pending injection only runs for the latest.
    picker_run: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked handler must not take the router down with it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl BackgroundRouter {
    pub fn new(
        platform: Arc<dyn BrowserPlatform>,
        store: Arc<dyn KeyValueStore>,
        api: Option<ApiClient>,
        config: RouterConfig,
    ) -> Self {
        Self {
            platform,
            store,
            api,
            config,
            popup: Mutex::new(None),
            next_connection: AtomicU64::new(1),
            phase: Arc::new(Mutex::new(CapturePhase::Idle)),
            picker_run: Arc::new(AtomicU64::new(0)),
        }
    }

    // ── Popup channel ─────────────────────────────────────────────────

    /// A context opened a long-lived channel. Only channels named
    /// [`POPUP_CHANNEL`] are tracked; a new popup replaces the old one.
    pub fn connect(&self, name: &str, port: Arc<dyn PopupPort>) -> Option<ConnectionId> {
        if name != POPUP_CHANNEL {
            log::debug!("Ignoring channel {:?}", name);
            return None;
        }
        let id = self.next_connection.fetch_add(1, Ordering::SeqCst);
        *lock(&self.popup) = Some(PopupHandle { id, port });
        log::info!("Popup connected (connection {})", id);
        Some(id)
    }

    /// The channel closed. A late disconnect of a replaced connection leaves
    /// the current one alone.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut popup = lock(&self.popup);
        if popup.as_ref().is_some_and(|h| h.id == id) {
            *popup = None;
            log::info!("Popup disconnected (connection {})", id);
        }
    }

    pub fn has_popup(&self) -> bool {
        lock(&self.popup).is_some()
    }

    pub fn phase(&self) -> CapturePhase {
        *lock(&self.phase)
    }

    fn set_phase(&self, phase: CapturePhase) {
        *lock(&self.phase) = phase;
    }

    // ── Dispatch ──────────────────────────────────────────────────────

    /// Entry point for raw JSON from the messaging layer. Messages that do
    /// not parse are dropped unanswered.
    pub fn handle_raw(&self, json: &str, respond: Responder) -> bool {
        match RouterMessage::from_json(json) {
            Ok(message) => self.handle(message, respond),
            Err(e) => {
                log::debug!("Ignoring unrecognized message: {}", e);
                false
            }
        }
    }

    /// Handle one message. Returns `true` when the reply is sent later from
    /// another thread, so the caller must keep the reply channel open.
    pub fn handle(&self, message: RouterMessage, respond: Responder) -> bool {
        log::debug!("Router received {}", message.kind());
        match message {
            RouterMessage::CaptureScreen => {
                self.capture_screen(respond);
                true
            }
            RouterMessage::ColorPicked { color, url } => {
                respond(self.color_picked(color, url));
                false
            }
            RouterMessage::ColorPickerCancelled => {
                respond(self.picker_cancelled());
                false
            }
            RouterMessage::OpenPopup => {
                if let Err(e) = self.platform.open_popup() {
                    log::debug!("Could not reopen popup: {}", e);
                }
                respond(Reply::ok());
                false
            }
            RouterMessage::StartColorPicker => {
                respond(self.start_color_picker());
                false
            }
        }
    }

    // ── Handlers ──────────────────────────────────────────────────────

    fn capture_screen(&self, respond: Responder) {
        let platform = Arc::clone(&self.platform);
        thread::spawn(move || {
            let reply = match platform.capture_visible_tab() {
                Ok(data_url) => Reply::capture(data_url),
                Err(e) => {
                    log::warn!("Screen capture failed: {}", e);
                    Reply::error(e)
                }
            };
            respond(reply);
        });
    }

    fn color_picked(&self, color: String, url: Option<String>) -> Reply {
        let record = LastPickedColor { color: color.clone(), timestamp: now_millis() };
        if let Err(e) = save_last_picked(self.store.as_ref(), &record) {
            log::warn!("Failed to store picked color: {}", e);
        }
        self.set_phase(CapturePhase::Picked);

        // Read the handle once; never hold the lock while posting.
        let popup = lock(&self.popup).clone();
        if let Some(handle) = popup {
            let event = PopupEvent::ColorPicked { color: color.clone(), url: url.clone() };
            if let Err(e) = handle.port.post(&event) {
                log::debug!("Forward to popup {} dropped: {}", handle.id, e);
            }
        }

        if let Some(api) = &self.api {
            match prepare_submission(self.store.as_ref(), &color, url.as_deref()) {
                Some((creds, row)) => {
                    submit_detached(api.clone(), creds, row);
                }
                None => log::debug!("No session or sheet selected; skipping sync of {}", color),
            }
        }

        Reply::ok()
    }

    fn picker_cancelled(&self) -> Reply {
        let record = PickerCancelled { cancelled: true, timestamp: now_millis() };
        if let Err(e) = save_picker_cancelled(self.store.as_ref(), &record) {
            log::warn!("Failed to store picker cancellation: {}", e);
        }
        self.set_phase(CapturePhase::Cancelled);
        Reply::ok()
    }

    fn start_color_picker(&self) -> Reply {
        // Supersedes any injection still waiting out its delay.
        let run = self.picker_run.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut phase = lock(&self.phase);
            if !phase.can_start() {
                // The page script died without reporting back.
                log::info!("Restarting picker from {:?}", *phase);
            }
            // A rejected start below leaves the pipeline idle.
            *phase = CapturePhase::Idle;
        }

        let Some(tab) = self.platform.active_tab() else {
            return Reply::error("No active tab");
        };
        if is_restricted_url(&tab.url, &self.config.restricted_schemes) {
            log::info!("Refusing to pick on restricted page {}", tab.url);
            return Reply::error("Cannot pick colors on this page");
        }

        self.set_phase(CapturePhase::Requested);

        let platform = Arc::clone(&self.platform);
        let phase = Arc::clone(&self.phase);
        let picker_run = Arc::clone(&self.picker_run);
        let delay = self.config.inject_delay;
        thread::spawn(move || {
            thread::sleep(delay);
            if picker_run.load(Ordering::SeqCst) != run {
                log::debug!("Dropping superseded picker injection for tab {}", tab.id);
                return;
            }
            let result = platform.inject_picker(tab.id);

            let mut phase = lock(&phase);
            if picker_run.load(Ordering::SeqCst) != run {
                return;
            }
            match result {
                // The picker may already have reported back.
                Ok(()) if *phase == CapturePhase::Requested => *phase = CapturePhase::Capturing,
                Ok(()) => {}
                Err(e) => {
                    log::error!("Failed to inject picker into tab {}: {}", tab.id, e);
                    *phase = CapturePhase::Idle;
                }
            }
        });

        Reply::ok()
    }
}

/// In-process link: the popup and the router share an address space.
impl RouterLink for BackgroundRouter {
    fn send(&self, message: RouterMessage) -> Option<Reply> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.handle(
            message,
            Box::new(move |reply: Reply| {
                let _ = tx.send(reply);
            }),
        );
        rx.recv().ok()
    }
}
