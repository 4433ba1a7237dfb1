//! Toast notifications with auto-hide.
//!
//! Every `display` arms a fresh [`ToastTimer`] tied to the message's serial
//! and drops the previous one. A timer only hides the toast it was armed
//! for, so replacing a message restarts the countdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use swatchsheet_core::{reduce_toast, ToastAction, ToastKind, ToastState};

/// Pending auto-hide. Dropping it cancels the hide.
pub struct ToastTimer {
    cancelled: Arc<AtomicBool>,
}

impl ToastTimer {
    fn arm(state: Arc<Mutex<ToastState>>, serial: u64, timeout: Duration) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        thread::spawn(move || {
            thread::sleep(timeout);
            if flag.load(Ordering::SeqCst) {
                return;
            }
            let mut current = lock(&state);
            if current.serial == serial && current.is_displaying() {
                *current = reduce_toast(&current, ToastAction::Hide);
            }
        });
        Self { cancelled }
    }
}

impl Drop for ToastTimer {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

fn lock(state: &Mutex<ToastState>) -> MutexGuard<'_, ToastState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Toaster {
    state: Arc<Mutex<ToastState>>,
    timeout: Duration,
    timer: Option<ToastTimer>,
}

impl Toaster {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            timeout,
            timer: None,
        }
    }

    pub fn current(&self) -> ToastState {
        lock(&self.state).clone()
    }

    pub fn display(&mut self, kind: ToastKind, message: impl Into<String>) {
        let serial = {
            let mut state = lock(&self.state);
            *state = reduce_toast(&state, ToastAction::Display { kind, message: message.into() });
            state.serial
        };
        // Replacing the guard cancels the previous countdown.
        self.timer = Some(ToastTimer::arm(Arc::clone(&self.state), serial, self.timeout));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.display(ToastKind::Error, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.display(ToastKind::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.display(ToastKind::Info, message);
    }

    pub fn hide(&mut self) {
        self.timer = None;
        let mut state = lock(&self.state);
        *state = reduce_toast(&state, ToastAction::Hide);
    }
}
