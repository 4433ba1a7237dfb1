//! The popup's single `GlobalState`, mirrored to the durable store after
//! every transition.

use std::sync::Arc;

use swatchsheet_config::{fetch_state, store_state, KeyValueStore, Settings};
use swatchsheet_core::{reduce, Action, GlobalState};

pub struct PopupStore {
    state: GlobalState,
    backend: Arc<dyn KeyValueStore>,
}

impl PopupStore {
    /// Load the persisted state, or start fresh when there is none (or it
    /// does not parse). History limits always follow the current settings.
    pub fn rehydrate(backend: Arc<dyn KeyValueStore>, settings: &Settings) -> Self {
        let state = match fetch_state(backend.as_ref()) {
            Some(mut state) => {
                state.color_history.on_duplicate = settings.history_on_duplicate;
                reduce(&state, Action::SetHistoryMax(settings.history_max))
            }
            None => {
                log::debug!("No stored popup state; starting fresh");
                GlobalState::with_history(settings.empty_history())
            }
        };
        Self { state, backend }
    }

    pub fn state(&self) -> &GlobalState {
        &self.state
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    /// Reduce, then persist. A failed write is logged; the in-memory state
    /// still advances.
    pub fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
        if let Err(e) = store_state(self.backend.as_ref(), &self.state) {
            log::warn!("Failed to persist popup state: {}", e);
        }
    }
}
