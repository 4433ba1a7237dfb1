//! Local persistence of the popup state and the picker records.
//!
//! Reads are infallible by contract: a missing key and a blob that no
//! longer parses are both a cache miss.

use serde::de::DeserializeOwned;
use serde::Serialize;

use swatchsheet_core::GlobalState;
use swatchsheet_protocol::{LastPickedColor, PickerCancelled};

use crate::store::{KeyValueStore, StoreError};

/// Full application state blob.
pub const STATE_KEY: &str = "swatchsheet.state";
/// Last color reported by the in-page picker.
pub const LAST_PICKED_KEY: &str = "swatchsheet.lastPickedColor";
/// Set when the in-page picker was aborted.
pub const PICKER_CANCELLED_KEY: &str = "swatchsheet.colorPickerCancelled";

pub fn fetch_state(store: &dyn KeyValueStore) -> Option<GlobalState> {
    load_json(store, STATE_KEY)
}

pub fn store_state(store: &dyn KeyValueStore, state: &GlobalState) -> Result<(), StoreError> {
    save_json(store, STATE_KEY, state)
}

pub fn clear_stored_state(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.remove(STATE_KEY)
}

pub fn save_last_picked(store: &dyn KeyValueStore, record: &LastPickedColor) -> Result<(), StoreError> {
    save_json(store, LAST_PICKED_KEY, record)
}

pub fn load_last_picked(store: &dyn KeyValueStore) -> Option<LastPickedColor> {
    load_json(store, LAST_PICKED_KEY)
}

pub fn save_picker_cancelled(store: &dyn KeyValueStore, record: &PickerCancelled) -> Result<(), StoreError> {
    save_json(store, PICKER_CANCELLED_KEY, record)
}

pub fn load_picker_cancelled(store: &dyn KeyValueStore) -> Option<PickerCancelled> {
    load_json(store, PICKER_CANCELLED_KEY)
}

fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Stored value under {} does not parse, treating as missing: {}", key, e);
            None
        }
    }
}

fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    store.set(key, json)
}
