// Configuration and local persistence

pub mod persist;
pub mod settings;
pub mod store;

pub use persist::{
    clear_stored_state, fetch_state, load_last_picked, load_picker_cancelled, save_last_picked,
    save_picker_cancelled, store_state, LAST_PICKED_KEY, PICKER_CANCELLED_KEY, STATE_KEY,
};
pub use settings::{Settings, DEFAULT_RESTRICTED_SCHEMES};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
