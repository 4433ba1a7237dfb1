//! Background submission of a picked color to the remote sheet.
//!
//! Fire-and-forget: the session and sheet come from the last persisted popup
//! state; without either, nothing is sent. The HTTP result is logged and
//! discarded.

use std::thread::{self, JoinHandle};

use swatchsheet_api::{now_timestamp, ApiClient, ColorRow, Credentials};
use swatchsheet_config::{fetch_state, KeyValueStore};
use swatchsheet_core::normalize_hex;

/// Credentials and row for a background write, or `None` when the stored
/// state has no signed-in user or no selected sheet.
pub fn prepare_submission(
    store: &dyn KeyValueStore,
    color: &str,
    url: Option<&str>,
) -> Option<(Credentials, ColorRow)> {
    let Some(hex) = normalize_hex(color) else {
        log::debug!("Not submitting malformed color {:?}", color);
        return None;
    };
    let state = fetch_state(store)?;
    let (user, file) = state.sheet_context()?;
    Some((
        Credentials::from(user),
        ColorRow::new(file, &hex, url, now_timestamp()),
    ))
}

/// Spawn the POST. Production callers drop the handle.
pub fn submit_detached(api: ApiClient, creds: Credentials, row: ColorRow) -> JoinHandle<()> {
    thread::spawn(move || match api.add_color(&creds, &row) {
        Ok(()) => log::debug!("Synced {} to {}", row.hex, row.spreadsheet_id),
        Err(e) => log::warn!("Background sync of {} failed: {}", row.hex, e),
    })
}
