//! One popup lifetime: state, toasts, and the effects behind each user
//! action.
//!
//! Effects run on the caller's thread and block on the network. Anything
//! that arrives from elsewhere (picked colors from the router, a refreshed
//! access token) is queued on channels and applied by [`PopupSession::pump`].

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use swatchsheet_api::{
    now_timestamp, refresh_auth_token, ApiClient, AuthSession, ColorRow, CreateSheetRequest,
    Credentials, TokenRefresh,
};
use swatchsheet_config::{
    clear_stored_state, load_last_picked, load_picker_cancelled, KeyValueStore, Settings,
    LAST_PICKED_KEY, PICKER_CANCELLED_KEY,
};
use swatchsheet_core::{normalize_hex, Action, Column, DriveFile, GlobalState, SubmitMode, ToastState};
use swatchsheet_protocol::{PopupEvent, RouterLink, RouterMessage};

use crate::error::PopupError;
use crate::store::PopupStore;
use crate::toaster::Toaster;

/// Capacity limits the UI enforces before dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub files_max: usize,
    pub columns_max: usize,
}

impl Limits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            files_max: settings.files_max,
            columns_max: settings.columns_max,
        }
    }
}

pub struct PopupSession {
    store: PopupStore,
    toaster: Toaster,
    api: ApiClient,
    auth: AuthSession,
    limits: Limits,
    events: Option<Receiver<PopupEvent>>,
    token_tx: Sender<TokenRefresh>,
    token_rx: Receiver<TokenRefresh>,
}

impl PopupSession {
    /// Open the popup: rehydrate state, adopt the cookie session, collect
    /// whatever the picker left behind while the popup was closed, and kick
    /// off a token refresh if the access token has expired.
    ///
    /// `events` is the popup end of the router channel, if connected.
    pub fn start(
        settings: &Settings,
        backend: Arc<dyn KeyValueStore>,
        api: ApiClient,
        auth: AuthSession,
        events: Option<Receiver<PopupEvent>>,
    ) -> Self {
        let (token_tx, token_rx) = mpsc::channel();
        let mut session = Self {
            store: PopupStore::rehydrate(backend, settings),
            toaster: Toaster::new(settings.toast_timeout()),
            api,
            auth,
            limits: Limits::from_settings(settings),
            events,
            token_tx,
            token_rx,
        };

        session.adopt_cookie_session();
        session.take_picker_results();
        session.refresh_if_expired(chrono::Utc::now().timestamp_millis());
        session
    }

    pub fn state(&self) -> &GlobalState {
        self.store.state()
    }

    pub fn toast(&self) -> ToastState {
        self.toaster.current()
    }

    pub fn dispatch(&mut self, action: Action) {
        self.store.dispatch(action);
    }

    // ── Startup ────────────────────────────────────────────────────────

    fn adopt_cookie_session(&mut self) {
        if self.state().user.is_some() {
            return;
        }
        match self.auth.get_auth_cookie() {
            Ok(Some(user)) => {
                log::info!("Signed in from auth cookie");
                self.dispatch(Action::SetUser(Some(user)));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring unreadable auth cookie: {}", e),
        }
    }

    /// Records written by the router while no popup was listening.
    fn take_picker_results(&mut self) {
        let backend = self.store.backend();
        let picked = load_last_picked(backend);
        let cancelled = load_picker_cancelled(backend);
        for key in [LAST_PICKED_KEY, PICKER_CANCELLED_KEY] {
            if let Err(e) = backend.remove(key) {
                log::warn!("Failed to clear {}: {}", key, e);
            }
        }

        // A pick is kept even when a later run was cancelled; the router
        // has already synced it to the sheet.
        let picked_at = picked.as_ref().map(|p| p.timestamp);
        if let Some(p) = picked {
            self.dispatch(Action::AddColorHistory(p.color));
        }
        if let Some(c) = cancelled.filter(|c| c.cancelled) {
            if picked_at.map_or(true, |at| c.timestamp > at) {
                self.toaster.info("Color picking cancelled");
            }
        }
    }

    /// At most one refresh per popup lifetime.
    fn refresh_if_expired(&self, now_ms: i64) {
        let Some(user) = &self.state().user else {
            return;
        };
        if !user.is_expired_at(now_ms) {
            return;
        }
        log::info!("Access token expired; refreshing");
        let tx = self.token_tx.clone();
        refresh_auth_token(&self.api, user.refresh_credential(), move |token| {
            let _ = tx.send(token);
        });
    }

    /// Apply queued picks and token refreshes. Returns how many updates were
    /// applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;

        let picks: Vec<PopupEvent> = match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        for event in picks {
            match event {
                PopupEvent::ColorPicked { color, .. } => {
                    self.dispatch(Action::AddColorHistory(color));
                    // Seen live; don't replay it on the next start.
                    if let Err(e) = self.store.backend().remove(LAST_PICKED_KEY) {
                        log::warn!("Failed to clear {}: {}", LAST_PICKED_KEY, e);
                    }
                }
            }
            applied += 1;
        }

        let tokens: Vec<TokenRefresh> = self.token_rx.try_iter().collect();
        for token in tokens {
            self.dispatch(Action::UpdateAccessToken {
                access_token: token.access_token,
                expiry: token.expiry,
            });
            if let Some(user) = &self.state().user {
                if let Err(e) = self.auth.save_auth_cookie(user) {
                    log::warn!("Failed to update auth cookie: {}", e);
                }
            }
            applied += 1;
        }

        applied
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn fail<T>(&mut self, err: PopupError) -> Result<T, PopupError> {
        log::debug!("Popup action failed: {}", err);
        self.toaster.error(err.to_string());
        Err(err)
    }

    fn credentials(&self) -> Result<Credentials, PopupError> {
        self.state()
            .user
            .as_ref()
            .map(Credentials::from)
            .ok_or(PopupError::NotSignedIn)
    }

    fn selected(&self) -> Result<(Credentials, DriveFile), PopupError> {
        let creds = self.credentials()?;
        let file = self.state().selected_file.clone().ok_or(PopupError::NoSheetSelected)?;
        Ok((creds, file))
    }

    fn check_file_capacity(&self) -> Result<(), PopupError> {
        if self.state().files.len() >= self.limits.files_max {
            return Err(PopupError::LimitReached { what: "sheets", max: self.limits.files_max });
        }
        Ok(())
    }

    fn remember_selection(&self, file: &DriveFile) {
        if let Err(e) = self.auth.save_file_cookie(file) {
            log::warn!("Failed to remember selected sheet: {}", e);
        }
    }

    /// Run a fallible effect body, turning its error into an error toast.
    fn run<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T, PopupError>) -> Result<T, PopupError> {
        match body(self) {
            Ok(value) => Ok(value),
            Err(e) => self.fail(e),
        }
    }

    // ── Sheets ─────────────────────────────────────────────────────────

    /// Link an existing spreadsheet by its URL. The first linked sheet
    /// becomes the selected one.
    pub fn link_sheet(&mut self, sheet_url: &str) -> Result<DriveFile, PopupError> {
        self.run(|s| {
            let creds = s.credentials()?;
            let url = sheet_url.trim();
            if url.is_empty() {
                return Err(PopupError::Invalid("Enter a sheet URL".into()));
            }
            let existing = s.state().files.len();
            let file = s.api.get_sheet_by_url(&creds, url)?.into_drive_file();
            // Re-linking a known sheet refreshes it and does not count.
            if s.state().file(&file.id).is_none() && existing >= s.limits.files_max {
                return Err(PopupError::LimitReached { what: "sheets", max: s.limits.files_max });
            }

            s.dispatch(Action::AddDriveFile(file.clone()));
            if s.state().selected_file.is_none() {
                s.dispatch(Action::SetSelectedFile(Some(file.clone())));
                s.remember_selection(&file);
            }
            s.toaster.success(format!("Linked \"{}\"", file.file_name));
            Ok(file)
        })
    }

    /// Create a new spreadsheet carrying the drafted columns, link it and
    /// select it.
    pub fn create_sheet(&mut self, file_name: &str, sheet_name: &str) -> Result<DriveFile, PopupError> {
        self.run(|s| {
            let creds = s.credentials()?;
            s.check_file_capacity()?;
            let file_name = file_name.trim();
            if file_name.is_empty() {
                return Err(PopupError::Invalid("Enter a file name".into()));
            }
            let sheet_name = match sheet_name.trim() {
                "" => "Sheet1",
                name => name,
            };

            let req = CreateSheetRequest {
                file_name: file_name.to_string(),
                sheet_name: sheet_name.to_string(),
                additional_columns: s.state().new_columns.clone(),
            };
            let file = s.api.create_sheet(&creds, &req)?.into_drive_file();

            s.dispatch(Action::AddDriveFile(file.clone()));
            s.dispatch(Action::SetSelectedFile(Some(file.clone())));
            s.dispatch(Action::ClearNewColumns);
            s.remember_selection(&file);
            s.toaster.success(format!("Created \"{}\"", file.file_name));
            Ok(file)
        })
    }

    /// Forget a linked sheet locally. The spreadsheet itself is untouched.
    pub fn remove_file(&mut self, id: &str) {
        let name = self.state().file(id).map(|f| f.file_name.clone());
        self.dispatch(Action::RemoveFiles(id.to_string()));
        if let Some(name) = name {
            self.toaster.info(format!("Removed \"{}\"", name));
        }
    }

    /// Select a linked sheet after checking it is still reachable.
    pub fn select_file(&mut self, id: &str) -> Result<(), PopupError> {
        self.run(|s| {
            let creds = s.credentials()?;
            let file = s
                .state()
                .file(id)
                .cloned()
                .ok_or_else(|| PopupError::UnknownFile(id.to_string()))?;
            if !s.api.check_sheet(&creds, &file.id)? {
                return Err(PopupError::SheetUnavailable(file.file_name));
            }
            s.dispatch(Action::SetSelectedFile(Some(file.clone())));
            s.dispatch(Action::SetParsedData(Vec::new()));
            s.remember_selection(&file);
            Ok(())
        })
    }

    // ── Columns ────────────────────────────────────────────────────────

    /// Draft a column for the next `create_sheet`.
    pub fn add_new_column(&mut self, name: &str) -> Result<(), PopupError> {
        self.run(|s| {
            let name = column_name(name)?;
            let drafted = &s.state().new_columns;
            if drafted.len() >= s.limits.columns_max {
                return Err(PopupError::LimitReached { what: "columns", max: s.limits.columns_max });
            }
            let id = next_draft_id(drafted);
            s.dispatch(Action::AddNewColumn(Column::new(id, name)));
            Ok(())
        })
    }

    pub fn remove_new_column(&mut self, id: &str) {
        self.dispatch(Action::RemoveNewColumn(id.to_string()));
    }

    /// Add a column to the selected sheet, remotely and locally.
    pub fn add_file_column(&mut self, name: &str) -> Result<Column, PopupError> {
        self.run(|s| {
            let name = column_name(name)?;
            let (creds, mut file) = s.selected()?;
            if file.additional_columns.len() >= s.limits.columns_max {
                return Err(PopupError::LimitReached { what: "columns", max: s.limits.columns_max });
            }
            let column = s.api.add_column(&creds, &file, name)?;
            file.additional_columns.push(column.clone());
            s.dispatch(Action::UpdateFile(file));
            Ok(column)
        })
    }

    pub fn remove_file_column(&mut self, column_id: &str) -> Result<(), PopupError> {
        self.run(|s| {
            let (creds, mut file) = s.selected()?;
            s.api.remove_column(&creds, &file, column_id)?;
            file.additional_columns.retain(|c| c.id != column_id);
            s.dispatch(Action::UpdateFile(file));
            Ok(())
        })
    }

    /// Edit the pending comment/ranking/column values sent with the next
    /// color.
    pub fn update_selected_file(&mut self, edit: impl FnOnce(&mut DriveFile)) -> Result<(), PopupError> {
        self.run(|s| {
            let mut file = s.state().selected_file.clone().ok_or(PopupError::NoSheetSelected)?;
            edit(&mut file);
            s.dispatch(Action::UpdateFile(file));
            Ok(())
        })
    }

    // ── Rows ───────────────────────────────────────────────────────────

    /// Write `hex` to the selected sheet: rewrite the chosen row in update
    /// mode, otherwise update the color's existing row or append a new one.
    pub fn submit_color(&mut self, hex: &str) -> Result<(), PopupError> {
        self.run(|s| {
            let Some(hex) = normalize_hex(hex) else {
                return Err(PopupError::Invalid(format!("\"{}\" is not a hex color", hex)));
            };
            let (creds, file) = s.selected()?;
            let row = ColorRow::new(&file, &hex, None, now_timestamp());

            let target = match (s.state().submit_mode, s.state().update_row_index) {
                (SubmitMode::Update, Some(index)) => Some(index),
                _ => {
                    let check = s.api.check_add_or_update(&creds, &row)?;
                    if check.exists { check.row_index } else { None }
                }
            };
            match target {
                Some(index) => s.api.update_row(&creds, index, &row)?,
                None => s.api.add_color(&creds, &row)?,
            }

            s.dispatch(Action::AddColorHistory(hex.clone()));
            s.dispatch(Action::SetSubmitMode(SubmitMode::Add));
            s.dispatch(Action::SetUpdateRowIndex(None));
            s.toaster.success(match target {
                Some(_) => format!("Updated {}", hex),
                None => format!("Saved {}", hex),
            });
            Ok(())
        })
    }

    /// Fetch the selected sheet's rows into `parsed_data`.
    pub fn load_rows(&mut self) -> Result<usize, PopupError> {
        self.run(|s| {
            let (creds, file) = s.selected()?;
            let rows = s.api.list_rows(&creds, &file)?;
            let count = rows.len();
            s.dispatch(Action::SetParsedData(rows));
            Ok(count)
        })
    }

    /// Pick a row to overwrite with the next submission.
    pub fn edit_row(&mut self, row_index: u32) {
        self.dispatch(Action::SetUpdateRowIndex(Some(row_index)));
        self.dispatch(Action::SetSubmitMode(SubmitMode::Update));
    }

    // ── Picker / session ───────────────────────────────────────────────

    /// Ask the router to start the in-page picker. Returns once the router
    /// has accepted, before injection; the host closes the popup then.
    pub fn start_color_picker(&mut self, router: &dyn RouterLink) -> Result<(), PopupError> {
        self.run(|_| match router.send(RouterMessage::StartColorPicker) {
            Some(reply) if reply.success => Ok(()),
            Some(reply) => Err(PopupError::Picker(
                reply.error.unwrap_or_else(|| "Color picker unavailable".into()),
            )),
            None => Err(PopupError::Picker("Background service not responding".into())),
        })
    }

    /// Sign out: drop the cookies and the stored state. Color history
    /// survives in the fresh state.
    pub fn logout(&mut self) {
        if let Err(e) = self.auth.erase_all_cookies() {
            log::warn!("Failed to erase cookies: {}", e);
        }
        // Drops the signed-in blob; the dispatch below writes back a
        // signed-out state holding only the history.
        if let Err(e) = clear_stored_state(self.store.backend()) {
            log::warn!("Failed to clear stored state: {}", e);
        }
        self.dispatch(Action::ResetState);
        log::info!("Signed out");
    }
}

fn column_name(name: &str) -> Result<&str, PopupError> {
    match name.trim() {
        "" => Err(PopupError::Invalid("Enter a column name".into())),
        name => Ok(name),
    }
}

/// `new-N`, one past the highest drafted N.
fn next_draft_id(drafted: &[Column]) -> String {
    let highest = drafted
        .iter()
        .filter_map(|c| c.id.strip_prefix("new-")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("new-{}", highest + 1)
}
