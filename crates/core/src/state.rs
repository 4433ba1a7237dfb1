//! Application state reducer.
//!
//! `reduce` never mutates its input: it clones the current state, applies
//! the action to the copy and returns it. Capacity limits (files, columns)
//! are enforced by the callers before dispatching.

use crate::model::{AuthUser, Column, DriveFile, GlobalState, RowData, SubmitMode};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetUser(Option<AuthUser>),
    /// Ignored while signed out.
    UpdateAccessToken { access_token: String, expiry: i64 },
    SetColor(String),
    AddColorHistory(String),
    RemoveColorHistory(String),
    ClearColorHistory,
    SetHistoryMax(usize),
    AddNewColumn(Column),
    RemoveNewColumn(String),
    ClearNewColumns,
    AddDriveFile(DriveFile),
    /// Remove the file with this spreadsheet id.
    RemoveFiles(String),
    UpdateFile(DriveFile),
    SetSelectedFile(Option<DriveFile>),
    SetParsedData(Vec<RowData>),
    SetSelectedTab(usize),
    SetSubmitMode(SubmitMode),
    SetUpdateRowIndex(Option<u32>),
    ResetState,
}

pub fn reduce(state: &GlobalState, action: Action) -> GlobalState {
    let mut next = state.clone();

    match action {
        Action::SetUser(user) => next.user = user,
        Action::UpdateAccessToken { access_token, expiry } => {
            if let Some(user) = next.user.as_mut() {
                user.access_token = access_token;
                user.expiry = expiry;
            }
        }
        Action::SetColor(color) => next.color = color,
        Action::AddColorHistory(hex) => {
            if let Some(hex) = next.color_history.push(&hex) {
                next.color = hex;
            }
        }
        Action::RemoveColorHistory(hex) => next.color_history.remove(&hex),
        Action::ClearColorHistory => next.color_history.clear(),
        Action::SetHistoryMax(max) => next.color_history.set_max(max),
        Action::AddNewColumn(column) => next.new_columns.push(column),
        Action::RemoveNewColumn(id) => next.new_columns.retain(|c| c.id != id),
        Action::ClearNewColumns => next.new_columns.clear(),
        Action::AddDriveFile(file) => match next.files.iter_mut().find(|f| f.id == file.id) {
            Some(existing) => *existing = file,
            None => next.files.push(file),
        },
        Action::RemoveFiles(id) => {
            next.files.retain(|f| f.id != id);
            if next.selected_file.as_ref().is_some_and(|f| f.id == id) {
                next.selected_file = None;
            }
        }
        Action::UpdateFile(file) => {
            if let Some(existing) = next.files.iter_mut().find(|f| f.id == file.id) {
                *existing = file.clone();
            }
            if next.selected_file.as_ref().is_some_and(|f| f.id == file.id) {
                next.selected_file = Some(file);
            }
        }
        Action::SetSelectedFile(file) => next.selected_file = file,
        Action::SetParsedData(rows) => next.parsed_data = rows,
        Action::SetSelectedTab(tab) => next.selected_tab = tab,
        Action::SetSubmitMode(mode) => next.submit_mode = mode,
        Action::SetUpdateRowIndex(row) => next.update_row_index = row,
        Action::ResetState => {
            // Color and history survive a sign-out.
            next = GlobalState {
                color: next.color,
                color_history: next.color_history,
                ..GlobalState::default()
            };
        }
    }

    next
}
