//! Popup session against a mock API, in-memory cookies and storage, and a
//! real in-process background router.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use serde_json::json;
use swatchsheet_api::{ApiClient, AuthSession, CookieJar, CookieStore, MemoryCookieJar};
use swatchsheet_config::{
    fetch_state, load_last_picked, FileStore, KeyValueStore, MemoryStore, Settings, STATE_KEY,
};
use swatchsheet_core::{AuthUser, Column, DriveFile, SheetRef, SubmitMode, ToastKind};
use swatchsheet_popup::{PopupError, PopupSession};
use swatchsheet_protocol::{RouterLink, RouterMessage, POPUP_CHANNEL};
use swatchsheet_router::{popup_channel, BackgroundRouter, BrowserPlatform, RouterConfig, Tab};

const FAR_FUTURE: i64 = 4_102_444_800_000;

struct Harness {
    server: MockServer,
    settings: Settings,
    backend: Arc<MemoryStore>,
    jar: Arc<MemoryCookieJar>,
}

impl Harness {
    fn new() -> Self {
        let server = MockServer::start();
        let settings = Settings {
            api_base_url: server.base_url(),
            toast_timeout_ms: 60_000,
            ..Settings::default()
        };
        Self {
            server,
            settings,
            backend: Arc::new(MemoryStore::new()),
            jar: Arc::new(MemoryCookieJar::new()),
        }
    }

    fn auth(&self) -> AuthSession {
        AuthSession::new(
            CookieJar::Platform(self.jar.clone()),
            self.settings.auth_cookie_name.clone(),
            self.settings.file_cookie_name.clone(),
        )
    }

    fn api(&self) -> ApiClient {
        ApiClient::new(self.settings.api_base_url.clone(), Duration::from_secs(5)).unwrap()
    }

    fn start(&self) -> PopupSession {
        PopupSession::start(&self.settings, self.backend.clone(), self.api(), self.auth(), None)
    }

    /// Session with a valid user already signed in.
    fn signed_in(&self) -> PopupSession {
        self.auth().save_auth_cookie(&AuthUser::new("tok", FAR_FUTURE)).unwrap();
        self.start()
    }

    fn mock_sheet(&self, id: &str, name: &str) {
        let url = format!("https://docs.google.com/spreadsheets/d/{}/edit", id);
        let (id, name) = (id.to_string(), name.to_string());
        self.server.mock(move |when, then| {
            when.method(GET).path("/sheets/by-url").query_param("url", url.as_str());
            then.status(200).json_body(json!({
                "spreadsheetId": id,
                "fileName": name,
                "sheet": { "id": 0, "name": "Colors" }
            }));
        });
    }
}

fn sheet_url(id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}/edit", id)
}

fn selected(session: &mut PopupSession, h: &Harness) {
    h.mock_sheet("sp-1", "Palette");
    session.link_sheet(&sheet_url("sp-1")).unwrap();
}

// ── Startup ─────────────────────────────────────────────────────────

#[test]
fn test_startup_adopts_cookie_user() {
    let h = Harness::new();
    let session = h.signed_in();
    assert_eq!(session.state().user.as_ref().unwrap().access_token, "tok");
    // and persisted
    assert!(fetch_state(h.backend.as_ref()).unwrap().user.is_some());
}

#[test]
fn test_startup_ignores_broken_cookie() {
    let h = Harness::new();
    h.jar
        .set(swatchsheet_api::Cookie {
            name: h.settings.auth_cookie_name.clone(),
            value: "%7Bnot-json".into(),
            expires: None,
        })
        .unwrap();
    let session = h.start();
    assert!(session.state().user.is_none());
}

#[test]
fn test_expired_token_refreshed_once() {
    let h = Harness::new();
    let mock = h.server.mock(|when, then| {
        when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "r-1" }));
        then.status(200).json_body(json!({ "accessToken": "fresh", "expiry": FAR_FUTURE }));
    });
    let mut user = AuthUser::new("stale", 1_000);
    user.refresh_token = Some("r-1".into());
    h.auth().save_auth_cookie(&user).unwrap();

    let mut session = h.start();
    let start = Instant::now();
    while session.pump() == 0 && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(10));
    }

    let user = session.state().user.clone().unwrap();
    assert_eq!(user.access_token, "fresh");
    assert_eq!(user.expiry, FAR_FUTURE);
    assert_eq!(user.refresh_token.as_deref(), Some("r-1"));
    // cookie follows the new token
    assert_eq!(h.auth().get_auth_cookie().unwrap().unwrap().access_token, "fresh");
    mock.assert_calls(1);
}

#[test]
fn test_valid_token_not_refreshed() {
    let h = Harness::new();
    let mock = h.server.mock(|when, then| {
        when.method(POST).path("/auth/refresh");
        then.status(200);
    });
    let _session = h.signed_in();
    thread::sleep(Duration::from_millis(100));
    mock.assert_calls(0);
}

#[test]
fn test_corrupt_stored_state_starts_fresh() {
    let h = Harness::new();
    h.backend.set(STATE_KEY, "][".into()).unwrap();
    let session = h.start();
    assert!(session.state().files.is_empty());
    assert_eq!(session.state().color_history.max, h.settings.history_max);
}

// ── Sheets ──────────────────────────────────────────────────────────

#[test]
fn test_link_sheet_selects_first() {
    let h = Harness::new();
    let mut session = h.signed_in();
    h.mock_sheet("sp-1", "Palette");
    h.mock_sheet("sp-2", "Brand");

    session.link_sheet(&sheet_url("sp-1")).unwrap();
    session.link_sheet(&sheet_url("sp-2")).unwrap();

    let state = session.state();
    assert_eq!(state.files.len(), 2);
    assert_eq!(state.selected_file.as_ref().unwrap().id, "sp-1");
    assert_eq!(session.toast().kind, Some(ToastKind::Success));
    assert_eq!(h.auth().load_file_cookie().unwrap().unwrap().id, "sp-1");
}

#[test]
fn test_link_sheet_respects_file_limit() {
    let mut h = Harness::new();
    h.settings.files_max = 1;
    let mut session = h.signed_in();
    h.mock_sheet("sp-1", "Palette");
    h.mock_sheet("sp-2", "Brand");

    session.link_sheet(&sheet_url("sp-1")).unwrap();
    // same sheet again is a refresh, not a new file
    session.link_sheet(&sheet_url("sp-1")).unwrap();

    let err = session.link_sheet(&sheet_url("sp-2")).unwrap_err();
    assert!(matches!(err, PopupError::LimitReached { max: 1, .. }));
    assert_eq!(session.state().files.len(), 1);
    let toast = session.toast();
    assert_eq!(toast.kind, Some(ToastKind::Error));
    assert_eq!(toast.message.unwrap(), "You can have at most 1 sheets");
}

#[test]
fn test_effects_require_sign_in() {
    // No mocks: any request would come back as a 404 instead.
    let h = Harness::new();
    let mut session = h.start();

    assert!(matches!(session.link_sheet("https://x"), Err(PopupError::NotSignedIn)));
    assert!(matches!(session.submit_color("#FFFFFF"), Err(PopupError::NotSignedIn)));
    assert_eq!(session.toast().message.unwrap(), "Please sign in first");
}

#[test]
fn test_create_sheet_with_drafted_columns() {
    let h = Harness::new();
    let mut session = h.signed_in();
    let create = h.server.mock(|when, then| {
        when.method(POST).path("/sheets").json_body(json!({
            "fileName": "Brand",
            "sheetName": "Sheet1",
            "additionalColumns": [
                { "id": "new-1", "name": "Client", "value": "" },
                { "id": "new-2", "name": "Project", "value": "" }
            ]
        }));
        then.status(201).json_body(json!({
            "spreadsheetId": "sp-new",
            "fileName": "Brand",
            "sheet": { "id": 0, "name": "Sheet1" },
            "additionalColumns": [
                { "id": "c1", "name": "Client" },
                { "id": "c2", "name": "Project" }
            ]
        }));
    });

    session.add_new_column("Client").unwrap();
    session.add_new_column(" Project ").unwrap();
    let file = session.create_sheet("  Brand ", "").unwrap();

    create.assert();
    assert_eq!(file.id, "sp-new");
    let state = session.state();
    assert!(state.new_columns.is_empty());
    assert_eq!(state.selected_file.as_ref().unwrap().additional_columns.len(), 2);
}

#[test]
fn test_drafted_column_limit() {
    let mut h = Harness::new();
    h.settings.columns_max = 2;
    let mut session = h.signed_in();
    session.add_new_column("a").unwrap();
    session.add_new_column("b").unwrap();
    assert!(matches!(session.add_new_column("c"), Err(PopupError::LimitReached { max: 2, .. })));
    assert!(matches!(session.add_new_column("  "), Err(PopupError::Invalid(_))));

    session.remove_new_column("new-1");
    session.add_new_column("c").unwrap();
    let ids: Vec<_> = session.state().new_columns.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["new-2", "new-3"]);
}

#[test]
fn test_select_file_checks_validity() {
    let h = Harness::new();
    let mut session = h.signed_in();
    h.mock_sheet("sp-1", "Palette");
    h.mock_sheet("sp-2", "Brand");
    session.link_sheet(&sheet_url("sp-1")).unwrap();
    session.link_sheet(&sheet_url("sp-2")).unwrap();

    h.server.mock(|when, then| {
        when.method(GET).path("/sheets/sp-2/check").header("Authorization", "Bearer tok");
        then.status(200).json_body(json!({ "valid": false }));
    });
    assert!(matches!(session.select_file("sp-2"), Err(PopupError::SheetUnavailable(_))));
    assert_eq!(session.state().selected_file.as_ref().unwrap().id, "sp-1");
    assert!(matches!(session.select_file("nope"), Err(PopupError::UnknownFile(_))));
}

#[test]
fn test_remove_selected_file_clears_selection() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    session.remove_file("sp-1");
    assert!(session.state().files.is_empty());
    assert!(session.state().selected_file.is_none());
}

#[test]
fn test_file_columns_roundtrip() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    let add = h.server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/columns");
        then.status(200).json_body(json!({ "id": "col-9", "name": "Mood" }));
    });
    let remove = h.server.mock(|when, then| {
        when.method(DELETE).path("/sheets/sp-1/columns/col-9");
        then.status(204);
    });

    let column = session.add_file_column("Mood").unwrap();
    assert_eq!(column, Column::new("col-9", "Mood"));
    assert_eq!(session.state().files[0].additional_columns, vec![column]);

    session.remove_file_column("col-9").unwrap();
    assert!(session.state().selected_file.as_ref().unwrap().additional_columns.is_empty());
    add.assert();
    remove.assert();
}

// ── Rows ────────────────────────────────────────────────────────────

#[test]
fn test_submit_appends_new_color() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    session
        .update_selected_file(|f| {
            f.comment = "hero".into();
            f.ranking = 5;
        })
        .unwrap();

    let check = h.server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/rows/check");
        then.status(200).json_body(json!({ "exists": false }));
    });
    let add = h.server.mock(|when, then| {
        when.method(POST)
            .path("/sheets/sp-1/rows")
            .header("Authorization", "Bearer tok")
            .body_includes(r#""comments":"hero""#)
            .body_includes(r#""ranking":5"#);
        then.status(200);
    });

    session.submit_color("336699").unwrap();
    check.assert();
    add.assert();
    assert_eq!(session.state().color_history.recent, vec!["#336699"]);
    assert_eq!(session.toast().message.unwrap(), "Saved #336699");
}

#[test]
fn test_submit_updates_existing_color_row() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    h.server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/rows/check");
        then.status(200).json_body(json!({ "exists": true, "rowIndex": 4 }));
    });
    let put = h.server.mock(|when, then| {
        when.method(PUT).path("/sheets/sp-1/rows/4");
        then.status(200);
    });

    session.submit_color("#FFFFFF").unwrap();
    put.assert();
}

#[test]
fn test_update_mode_rewrites_chosen_row() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    let check = h.server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/rows/check");
        then.status(200).json_body(json!({ "exists": false }));
    });
    let put = h.server.mock(|when, then| {
        when.method(PUT).path("/sheets/sp-1/rows/11");
        then.status(200);
    });

    session.edit_row(11);
    assert_eq!(session.state().submit_mode, SubmitMode::Update);
    session.submit_color("#000000").unwrap();

    put.assert();
    check.assert_calls(0);
    assert_eq!(session.state().submit_mode, SubmitMode::Add);
    assert_eq!(session.state().update_row_index, None);
}

#[test]
fn test_submit_rejects_bad_hex_and_server_errors() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    assert!(matches!(session.submit_color("#12"), Err(PopupError::Invalid(_))));

    h.server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/rows/check");
        then.status(422).body("Sheet is protected");
    });
    let err = session.submit_color("#FF0000").unwrap_err();
    assert_eq!(err.to_string(), "Sheet is protected");
    assert_eq!(session.toast().kind, Some(ToastKind::Error));
    assert!(session.state().color_history.recent.is_empty());
}

#[test]
fn test_load_rows() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    h.server.mock(|when, then| {
        when.method(GET).path("/sheets/sp-1/rows").query_param("sheetName", "Colors");
        then.status(200).json_body(json!([{ "hex": "#111111" }, { "hex": "#222222" }]));
    });

    assert_eq!(session.load_rows().unwrap(), 2);
    assert_eq!(session.state().parsed_data[1].hex, "#222222");
}

#[test]
fn test_logout_keeps_history_only() {
    let h = Harness::new();
    let mut session = h.signed_in();
    selected(&mut session, &h);
    session.dispatch(swatchsheet_core::Action::AddColorHistory("#ABCDEF".into()));

    session.logout();

    let state = session.state();
    assert!(state.user.is_none());
    assert!(state.files.is_empty());
    assert!(state.selected_file.is_none());
    assert_eq!(state.color_history.recent, vec!["#ABCDEF"]);
    assert_eq!(h.auth().get_auth_cookie().unwrap(), None);
    assert_eq!(h.auth().load_file_cookie().unwrap(), None);

    // a fresh popup stays signed out
    let reopened = h.start();
    assert!(reopened.state().user.is_none());
    assert_eq!(reopened.state().color_history.recent, vec!["#ABCDEF"]);
}

// ── Router interplay ────────────────────────────────────────────────

struct Page(&'static str);

impl BrowserPlatform for Page {
    fn active_tab(&self) -> Option<Tab> {
        Some(Tab { id: 1, url: self.0.to_string() })
    }
    fn capture_visible_tab(&self) -> Result<String, String> {
        Err("unsupported".into())
    }
    fn inject_picker(&self, _tab_id: u32) -> Result<(), String> {
        Ok(())
    }
    fn open_popup(&self) -> Result<(), String> {
        Ok(())
    }
}

fn router(page: &'static str, backend: Arc<MemoryStore>) -> BackgroundRouter {
    let config = RouterConfig { inject_delay: Duration::ZERO, ..RouterConfig::default() };
    BackgroundRouter::new(Arc::new(Page(page)), backend, None, config)
}

#[test]
fn test_start_color_picker() {
    let h = Harness::new();
    let mut session = h.start();

    session.start_color_picker(&router("https://example.com", h.backend.clone())).unwrap();

    let err = session
        .start_color_picker(&router("chrome://extensions", h.backend.clone()))
        .unwrap_err();
    assert!(matches!(err, PopupError::Picker(_)));
    assert_eq!(session.toast().kind, Some(ToastKind::Error));
}

#[test]
fn test_live_pick_reaches_history() {
    let h = Harness::new();
    let router = router("https://example.com", h.backend.clone());
    let (port, events) = popup_channel();
    router.connect(POPUP_CHANNEL, Arc::new(port));
    let mut session =
        PopupSession::start(&h.settings, h.backend.clone(), h.api(), h.auth(), Some(events));

    router.send(RouterMessage::ColorPicked { color: "#00ff00".into(), url: None });
    assert_eq!(session.pump(), 1);
    assert_eq!(session.state().color, "#00FF00");
    assert_eq!(session.state().color_history.recent, vec!["#00FF00"]);
    assert!(load_last_picked(h.backend.as_ref()).is_none());
}

#[test]
fn test_pick_while_closed_collected_on_start() {
    let h = Harness::new();
    let router = router("https://example.com", h.backend.clone());
    router.send(RouterMessage::ColorPicked { color: "#0000FF".into(), url: None });
    assert!(load_last_picked(h.backend.as_ref()).is_some());

    let session = h.start();
    assert_eq!(session.state().color_history.recent, vec!["#0000FF"]);
    assert!(load_last_picked(h.backend.as_ref()).is_none());

    // not replayed
    drop(session);
    let again = h.start();
    assert_eq!(again.state().color_history.recent, vec!["#0000FF"]);
}

#[test]
fn test_cancel_while_closed_shows_info() {
    let h = Harness::new();
    let router = router("https://example.com", h.backend.clone());
    router.send(RouterMessage::ColorPickerCancelled);

    let session = h.start();
    let toast = session.toast();
    assert_eq!(toast.kind, Some(ToastKind::Info));
    assert!(session.state().color_history.recent.is_empty());
}

#[test]
fn test_pick_then_cancel_while_closed_keeps_color() {
    let h = Harness::new();
    let router = router("https://example.com", h.backend.clone());
    router.send(RouterMessage::ColorPicked { color: "#0000FF".into(), url: None });
    thread::sleep(Duration::from_millis(5));
    router.send(RouterMessage::ColorPickerCancelled);

    let session = h.start();
    assert_eq!(session.state().color_history.recent, vec!["#0000FF"]);
    assert_eq!(session.toast().kind, Some(ToastKind::Info));
    assert!(load_last_picked(h.backend.as_ref()).is_none());
}

#[test]
fn test_file_backed_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new();
    let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().join("storage.json")));

    let mut session = PopupSession::start(&h.settings, backend.clone(), h.api(), h.auth(), None);
    session.dispatch(swatchsheet_core::Action::AddColorHistory("#101010".into()));
    session.dispatch(swatchsheet_core::Action::AddDriveFile(DriveFile::new(
        "sp-x",
        "X",
        SheetRef { id: 1, name: "S".into() },
    )));
    drop(session);

    let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().join("storage.json")));
    let session = PopupSession::start(&h.settings, backend, h.api(), h.auth(), None);
    assert_eq!(session.state().color_history.recent, vec!["#101010"]);
    assert_eq!(session.state().files[0].id, "sp-x");
}
