//! Wire contract tests against a mock API server.
//!
//! Every authenticated call must carry `Authorization: Bearer <token>` from
//! the credentials passed in; the refresh call must not.

use std::sync::mpsc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use swatchsheet_api::{
    refresh_auth_token, ApiClient, ApiError, ColorRow, CreateSheetRequest, Credentials,
};
use swatchsheet_core::{Column, DriveFile, SheetRef};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(server.base_url(), Duration::from_secs(5)).unwrap()
}

fn file() -> DriveFile {
    DriveFile::new("sp-1", "Palette", SheetRef { id: 9, name: "Colors".into() })
}

#[test]
fn test_add_color_sends_bearer_and_row() {
    let server = MockServer::start();
    let row = ColorRow::new(&file(), "#336699", Some("https://example.com"), "2026-03-01T10:00:00Z".into());

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/sheets/sp-1/rows")
            .header("Authorization", "Bearer tok-1")
            .json_body(serde_json::to_value(&row).unwrap());
        then.status(200).json_body(json!({ "ok": true }));
    });

    client(&server).add_color(&Credentials::new("tok-1"), &row).unwrap();
    mock.assert();
}

#[test]
fn test_credentials_are_per_call() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET).path("/sheets/sp-1/check").header("Authorization", "Bearer one");
        then.status(200).json_body(json!({ "valid": true }));
    });
    let second = server.mock(|when, then| {
        when.method(GET).path("/sheets/sp-1/check").header("Authorization", "Bearer two");
        then.status(200).json_body(json!({ "valid": false }));
    });

    let api = client(&server);
    assert!(api.check_sheet(&Credentials::new("one"), "sp-1").unwrap());
    assert!(!api.check_sheet(&Credentials::new("two"), "sp-1").unwrap());
    first.assert();
    second.assert();
}

#[test]
fn test_get_sheet_by_url() {
    let server = MockServer::start();
    let sheet_url = "https://docs.google.com/spreadsheets/d/sp-1/edit";
    let mock = server.mock(|when, then| {
        when.method(GET).path("/sheets/by-url").query_param("url", sheet_url);
        then.status(200).json_body(json!({
            "spreadsheetId": "sp-1",
            "fileName": "Palette",
            "sheet": { "id": 9, "name": "Colors" },
            "additionalColumns": [{ "id": "c1", "name": "Client" }]
        }));
    });

    let info = client(&server).get_sheet_by_url(&Credentials::new("t"), sheet_url).unwrap();
    mock.assert();
    let file = info.into_drive_file();
    assert_eq!(file.id, "sp-1");
    assert_eq!(file.additional_columns, vec![Column::new("c1", "Client")]);
}

#[test]
fn test_create_sheet() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/sheets").json_body(json!({
            "fileName": "Brand",
            "sheetName": "Colors",
            "additionalColumns": [{ "id": "n1", "name": "Client", "value": "" }]
        }));
        then.status(201).json_body(json!({
            "spreadsheetId": "new-id",
            "fileName": "Brand",
            "sheet": { "id": 0, "name": "Colors" }
        }));
    });

    let req = CreateSheetRequest {
        file_name: "Brand".into(),
        sheet_name: "Colors".into(),
        additional_columns: vec![Column::new("n1", "Client")],
    };
    let info = client(&server).create_sheet(&Credentials::new("t"), &req).unwrap();
    mock.assert();
    assert_eq!(info.spreadsheet_id, "new-id");
}

#[test]
fn test_update_and_check_add_or_update() {
    let server = MockServer::start();
    let row = ColorRow::new(&file(), "#FFFFFF", None, "t".into());

    let check = server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/rows/check");
        then.status(200).json_body(json!({ "exists": true, "rowIndex": 12 }));
    });
    let update = server.mock(|when, then| {
        when.method(PUT).path("/sheets/sp-1/rows/12");
        then.status(200).json_body(json!({}));
    });

    let api = client(&server);
    let creds = Credentials::new("t");
    let answer = api.check_add_or_update(&creds, &row).unwrap();
    assert!(answer.exists);
    api.update_row(&creds, answer.row_index.unwrap(), &row).unwrap();
    check.assert();
    update.assert();
}

#[test]
fn test_columns() {
    let server = MockServer::start();
    let add = server.mock(|when, then| {
        when.method(POST).path("/sheets/sp-1/columns").json_body(json!({
            "sheetId": 9, "sheetName": "Colors", "name": "Project"
        }));
        then.status(200).json_body(json!({ "id": "col-7", "name": "Project" }));
    });
    let remove = server.mock(|when, then| {
        when.method(DELETE).path("/sheets/sp-1/columns/col-7").query_param("sheetName", "Colors");
        then.status(204);
    });

    let api = client(&server);
    let creds = Credentials::new("t");
    let column = api.add_column(&creds, &file(), "Project").unwrap();
    assert_eq!(column, Column::new("col-7", "Project"));
    api.remove_column(&creds, &file(), &column.id).unwrap();
    add.assert();
    remove.assert();
}

#[test]
fn test_list_rows() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/sheets/sp-1/rows").query_param("sheetName", "Colors");
        then.status(200).json_body(json!([
            { "day": "01", "month": "03", "year": "2026", "hex": "#336699", "comments": "hero" },
            { "hex": "#FFFFFF" }
        ]));
    });

    let rows = client(&server).list_rows(&Credentials::new("t"), &file()).unwrap();
    mock.assert();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].comments, "hero");
    assert_eq!(rows[1].day, "");
}

#[test]
fn test_error_mapping() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sheets/bad/check");
        then.status(422).body("sheet is read-only");
    });
    server.mock(|when, then| {
        when.method(GET).path("/sheets/gone/check");
        then.status(404).body("not found");
    });

    let api = client(&server);
    let creds = Credentials::new("t");
    match api.check_sheet(&creds, "bad") {
        Err(ApiError::Validation(msg)) => assert_eq!(msg, "sheet is read-only"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(matches!(api.check_sheet(&creds, "gone"), Err(ApiError::Http(404, _))));
}

#[test]
fn test_network_error() {
    // Nothing listens on port 9 of localhost.
    let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    assert!(matches!(api.check_sheet(&Credentials::new("t"), "x"), Err(ApiError::Network(_))));
}

#[test]
fn test_refresh_invokes_callback_on_success() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "r-1" }));
        then.status(200).json_body(json!({ "accessToken": "fresh", "expiry": 4_102_444_800_000i64 }));
    });

    let (tx, rx) = mpsc::channel();
    refresh_auth_token(&client(&server), "r-1", move |token| {
        tx.send(token).unwrap();
    })
    .join()
    .unwrap();

    let token = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(token.access_token, "fresh");
    mock.assert();
}

#[test]
fn test_refresh_failure_skips_callback() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/auth/refresh");
        then.status(401).body("expired");
    });

    let (tx, rx) = mpsc::channel::<()>();
    refresh_auth_token(&client(&server), "r-1", move |_| {
        tx.send(()).unwrap();
    })
    .join()
    .unwrap();

    // Sender dropped without sending.
    assert!(rx.recv().is_err());
    mock.assert_calls(1);
}
