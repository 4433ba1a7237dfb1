//! Spreadsheet API client, shared by the background router, the popup and
//! the CLI.
//!
//! This crate is the single source of truth for the remote wire contract
//! (sheets, rows, columns, token refresh) and for where the signed-in user
//! is kept (the auth cookie).
//!
//! No retries. Best-effort calls log and drop their failures.

mod auth;
mod client;

pub use auth::{
    refresh_auth_token, AuthError, AuthSession, Cookie, CookieJar, CookieStore, DocumentCookies,
    MemoryCookieJar, FILE_COOKIE_MAX_AGE_DAYS,
};
pub use client::{
    now_timestamp, AddOrUpdate, ApiClient, ApiError, ColorRow, CreateSheetRequest, Credentials,
    SheetInfo, TokenRefresh,
};
