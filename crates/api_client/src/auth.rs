//! Auth session: the signed-in user lives in a cookie.
//!
//! Two environments are supported. In the extension the platform cookie
//! store is available and cookies are read/removed by name. Elsewhere we
//! fall back to the document's own `Cookie` header, where deletion means
//! expiring every visible cookie.
//!
//! Cookie values are URL-encoded JSON.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use swatchsheet_core::{AuthUser, DriveFile};

use crate::client::{ApiClient, TokenRefresh};

/// The file-selection cookie outlives the popup by this many days.
pub const FILE_COOKIE_MAX_AGE_DAYS: i64 = 30;

// Same set `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Cookie value is not valid percent-encoded UTF-8
    Decode(String),
    /// Cookie value decoded but is not the expected JSON
    Parse(String),
    /// The cookie store refused the operation
    Store(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Decode(msg) => write!(f, "Cookie decode error: {}", msg),
            AuthError::Parse(msg) => write!(f, "Cookie parse error: {}", msg),
            AuthError::Store(msg) => write!(f, "Cookie store error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// Raw (encoded) value.
    pub value: String,
    /// Epoch seconds; `None` is a session cookie.
    pub expires: Option<i64>,
}

/// Platform cookie API.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, cookie: Cookie) -> Result<(), AuthError>;
    fn remove(&self, name: &str) -> Result<(), AuthError>;
}

/// In-process cookie store; expired cookies are invisible.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let now = chrono::Utc::now().timestamp();
        let cookies = self.cookies.lock().ok()?;
        cookies
            .iter()
            .find(|c| c.name == name && is_live(c, now))
            .map(|c| c.value.clone())
    }

    fn set(&self, cookie: Cookie) -> Result<(), AuthError> {
        let mut cookies = self.cookies.lock().map_err(|e| AuthError::Store(e.to_string()))?;
        cookies.retain(|c| c.name != cookie.name);
        cookies.push(cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), AuthError> {
        let mut cookies = self.cookies.lock().map_err(|e| AuthError::Store(e.to_string()))?;
        cookies.retain(|c| c.name != name);
        Ok(())
    }
}

/// The document's `Cookie` header, for hosts without a cookie API.
/// Cookies written with an expiry drop out of the header once it passes.
#[derive(Default)]
pub struct DocumentCookies {
    cookies: Mutex<Vec<Cookie>>,
}

fn is_live(cookie: &Cookie, now: i64) -> bool {
    cookie.expires.map_or(true, |e| e > now)
}

impl DocumentCookies {
    /// Parse a `name=value; other=value` header.
    pub fn from_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|part| {
                let (name, value) = part.trim().split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| Cookie {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                    expires: None,
                })
            })
            .collect();
        Self { cookies: Mutex::new(cookies) }
    }

    /// Current header, as `document.cookie` would return it.
    pub fn header(&self) -> String {
        let now = chrono::Utc::now().timestamp();
        match self.cookies.lock() {
            Ok(cookies) => cookies
                .iter()
                .filter(|c| is_live(c, now))
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
            Err(_) => String::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let now = chrono::Utc::now().timestamp();
        let cookies = self.cookies.lock().ok()?;
        cookies
            .iter()
            .find(|c| c.name == name && is_live(c, now))
            .map(|c| c.value.clone())
    }

    /// `expires` is epoch seconds; `None` is a session cookie.
    pub fn set(&self, name: &str, value: &str, expires: Option<i64>) {
        if let Ok(mut cookies) = self.cookies.lock() {
            cookies.retain(|c| c.name != name);
            cookies.push(Cookie { name: name.to_string(), value: value.to_string(), expires });
        }
    }

    /// Expire every cookie visible to the document.
    pub fn expire_all(&self) {
        if let Ok(mut cookies) = self.cookies.lock() {
            for cookie in cookies.drain(..) {
                log::debug!("Expiring document cookie {}", cookie.name);
            }
        }
    }
}

/// Where cookies are read from and written to.
#[derive(Clone)]
pub enum CookieJar {
    Platform(Arc<dyn CookieStore>),
    Document(Arc<DocumentCookies>),
}

/// Resolves the current user and the remembered file selection from cookies.
#[derive(Clone)]
pub struct AuthSession {
    jar: CookieJar,
    auth_cookie: String,
    file_cookie: String,
}

impl AuthSession {
    pub fn new(jar: CookieJar, auth_cookie: impl Into<String>, file_cookie: impl Into<String>) -> Self {
        Self {
            jar,
            auth_cookie: auth_cookie.into(),
            file_cookie: file_cookie.into(),
        }
    }

    /// The signed-in user, if the auth cookie is present. A cookie that
    /// does not decode is an error, not a signed-out user.
    pub fn get_auth_cookie(&self) -> Result<Option<AuthUser>, AuthError> {
        self.read_json(&self.auth_cookie)
    }

    pub fn save_auth_cookie(&self, user: &AuthUser) -> Result<(), AuthError> {
        self.write_json(&self.auth_cookie, user, None)
    }

    pub fn load_file_cookie(&self) -> Result<Option<DriveFile>, AuthError> {
        self.read_json(&self.file_cookie)
    }

    /// Remember the selected file for [`FILE_COOKIE_MAX_AGE_DAYS`].
    pub fn save_file_cookie(&self, file: &DriveFile) -> Result<(), AuthError> {
        let expires = chrono::Utc::now() + chrono::Duration::days(FILE_COOKIE_MAX_AGE_DAYS);
        self.write_json(&self.file_cookie, file, Some(expires.timestamp()))
    }

    /// Sign-out: drop our cookies (platform) or every cookie (document).
    pub fn erase_all_cookies(&self) -> Result<(), AuthError> {
        match &self.jar {
            CookieJar::Platform(store) => {
                store.remove(&self.auth_cookie)?;
                store.remove(&self.file_cookie)
            }
            CookieJar::Document(doc) => {
                doc.expire_all();
                Ok(())
            }
        }
    }

    fn raw(&self, name: &str) -> Option<String> {
        match &self.jar {
            CookieJar::Platform(store) => store.get(name),
            CookieJar::Document(doc) => doc.get(name),
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AuthError> {
        let Some(raw) = self.raw(name) else {
            return Ok(None);
        };
        let decoded = percent_decode_str(&raw)
            .decode_utf8()
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        serde_json::from_str(&decoded)
            .map(Some)
            .map_err(|e| AuthError::Parse(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(&self, name: &str, value: &T, expires: Option<i64>) -> Result<(), AuthError> {
        let json = serde_json::to_string(value).map_err(|e| AuthError::Parse(e.to_string()))?;
        let encoded = utf8_percent_encode(&json, COMPONENT).to_string();
        match &self.jar {
            CookieJar::Platform(store) => store.set(Cookie {
                name: name.to_string(),
                value: encoded,
                expires,
            }),
            CookieJar::Document(doc) => {
                doc.set(name, &encoded, expires);
                Ok(())
            }
        }
    }
}

/// Best-effort token refresh on a detached thread.
///
/// `on_success` runs on that thread with the new token. Any failure is
/// logged and dropped: no retry, no callback. Callers normally discard the
/// returned handle.
pub fn refresh_auth_token<F>(client: &ApiClient, refresh_token: &str, on_success: F) -> JoinHandle<()>
where
    F: FnOnce(TokenRefresh) + Send + 'static,
{
    let client = client.clone();
    let refresh_token = refresh_token.to_string();
    thread::spawn(move || match client.refresh_token(&refresh_token) {
        Ok(token) => {
            log::debug!("Access token refreshed (expires {})", token.expiry);
            on_success(token);
        }
        Err(e) => log::warn!("Token refresh failed: {}", e),
    })
}
