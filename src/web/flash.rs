//! One-shot user messages carried across redirects in a cookie

use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::client::ApiResponse;

pub const FLASH_COOKIE: &str = "messages";

/// Oldest messages are dropped past this many, keeping the cookie small
pub const MAX_QUEUED: usize = 10;

const UNEXPECTED_ERROR: &str = "Unexpected error occurred.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

fn encode(flashes: &[Flash]) -> String {
    let json = serde_json::to_vec(flashes).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode(value: &str) -> Vec<Flash> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Queue a message for the next rendered page
pub fn push(jar: CookieJar, flash: Flash) -> CookieJar {
    let mut flashes = jar
        .get(FLASH_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default();
    flashes.push(flash);
    if flashes.len() > MAX_QUEUED {
        flashes.drain(..flashes.len() - MAX_QUEUED);
    }

    jar.add(
        Cookie::build((FLASH_COOKIE, encode(&flashes)))
            .path("/")
            .http_only(true),
    )
}

/// Drain queued messages
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    match jar.get(FLASH_COOKIE).map(|c| decode(c.value())) {
        Some(flashes) => (jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/")), flashes),
        None => (jar, Vec::new()),
    }
}

/// Translate an API answer into the message shown to the user.
///
/// The expected status yields `success`; otherwise an `{"error": ..}` body is
/// surfaced as a warning and an unreadable body as a generic warning.
pub fn from_response(response: &ApiResponse, expected: StatusCode, success: &str) -> Option<Flash> {
    if response.status == expected {
        return Some(Flash::success(success));
    }

    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Err(_) => Some(Flash::warning(UNEXPECTED_ERROR)),
        Ok(body) => body
            .get("error")
            .and_then(|e| e.as_str())
            .map(Flash::warning),
    }
}

/// Delete answers are reported by status alone
pub fn from_delete_response(response: &ApiResponse) -> Flash {
    match response.status {
        StatusCode::NO_CONTENT => Flash::success("Book deleted successfully."),
        StatusCode::NOT_FOUND => Flash::error("Book not found."),
        status => Flash::error(format!(
            "Unexpected response: {} - {}",
            status.as_u16(),
            response.text()
        )),
    }
}

pub fn from_transport_error(error: &reqwest::Error) -> Flash {
    Flash::error(format!("Request failed: {}", error))
}
