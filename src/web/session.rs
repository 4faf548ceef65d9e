//! Cookie session for the browsable pages

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    api::{CSRF_COOKIE, SESSION_COOKIE},
    models::UserClaims,
    AppState,
};

use super::client::ForwardedSession;

pub const SIGNIN_PATH: &str = "/signin";

/// Signed-in page visitor. Anonymous visitors are redirected to the sign-in page.
pub struct WebSession {
    pub claims: UserClaims,
    pub forwarded: ForwardedSession,
}

#[async_trait]
impl FromRequestParts<AppState> for WebSession {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let session_id = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| Redirect::to(SIGNIN_PATH))?;

        let claims = state
            .services
            .users
            .verify_token(&session_id)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session cookie");
                Redirect::to(SIGNIN_PATH)
            })?;

        Ok(WebSession {
            claims,
            forwarded: ForwardedSession {
                session_id,
                csrf_token: jar.get(CSRF_COOKIE).map(|c| c.value().to_string()),
            },
        })
    }
}

/// Set the session and a fresh CSRF cookie
pub fn start(jar: CookieJar, token: String, secure: bool) -> CookieJar {
    let csrf = uuid::Uuid::new_v4().simple().to_string();

    jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax),
    )
    .add(
        Cookie::build((CSRF_COOKIE, csrf))
            .path("/")
            .secure(secure)
            .same_site(SameSite::Lax),
    )
}

pub fn end(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
        .remove(Cookie::build((CSRF_COOKIE, "")).path("/"))
}

pub fn has_session_cookie(jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE).is_some()
}
