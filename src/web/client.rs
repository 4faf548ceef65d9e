//! HTTP client the browsable pages use to reach the REST API.
//!
//! Every call forwards the caller's session and CSRF cookies, so the API
//! sees the same user the page was requested by.

use reqwest::{
    header::{COOKIE, REFERER},
    Method, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::{
    api::{CSRF_COOKIE, CSRF_HEADER, SESSION_COOKIE},
    models::{BookInput, BookPatch},
};

/// Cookies lifted from the incoming page request
#[derive(Debug, Clone)]
pub struct ForwardedSession {
    pub session_id: String,
    pub csrf_token: Option<String>,
}

/// Raw API answer; the pages decide how to read it
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, session: &ForwardedSession) -> RequestBuilder {
        let mut cookies = format!("{}={}", SESSION_COOKIE, session.session_id);
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(REFERER, &self.base_url);

        if let Some(ref csrf) = session.csrf_token {
            cookies.push_str(&format!("; {}={}", CSRF_COOKIE, csrf));
            builder = builder.header(CSRF_HEADER, csrf);
        }

        builder.header(COOKIE, cookies)
    }

    async fn send(builder: RequestBuilder) -> Result<ApiResponse, reqwest::Error> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(status = %status, "API call completed");
        Ok(ApiResponse { status, body })
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        session: &ForwardedSession,
        payload: &T,
    ) -> Result<ApiResponse, reqwest::Error> {
        Self::send(self.request(method, path, session).json(payload)).await
    }

    pub async fn list_books(&self, session: &ForwardedSession) -> Result<ApiResponse, reqwest::Error> {
        Self::send(self.request(Method::GET, "/books", session)).await
    }

    pub async fn get_book(
        &self,
        session: &ForwardedSession,
        book_id: i32,
    ) -> Result<ApiResponse, reqwest::Error> {
        Self::send(self.request(Method::GET, &format!("/books/{}", book_id), session)).await
    }

    pub async fn create_book(
        &self,
        session: &ForwardedSession,
        book: &BookInput,
    ) -> Result<ApiResponse, reqwest::Error> {
        self.send_json(Method::POST, "/books", session, book).await
    }

    pub async fn patch_book(
        &self,
        session: &ForwardedSession,
        book_id: i32,
        patch: &BookPatch,
    ) -> Result<ApiResponse, reqwest::Error> {
        self.send_json(Method::PATCH, &format!("/books/{}", book_id), session, patch)
            .await
    }

    pub async fn delete_book(
        &self,
        session: &ForwardedSession,
        book_id: i32,
    ) -> Result<ApiResponse, reqwest::Error> {
        Self::send(self.request(Method::DELETE, &format!("/books/{}", book_id), session)).await
    }

    pub async fn list_loans(&self, session: &ForwardedSession) -> Result<ApiResponse, reqwest::Error> {
        Self::send(self.request(Method::GET, "/loans", session)).await
    }

    pub async fn create_loan(
        &self,
        session: &ForwardedSession,
        book_id: i32,
    ) -> Result<ApiResponse, reqwest::Error> {
        self.send_json(Method::POST, "/loans/create-loan", session, &json!({ "book_id": book_id }))
            .await
    }

    pub async fn return_loan(
        &self,
        session: &ForwardedSession,
        book_id: i32,
    ) -> Result<ApiResponse, reqwest::Error> {
        self.send_json(Method::POST, "/loans/return-loan", session, &json!({ "book_id": book_id }))
            .await
    }
}
