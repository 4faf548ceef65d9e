//! API integration tests
//!
//! Each test starts the full router on an ephemeral port with the in-memory
//! store and talks to it over HTTP.

use library_lending_server::{
    config::{AppConfig, StorageBackend},
    create_router,
    repository::Repository,
    AppState,
};
use reqwest::{header, redirect, Client, StatusCode};
use serde_json::{json, Value};

struct TestApp {
    base_url: String,
    client: Client,
}

impl TestApp {
    async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        let mut config = AppConfig::default();
        config.database.backend = StorageBackend::Memory;
        config.auth.jwt_secret = "integration-secret".to_string();
        config.auth.admin_usernames = vec!["admin".to_string()];
        config.web.api_base_url = format!("http://{}/api", addr);

        let app = create_router(AppState::new(config, Repository::in_memory()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build client");

        Self {
            base_url: format!("http://{}", addr),
            client,
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn page(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sign up then sign in, returning a bearer token
    async fn token_for(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.api("/auth/signup"))
            .json(&json!({ "username": username, "password": "secret-pass" }))
            .send()
            .await
            .expect("Failed to send signup request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self
            .client
            .post(self.api("/auth/signin"))
            .json(&json!({ "username": username, "password": "secret-pass" }))
            .send()
            .await
            .expect("Failed to send signin request");
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.expect("Failed to parse signin response");
        assert_eq!(body["token_type"], "Bearer");
        body["token"].as_str().expect("No token in response").to_string()
    }

    async fn create_book(&self, admin_token: &str, title: &str, stock: i32) -> Value {
        let response = self
            .client
            .post(self.api("/books"))
            .bearer_auth(admin_token)
            .json(&json!({
                "title": title,
                "author": "Ursula K. Le Guin",
                "abstract": "A wizard's coming of age",
                "publication_year": 1968,
                "stock": stock
            }))
            .send()
            .await
            .expect("Failed to send create book request");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.expect("Failed to parse book")
    }

    async fn loan_call(&self, token: &str, action: &str, book_id: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.api(&format!("/loans/{}", action)))
            .bearer_auth(token)
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .expect("Failed to send loan request");
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn book(&self, token: &str, book_id: &Value) -> Value {
        self.client
            .get(self.api(&format!("/books/{}", book_id)))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to fetch book")
            .json()
            .await
            .expect("Failed to parse book")
    }
}

/// Answer of a page request after its cookies were folded into the jar
struct PageResponse {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

impl TestApp {
    /// Sign in through the page form, returning the session cookies
    async fn page_login(&self, username: &str) -> Vec<(String, String)> {
        let mut cookies = Vec::new();
        let response = self
            .post_page("/signin", &mut cookies, &[("username", username), ("password", "secret-pass")])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert!(cookie_value(&cookies, "sessionid").is_some());
        cookies
    }

    async fn post_page(
        &self,
        path: &str,
        cookies: &mut Vec<(String, String)>,
        form: &[(&str, &str)],
    ) -> PageResponse {
        let response = self
            .client
            .post(self.page(path))
            .header(header::COOKIE, cookie_header(cookies))
            .form(form)
            .send()
            .await
            .expect("Failed to post page form");
        Self::page_response(response, cookies).await
    }

    async fn get_page(&self, path: &str, cookies: &mut Vec<(String, String)>) -> PageResponse {
        let response = self
            .client
            .get(self.page(path))
            .header(header::COOKIE, cookie_header(cookies))
            .send()
            .await
            .expect("Failed to get page");
        Self::page_response(response, cookies).await
    }

    async fn page_response(response: reqwest::Response, cookies: &mut Vec<(String, String)>) -> PageResponse {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        for (name, value) in cookies_from(&response) {
            cookies.retain(|(n, _)| *n != name);
            cookies.push((name, value));
        }
        let body = response.json().await.unwrap_or(Value::Null);
        PageResponse { status, location, body }
    }
}

/// `name=value` pairs from every Set-Cookie header, ready for a Cookie header
fn cookies_from(response: &reqwest::Response) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

fn cookie_value<'a>(cookies: &'a [(String, String)], name: &str) -> Option<&'a str> {
    cookies
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, value)| value.as_str())
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.api("/health"))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");

    let ready = app.client.get(app.api("/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_signin_and_me() {
    let app = TestApp::spawn().await;
    let token = app.token_for("reader").await;

    let response = app
        .client
        .get(app.api("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "reader");
    assert_eq!(body["role"], "regular");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.token_for("reader").await;

    let response = app
        .client
        .post(app.api("/auth/signin"))
        .json(&json!({ "username": "reader", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User or Password is incorrect");
}

#[tokio::test]
async fn test_books_require_authentication() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.api("/books")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_regular_user_cannot_edit_catalog() {
    let app = TestApp::spawn().await;
    let token = app.token_for("reader").await;

    let response = app
        .client
        .post(app.api("/books"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "publication_year": 1965,
            "stock": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalog_crud() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;

    let book = app.create_book(&admin, "A Wizard of Earthsea", 2).await;
    assert_eq!(book["abstract"], "A wizard's coming of age");
    let id = &book["id"];

    let response = app
        .client
        .patch(app.api(&format!("/books/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "stock": 5, "abstract": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let patched: Value = response.json().await.unwrap();
    assert_eq!(patched["stock"], 5);
    assert_eq!(patched["abstract"], Value::Null);
    assert_eq!(patched["title"], "A Wizard of Earthsea");

    let response = app
        .client
        .put(app.api(&format!("/books/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "The Tombs of Atuan",
            "author": "Ursula K. Le Guin",
            "publication_year": 1970,
            "stock": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed: Value = app
        .client
        .get(app.api("/books"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "The Tombs of Atuan");

    let response = app
        .client
        .delete(app.api(&format!("/books/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.api(&format!("/books/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_book_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;

    let response = app
        .client
        .post(app.api("/books"))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Negative",
            "author": "Nobody",
            "publication_year": 2000,
            "stock": -1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BadValue");
}

#[tokio::test]
async fn test_borrow_and_return_flow() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    let reader = app.token_for("reader").await;

    let book = app.create_book(&admin, "A Wizard of Earthsea", 2).await;
    let id = &book["id"];

    let (status, loan) = app.loan_call(&reader, "create-loan", id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["book_id"], *id);
    assert_eq!(loan["book_title"], "A Wizard of Earthsea");
    assert_eq!(loan["return_date"], Value::Null);
    assert_eq!(app.book(&reader, id).await["stock"], 1);

    let (status, body) = app.loan_call(&reader, "create-loan", id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You already borrowed this book and haven't returned it.");
    assert_eq!(app.book(&reader, id).await["stock"], 1);

    let (status, returned) = app.loan_call(&reader, "return-loan", id).await;
    assert_eq!(status, StatusCode::OK);
    assert!(returned["return_date"].is_string());
    assert_eq!(app.book(&reader, id).await["stock"], 2);

    let (status, body) = app.loan_call(&reader, "return-loan", id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You already returned this book or never borrowed it.");
    assert_eq!(app.book(&reader, id).await["stock"], 2);
}

#[tokio::test]
async fn test_out_of_stock_book_cannot_be_borrowed() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    let first = app.token_for("first").await;
    let second = app.token_for("second").await;

    let book = app.create_book(&admin, "Last Copy", 1).await;
    let id = &book["id"];

    let (status, _) = app.loan_call(&first, "create-loan", id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.loan_call(&second, "create-loan", id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This book is currently not available.");
    assert_eq!(body["code"], "BookNotAvailable");
    assert_eq!(app.book(&second, id).await["stock"], 0);
}

#[tokio::test]
async fn test_loan_requests_need_a_known_book() {
    let app = TestApp::spawn().await;
    let reader = app.token_for("reader").await;

    let response = app
        .client
        .post(app.api("/loans/create-loan"))
        .bearer_auth(&reader)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = app.loan_call(&reader, "create-loan", &json!(4242)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loan_list_shows_latest_loan_per_book() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    let reader = app.token_for("reader").await;

    let earthsea = app.create_book(&admin, "A Wizard of Earthsea", 1).await;
    let atuan = app.create_book(&admin, "The Tombs of Atuan", 1).await;

    app.loan_call(&reader, "create-loan", &earthsea["id"]).await;
    app.loan_call(&reader, "return-loan", &earthsea["id"]).await;
    app.loan_call(&reader, "create-loan", &earthsea["id"]).await;
    app.loan_call(&reader, "create-loan", &atuan["id"]).await;

    let loans: Value = app
        .client
        .get(app.api("/loans"))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let loans = loans.as_array().unwrap();

    assert_eq!(loans.len(), 2);
    assert_eq!(loans[0]["book_id"], atuan["id"]);
    assert_eq!(loans[1]["book_id"], earthsea["id"]);
    assert!(loans.iter().all(|loan| loan["return_date"].is_null()));

    // Another reader sees none of them
    let other = app.token_for("other").await;
    let response = app
        .client
        .get(app.api(&format!("/loans/{}", loans[0]["id"])))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cookie_session_requires_csrf_token() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    let token = app.token_for("reader").await;
    let book = app.create_book(&admin, "Cookie Book", 1).await;

    let cookie = format!("sessionid={}; csrftoken=abc123", token);

    let response = app
        .client
        .post(app.api("/loans/create-loan"))
        .header(header::COOKIE, &cookie)
        .json(&json!({ "book_id": book["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .post(app.api("/loans/create-loan"))
        .header(header::COOKIE, &cookie)
        .header("X-CSRFToken", "abc123")
        .json(&json!({ "book_id": book["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_api_path_is_json_not_found() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.api("/nowhere")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NoSuchData");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.page("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["paths"]["/loans/create-loan"].is_object());
}

#[tokio::test]
async fn test_anonymous_pages_redirect_to_signin() {
    let app = TestApp::spawn().await;

    for path in ["/", "/books", "/somewhere/else"] {
        let response = app.client.get(app.page(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/signin",
            "{}",
            path
        );
    }
}

#[tokio::test]
async fn test_pages_borrow_through_the_api() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    let book = app.create_book(&admin, "A Wizard of Earthsea", 1).await;

    // Sign up through the page form
    let response = app
        .client
        .post(app.page("/signup"))
        .form(&[
            ("username", "visitor"),
            ("password1", "secret-pass"),
            ("password2", "secret-pass"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let mut cookies = cookies_from(&response);
    assert!(cookie_value(&cookies, "sessionid").is_some());
    assert!(cookie_value(&cookies, "csrftoken").is_some());

    let home: Value = app
        .client
        .get(app.page("/"))
        .header(header::COOKIE, cookie_header(&cookies))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(home["page"], "home");
    assert_eq!(home["user"], "visitor");
    assert_eq!(home["books"][0]["title"], "A Wizard of Earthsea");

    let response = app
        .client
        .post(app.page(&format!("/books/{}/borrow", book["id"])))
        .header(header::COOKIE, cookie_header(&cookies))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/books");
    cookies.extend(cookies_from(&response));

    let loans: Value = app
        .client
        .get(app.page("/books"))
        .header(header::COOKIE, cookie_header(&cookies))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(loans["page"], "loans");
    assert_eq!(loans["flashes"][0]["message"], "Loan created successfully.");
    assert_eq!(loans["loans"][0]["book_title"], "A Wizard of Earthsea");
    assert_eq!(app.book(&admin, &book["id"]).await["stock"], 0);
}

#[tokio::test]
async fn test_page_signup_password_mismatch() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.page("/signup"))
        .form(&[
            ("username", "visitor"),
            ("password1", "secret-pass"),
            ("password2", "other-pass"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page: Value = response.json().await.unwrap();
    assert_eq!(page["page"], "sign_up");
    assert_eq!(page["flashes"][0]["message"], "Password do not match");
}

#[tokio::test]
async fn test_page_signin_failure_shows_error() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.page("/signin"))
        .form(&[("username", "ghost"), ("password", "nope")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page: Value = response.json().await.unwrap();
    assert_eq!(page["page"], "sign_in");
    assert_eq!(page["error"], "User or Password is incorrect");
}

#[tokio::test]
async fn test_logout_clears_session_cookies() {
    let app = TestApp::spawn().await;
    let token = app.token_for("reader").await;

    let response = app
        .client
        .get(app.page("/logout"))
        .header(header::COOKIE, format!("sessionid={}; csrftoken=abc123", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let cookies = cookies_from(&response);
    assert_eq!(cookie_value(&cookies, "sessionid"), Some(""));
    assert_eq!(cookie_value(&cookies, "csrftoken"), Some(""));
}

#[tokio::test]
async fn test_non_numeric_path_id_is_json_error() {
    let app = TestApp::spawn().await;
    let token = app.token_for("reader").await;

    for path in ["/books/abc", "/loans/abc"] {
        let response = app
            .client
            .get(app.api(path))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "BadValue", "{}", path);
        assert!(body["error"].is_string(), "{}", path);
    }
}

#[tokio::test]
async fn test_loan_book_id_may_be_numeric_text() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    let reader = app.token_for("reader").await;
    let book = app.create_book(&admin, "Text Id", 1).await;

    let (status, loan) = app
        .loan_call(&reader, "create-loan", &json!(book["id"].to_string()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["book_id"], book["id"]);

    let (status, body) = app.loan_call(&reader, "return-loan", &json!(0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "book_id is required");
}

#[tokio::test]
async fn test_pages_return_flow() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    app.token_for("reader").await;
    let book = app.create_book(&admin, "A Wizard of Earthsea", 1).await;
    let id = book["id"].to_string();

    let mut cookies = app.page_login("reader").await;

    let borrowed = app.post_page(&format!("/books/{}/borrow", id), &mut cookies, &[]).await;
    assert_eq!(borrowed.location.as_deref(), Some("/books"));
    app.get_page("/books", &mut cookies).await;

    let returned = app.post_page(&format!("/books/{}/return", id), &mut cookies, &[]).await;
    assert_eq!(returned.status, StatusCode::SEE_OTHER);
    assert_eq!(returned.location.as_deref(), Some("/books"));

    let page = app.get_page("/books", &mut cookies).await.body;
    assert_eq!(page["flashes"][0]["level"], "success");
    assert_eq!(page["flashes"][0]["message"], "Book returned successfully.");
    assert!(page["loans"][0]["return_date"].is_string());
    assert_eq!(app.book(&admin, &book["id"]).await["stock"], 1);

    app.post_page(&format!("/books/{}/return", id), &mut cookies, &[]).await;
    let page = app.get_page("/books", &mut cookies).await.body;
    assert_eq!(page["flashes"][0]["level"], "warning");
    assert_eq!(
        page["flashes"][0]["message"],
        "You already returned this book or never borrowed it."
    );
    assert_eq!(app.book(&admin, &book["id"]).await["stock"], 1);
}

#[tokio::test]
async fn test_pages_delete_outcomes() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    app.token_for("reader").await;
    let book = app.create_book(&admin, "Doomed", 1).await;
    let delete_path = format!("/books/{}/delete", book["id"]);

    // A regular user is refused by the API
    let mut reader = app.page_login("reader").await;
    let refused = app.post_page(&delete_path, &mut reader, &[]).await;
    assert_eq!(refused.location.as_deref(), Some("/"));
    let page = app.get_page("/", &mut reader).await.body;
    assert_eq!(page["flashes"][0]["level"], "error");
    assert!(page["flashes"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Unexpected response: 403 - "));

    let mut cookies = app.page_login("admin").await;

    let deleted = app.post_page(&delete_path, &mut cookies, &[]).await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(deleted.location.as_deref(), Some("/"));
    let page = app.get_page("/", &mut cookies).await.body;
    assert_eq!(page["flashes"][0]["message"], "Book deleted successfully.");
    assert!(page["books"].as_array().unwrap().is_empty());

    app.post_page(&delete_path, &mut cookies, &[]).await;
    let page = app.get_page("/", &mut cookies).await.body;
    assert_eq!(page["flashes"][0]["level"], "error");
    assert_eq!(page["flashes"][0]["message"], "Book not found.");
}

#[tokio::test]
async fn test_pages_create_book() {
    let app = TestApp::spawn().await;
    app.token_for("admin").await;
    app.token_for("reader").await;

    let form = [
        ("title", "The Dispossessed"),
        ("author", "Ursula K. Le Guin"),
        ("abstract", "An ambiguous utopia"),
        ("publication_year", "1974"),
        ("stock", "2"),
    ];

    // Regular users get the API's refusal as a warning, with the form kept
    let mut reader = app.page_login("reader").await;
    let refused = app.post_page("/books/create", &mut reader, &form).await;
    assert_eq!(refused.status, StatusCode::OK);
    assert_eq!(refused.body["page"], "create_book");
    assert_eq!(refused.body["flashes"][0]["level"], "warning");
    assert_eq!(refused.body["flashes"][0]["message"], "Administrator privileges required");
    assert_eq!(refused.body["form"]["title"], "The Dispossessed");

    let mut cookies = app.page_login("admin").await;

    let invalid = app
        .post_page(
            "/books/create",
            &mut cookies,
            &[("title", "Bad"), ("author", "Nobody"), ("publication_year", "soon"), ("stock", "1")],
        )
        .await;
    assert_eq!(invalid.status, StatusCode::OK);
    assert_eq!(
        invalid.body["flashes"][0]["message"],
        "Invalid data provided. Please check your inputs."
    );

    let created = app.post_page("/books/create", &mut cookies, &form).await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    assert_eq!(created.location.as_deref(), Some("/"));

    let page = app.get_page("/", &mut cookies).await.body;
    assert_eq!(page["flashes"][0]["message"], "Book created successfully.");
    assert_eq!(page["books"][0]["title"], "The Dispossessed");
    assert_eq!(page["books"][0]["abstract"], "An ambiguous utopia");
    assert_eq!(page["books"][0]["stock"], 2);
}

#[tokio::test]
async fn test_pages_edit_book() {
    let app = TestApp::spawn().await;
    let admin = app.token_for("admin").await;
    app.token_for("reader").await;
    let book = app.create_book(&admin, "A Wizard of Earthsea", 1).await;
    let path = format!("/books/{}", book["id"]);

    let blank_but_stock = [
        ("title", ""),
        ("author", ""),
        ("abstract", ""),
        ("publication_year", ""),
        ("stock", "4"),
    ];

    // The API refuses regular users; the page shows the raw answer
    let mut reader = app.page_login("reader").await;
    let refused = app.post_page(&path, &mut reader, &blank_but_stock).await;
    assert_eq!(refused.status, StatusCode::OK);
    assert_eq!(refused.body["page"], "book_detail");
    assert_eq!(refused.body["flashes"][0]["level"], "error");
    assert!(refused.body["flashes"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Error updating book: "));
    assert_eq!(refused.body["book"]["stock"], 1);

    let mut cookies = app.page_login("admin").await;
    let detail = app.get_page(&path, &mut cookies).await.body;
    assert_eq!(detail["page"], "book_detail");
    assert_eq!(detail["book"]["title"], "A Wizard of Earthsea");

    let updated = app.post_page(&path, &mut cookies, &blank_but_stock).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["flashes"][0]["message"], "Book updated successfully.");
    assert_eq!(updated.body["book"]["stock"], 4);
    assert_eq!(updated.body["book"]["abstract"], Value::Null);
    assert_eq!(updated.body["book"]["title"], "A Wizard of Earthsea");

    let stored = app.book(&admin, &book["id"]).await;
    assert_eq!(stored["stock"], 4);
    assert_eq!(stored["abstract"], Value::Null);
    assert_eq!(stored["publication_year"], 1968);
}

#[tokio::test]
async fn test_pages_unknown_book_redirects_home() {
    let app = TestApp::spawn().await;
    app.token_for("reader").await;
    let mut cookies = app.page_login("reader").await;

    let missing = app.get_page("/books/999", &mut cookies).await;
    assert_eq!(missing.status, StatusCode::SEE_OTHER);
    assert_eq!(missing.location.as_deref(), Some("/"));

    let page = app.get_page("/", &mut cookies).await.body;
    assert_eq!(page["flashes"][0]["level"], "error");
    assert_eq!(page["flashes"][0]["message"], "Book not found.");
}
