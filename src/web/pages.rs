//! Page handlers.
//!
//! Each page is emitted as a [`PageView`] JSON document: the signed-in user,
//! the flash messages drained for this request and the page content. Catalog
//! and loan data are fetched through the REST API with the visitor's cookies.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{user::SignUp, Book, BookInput, BookPatch, LoanDetails, UserClaims},
    AppState,
};

use super::{
    flash::{self, Flash},
    session::{self, WebSession},
};

const INVALID_FORM: &str = "Invalid data provided. Please check your inputs.";

/// Rendered page
#[derive(Debug, Serialize, Deserialize)]
pub struct PageView {
    /// Username of the signed-in visitor
    pub user: Option<String>,
    pub flashes: Vec<Flash>,
    #[serde(flatten)]
    pub content: PageContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageContent {
    Home { books: Vec<Book> },
    Loans { loans: Vec<LoanDetails> },
    BookDetail { book: Book },
    CreateBook { form: BookForm },
    SignIn { error: Option<String> },
    SignUp {},
}

/// Book form as posted by the browser; every field arrives as text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub publication_year: String,
    #[serde(default)]
    pub stock: String,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `Some(None)` for a blank field, `None` for text that is not a number
fn parse_optional(value: &str) -> Option<Option<i32>> {
    match value.trim() {
        "" => Some(None),
        text => text.parse().ok().map(Some),
    }
}

impl BookForm {
    pub fn to_input(&self) -> Option<BookInput> {
        Some(BookInput {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            abstract_text: non_empty(&self.abstract_text),
            publication_year: self.publication_year.trim().parse().ok()?,
            stock: self.stock.trim().parse().ok()?,
        })
    }

    /// Blank fields are left untouched, except the abstract which is cleared
    pub fn to_patch(&self) -> Option<BookPatch> {
        Some(BookPatch {
            title: non_empty(&self.title),
            author: non_empty(&self.author),
            abstract_text: Some(non_empty(&self.abstract_text)),
            publication_year: parse_optional(&self.publication_year)?,
            stock: parse_optional(&self.stock)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub username: String,
    pub password: String,
}

fn render(jar: CookieJar, user: Option<&UserClaims>, content: PageContent) -> Response {
    let (jar, flashes) = flash::take(jar);
    let page = PageView {
        user: user.map(|claims| claims.sub.clone()),
        flashes,
        content,
    };
    (jar, Json(page)).into_response()
}

fn redirect_with(jar: CookieJar, flash: Option<Flash>, to: &str) -> Response {
    let jar = match flash {
        Some(flash) => flash::push(jar, flash),
        None => jar,
    };
    (jar, Redirect::to(to)).into_response()
}

/// Catalog listing
pub async fn home(State(state): State<AppState>, session: WebSession, jar: CookieJar) -> Response {
    let books = match state.api_client.list_books(&session.forwarded).await {
        Ok(response) if response.status == StatusCode::OK => response.json().unwrap_or_default(),
        Ok(response) => {
            tracing::warn!(status = %response.status, "Book listing refused");
            Vec::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "Book listing failed");
            Vec::new()
        }
    };

    render(jar, Some(&session.claims), PageContent::Home { books })
}

/// Latest loan of each borrowed book
pub async fn loans(State(state): State<AppState>, session: WebSession, jar: CookieJar) -> Response {
    let loans = match state.api_client.list_loans(&session.forwarded).await {
        Ok(response) if response.status == StatusCode::OK => response.json().unwrap_or_default(),
        Ok(response) => {
            tracing::warn!(status = %response.status, "Loan listing refused");
            Vec::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "Loan listing failed");
            Vec::new()
        }
    };

    render(jar, Some(&session.claims), PageContent::Loans { loans })
}

pub async fn borrow_book(
    State(state): State<AppState>,
    session: WebSession,
    jar: CookieJar,
    Path(book_id): Path<i32>,
) -> Response {
    let flash = match state.api_client.create_loan(&session.forwarded, book_id).await {
        Ok(response) => flash::from_response(&response, StatusCode::CREATED, "Loan created successfully."),
        Err(e) => Some(flash::from_transport_error(&e)),
    };
    redirect_with(jar, flash, "/books")
}

pub async fn return_book(
    State(state): State<AppState>,
    session: WebSession,
    jar: CookieJar,
    Path(book_id): Path<i32>,
) -> Response {
    let flash = match state.api_client.return_loan(&session.forwarded, book_id).await {
        Ok(response) => flash::from_response(&response, StatusCode::OK, "Book returned successfully."),
        Err(e) => Some(flash::from_transport_error(&e)),
    };
    redirect_with(jar, flash, "/books")
}

pub async fn create_book_form(session: WebSession, jar: CookieJar) -> Response {
    render(
        jar,
        Some(&session.claims),
        PageContent::CreateBook {
            form: BookForm::default(),
        },
    )
}

pub async fn create_book(
    State(state): State<AppState>,
    session: WebSession,
    jar: CookieJar,
    Form(form): Form<BookForm>,
) -> Response {
    let Some(input) = form.to_input() else {
        let jar = flash::push(jar, Flash::warning(INVALID_FORM));
        return render(jar, Some(&session.claims), PageContent::CreateBook { form });
    };

    match state.api_client.create_book(&session.forwarded, &input).await {
        Ok(response) if response.status == StatusCode::CREATED => {
            redirect_with(jar, Some(Flash::success("Book created successfully.")), "/")
        }
        Ok(response) => {
            let jar = match flash::from_response(&response, StatusCode::CREATED, "") {
                Some(flash) => flash::push(jar, flash),
                None => jar,
            };
            render(jar, Some(&session.claims), PageContent::CreateBook { form })
        }
        Err(e) => {
            let jar = flash::push(jar, flash::from_transport_error(&e));
            render(jar, Some(&session.claims), PageContent::CreateBook { form })
        }
    }
}

/// Book detail, also the edit form
pub async fn book_detail(
    State(state): State<AppState>,
    session: WebSession,
    jar: CookieJar,
    Path(book_id): Path<i32>,
) -> Response {
    match fetch_book(&state, &session, book_id).await {
        Some(book) => render(jar, Some(&session.claims), PageContent::BookDetail { book }),
        None => redirect_with(jar, Some(Flash::error("Book not found.")), "/"),
    }
}

pub async fn update_book(
    State(state): State<AppState>,
    session: WebSession,
    jar: CookieJar,
    Path(book_id): Path<i32>,
    Form(form): Form<BookForm>,
) -> Response {
    let Some(book) = fetch_book(&state, &session, book_id).await else {
        return redirect_with(jar, Some(Flash::error("Book not found.")), "/");
    };

    let Some(patch) = form.to_patch() else {
        let jar = flash::push(jar, Flash::warning(INVALID_FORM));
        return render(jar, Some(&session.claims), PageContent::BookDetail { book });
    };

    let (jar, book) = match state.api_client.patch_book(&session.forwarded, book_id, &patch).await {
        Ok(response) if response.status == StatusCode::OK => match response.json::<Book>() {
            Some(updated) => (
                flash::push(jar, Flash::success("Book updated successfully.")),
                updated,
            ),
            None => (flash::push(jar, Flash::warning("Unexpected error occurred.")), book),
        },
        Ok(response) => (
            flash::push(
                jar,
                Flash::error(format!("Error updating book: {}", response.text())),
            ),
            book,
        ),
        Err(e) => (flash::push(jar, flash::from_transport_error(&e)), book),
    };

    render(jar, Some(&session.claims), PageContent::BookDetail { book })
}

pub async fn delete_book(
    State(state): State<AppState>,
    session: WebSession,
    jar: CookieJar,
    Path(book_id): Path<i32>,
) -> Response {
    let flash = match state.api_client.delete_book(&session.forwarded, book_id).await {
        Ok(response) => flash::from_delete_response(&response),
        Err(e) => flash::from_transport_error(&e),
    };
    redirect_with(jar, Some(flash), "/")
}

async fn fetch_book(state: &AppState, session: &WebSession, book_id: i32) -> Option<Book> {
    match state.api_client.get_book(&session.forwarded, book_id).await {
        Ok(response) if response.status == StatusCode::OK => response.json(),
        Ok(_) => None,
        Err(e) => {
            tracing::error!(error = %e, book_id, "Book lookup failed");
            None
        }
    }
}

pub async fn signup_form(jar: CookieJar) -> Response {
    render(jar, None, PageContent::SignUp {})
}

pub async fn signup(State(state): State<AppState>, jar: CookieJar, Form(form): Form<SignUpForm>) -> Response {
    if form.password1 != form.password2 {
        let jar = flash::push(jar, Flash::warning("Password do not match"));
        return render(jar, None, PageContent::SignUp {});
    }

    let users = &state.services.users;
    let request = SignUp {
        username: form.username,
        password: form.password1,
    };

    let created = match users.sign_up(request).await {
        Ok(user) => users.create_token_for_user(&user),
        Err(e) => Err(e),
    };

    match created {
        Ok(token) => {
            let jar = session::start(jar, token, state.config.auth.secure_cookies);
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => {
            let message = match e {
                AppError::Conflict(_) => "User already exist.",
                AppError::Validation(_) => INVALID_FORM,
                _ => "Unexpected error occurred.",
            };
            let jar = flash::push(jar, Flash::warning(message));
            render(jar, None, PageContent::SignUp {})
        }
    }
}

pub async fn signin_form(jar: CookieJar) -> Response {
    render(jar, None, PageContent::SignIn { error: None })
}

pub async fn signin(State(state): State<AppState>, jar: CookieJar, Form(form): Form<SignInForm>) -> Response {
    match state
        .services
        .users
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok((token, user)) => {
            tracing::info!(user_id = user.id, "Signed in");
            let jar = session::start(jar, token, state.config.auth.secure_cookies);
            (jar, Redirect::to("/")).into_response()
        }
        Err(AppError::Authentication(message)) => {
            render(jar, None, PageContent::SignIn { error: Some(message) })
        }
        Err(e) => {
            let jar = flash::push(jar, Flash::error("Unexpected error occurred."));
            tracing::error!(error = %e, "Sign-in failed");
            render(jar, None, PageContent::SignIn { error: None })
        }
    }
}

pub async fn signout(_session: WebSession, jar: CookieJar) -> Response {
    (session::end(jar), Redirect::to("/")).into_response()
}

/// Unknown pages send visitors home, or to the sign-in page when anonymous
pub async fn not_found(jar: CookieJar) -> Redirect {
    if session::has_session_cookie(&jar) {
        Redirect::to("/")
    } else {
        Redirect::to(session::SIGNIN_PATH)
    }
}
