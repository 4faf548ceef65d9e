//! Account endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{SignIn, SignUp, User},
    AppState,
};

use super::{ApiJson, AuthenticatedUser};

/// Successful sign-in
#[derive(Serialize, ToSchema)]
pub struct SignInResponse {
    /// JWT access token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    pub user: User,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignUp,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignUp>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in and obtain a token
#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "auth",
    request_body = SignIn,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Wrong username or password")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignIn>,
) -> AppResult<Json<SignInResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(SignInResponse {
        token,
        token_type: "Bearer".to_string(),
        user,
    }))
}

/// Current user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(user))
}
