//! Authentication and account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{Role, SignUp, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account
    pub async fn sign_up(&self, request: SignUp) -> AppResult<User> {
        request.validate()?;

        if self
            .repository
            .users
            .get_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("User already exist.".to_string()));
        }

        let role = if self.config.admin_usernames.contains(&request.username) {
            Role::Admin
        } else {
            Role::Regular
        };

        let hash = self.hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.username, &hash, role)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User signed up");
        Ok(user)
    }

    /// Authenticate by username and password, returning a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("User or Password is incorrect".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("User or Password is incorrect".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Decode and check a session token
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
