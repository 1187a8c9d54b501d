//! Registration, login and profile handlers

use axum::extract::State;
use lumen_common::{
    auth::{scopes_for, AuthContext},
    db::models::User,
    errors::{AppError, Result},
    response::Envelope,
    users::{CreateUser, UserService},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTimeWithTimeZone,
    pub last_login: Option<DateTimeWithTimeZone>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Create a regular account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUser>,
) -> Result<Envelope<UserProfile>> {
    let service = UserService::new(state.repository());
    let user = service.create_user(request).await?;

    Ok(Envelope::created(user.into(), "Account created"))
}

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Envelope<LoginResponse>> {
    if request.email.trim().is_empty() {
        return Err(AppError::MissingField { field: "email".to_string() });
    }
    if request.password.is_empty() {
        return Err(AppError::MissingField { field: "password".to_string() });
    }

    let service = UserService::new(state.repository());
    let user = service.authenticate(&request.email, &request.password).await?;

    let token = state
        .jwt
        .generate_token(user.id, scopes_for(user.is_staff, user.is_superuser))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Envelope::ok(
        LoginResponse {
            access_token: token,
            token_type: "Bearer",
            expires_in: state.jwt.expiration_secs(),
            user: user.into(),
        },
        "Login successful",
    ))
}

/// Current user's profile
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> Result<Envelope<UserProfile>> {
    let user = state
        .repository()
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound { id: auth.user_id.to_string() })?;

    Ok(Envelope::ok(user.into(), "Profile retrieved"))
}
