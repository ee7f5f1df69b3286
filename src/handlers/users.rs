use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::models::{LoginRequest, NewUser, PublicUser, RegisterUser};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::ApiJson;
use crate::utils::response::{created, success};

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterUser>,
) -> Result<Response, AppError> {
    let password_hash = hash_password(input.password).await?;

    let user = state
        .users
        .create_user(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok(created(PublicUser::from(user)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let Some(user) = state.users.find_user_by_email(&input.email).await? else {
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(user.password_hash.clone(), input.password).await? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(success(TokenResponse { token }))
}

/// Echoes the decoded token claims.
pub async fn profile(AuthUser(claims): AuthUser) -> Response {
    success(claims)
}
