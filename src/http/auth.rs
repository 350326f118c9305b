use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::store::models::User;

use super::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    user: User,
    token: String,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<(axum::http::StatusCode, Json<AuthResponse>)> {
    if body.username.trim().is_empty() || body.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "username required, password must be at least 8 characters".into(),
        ));
    }

    if state.store.get_user_by_username(&body.username).await?.is_some() {
        return Err(AppError::Conflict("username already taken".into()));
    }

    let password_hash = state.auth.hash_password(&body.password)?;
    let is_first_user = state.store.count_users().await? == 0;
    let user = state
        .store
        .create_user(&body.username, &password_hash, is_first_user)
        .await?;
    let token = state.auth.issue_token(&user)?;

    Ok((axum::http::StatusCode::CREATED, Json(AuthResponse { user, token })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .store
        .get_user_by_username(&body.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state.auth.verify_password(&body.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = state.auth.issue_token(&user)?;
    Ok(Json(AuthResponse { user, token }))
}

#[derive(Serialize)]
struct VerifyResponse {
    valid: bool,
    user: User,
}

async fn verify(AuthUser(user): AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse { valid: true, user })
}
