pub mod admin;
pub mod auth;
pub mod library;
pub mod network;
pub mod stream;
pub mod subtitles;
pub mod watch;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::store::models::User;

/// Mirrors the teacher's `main.rs` nesting style: one `Router` per concern,
/// merged under a common prefix. CORS is permissive — single-household
/// server, not a public multi-tenant one (spec.md §1 Non-goals).
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/library", library::router())
        .nest("/stream", stream::router())
        .nest("/subtitles", subtitles::router())
        .nest("/network", network::router())
        .nest("/watch", watch::router())
        .nest("/admin", admin::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health { status: "ok" })
}

/// Bearer credential, accepted from either the `Authorization` header or a
/// `token` query parameter (spec.md §9 "credential-in-query for streams" —
/// browser media elements cannot attach headers to sub-requests).
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_from_header(parts)
            .or_else(|| bearer_from_query(parts))
            .ok_or(AppError::Unauthorized)?;

        let claims = state.auth.verify_token(&token)?;
        let user = state
            .store
            .get_user(claims.sub)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        tracing::debug!(
            user_id = user.id,
            token = %crate::auth::token_fingerprint(&token),
            "authenticated request"
        );
        Ok(AuthUser(user))
    }
}

/// Like `AuthUser` but requires the freshly-fetched row to carry
/// `is_admin`, per spec.md §4.8 — never trusted from the token.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

fn bearer_from_header(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|s| s.to_string())
}

fn bearer_from_query(parts: &Parts) -> Option<String> {
    let query = parts.uri.query()?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "token" || key == "access_token").then(|| value.to_string())
    })
}
