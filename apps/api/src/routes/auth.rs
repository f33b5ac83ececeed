use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use rxdesk_core::validation::validate_email;
use rxdesk_core::User;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<ApiJson<LoginResponse>> {
    let email = validate_email(&request.email)?;
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let Some(record) = state.db.users().find_by_email(&email).await? else {
        warn!(email = %email, "Login for unknown email");
        return Err(invalid());
    };
    if !verify_password(&request.password, &record.password_hash) {
        warn!(user_id = %record.id, "Login with wrong password");
        return Err(invalid());
    }

    let user = record.into_user();
    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    Ok(ApiJson(LoginResponse { token, user }))
}

async fn me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<ApiJson<User>> {
    let user = state
        .db
        .users()
        .get_by_id(&principal.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", principal.user_id)))?;
    Ok(ApiJson(user))
}
