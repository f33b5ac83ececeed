use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use rxdesk_core::validation::{validate_email, validate_name, validate_password};
use rxdesk_core::{Role, User};
use rxdesk_db::NewUser;
use serde::Deserialize;

use crate::auth::{hash_password, require_role, AuthUser};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list).post(create))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<ApiJson<Vec<User>>> {
    require_role(&principal, &[Role::Admin])?;
    Ok(ApiJson(state.db.users().list().await?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, ApiJson<User>)> {
    require_role(&principal, &[Role::Admin])?;

    let name = validate_name("name", &request.name)?;
    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;
    let password_hash = hash_password(&request.password)?;

    let user = state
        .db
        .users()
        .create(NewUser {
            name,
            email,
            role: request.role,
            password_hash,
        })
        .await?;

    Ok((StatusCode::CREATED, ApiJson(user)))
}
