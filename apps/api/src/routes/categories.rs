use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use rxdesk_core::validation::{validate_name, validate_optional_text};
use rxdesk_core::{Category, ProductStock, Role};
use serde::{Deserialize, Serialize};

use crate::auth::{require_role, AuthUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/{category}", put(update).delete(delete))
        .route("/categories/{category}/products", get(products))
        .route("/categories/{category}/backfill", post(backfill))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Renaming leaves products on the old name until a backfill.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    /// Old category name still carried by products.
    pub from: String,
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub moved: u64,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<ApiJson<Vec<Category>>> {
    Ok(ApiJson(state.db.categories().list().await?))
}

/// Products labelled with the category name (not id).
async fn products(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiPath(name): ApiPath<String>,
) -> ApiResult<ApiJson<Vec<ProductStock>>> {
    Ok(ApiJson(state.db.products().list_by_category(&name).await?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, ApiJson<Category>)> {
    require_role(&principal, &[Role::Admin])?;
    let name = validate_name("name", &request.name)?;
    let description = validate_optional_text("description", request.description.as_deref())?;

    let category = state.db.categories().create(&name, description.as_deref()).await?;
    Ok((StatusCode::CREATED, ApiJson(category)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<ApiJson<Category>> {
    require_role(&principal, &[Role::Admin])?;
    let name = request.name.as_deref().map(|n| validate_name("name", n)).transpose()?;
    let description = request
        .description
        .as_deref()
        .map(|d| validate_optional_text("description", Some(d)))
        .transpose()?;

    let category = state
        .db
        .categories()
        .update(&id, name.as_deref(), description.as_ref().map(|d| d.as_deref()))
        .await?;
    Ok(ApiJson(category))
}

async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require_role(&principal, &[Role::Admin])?;
    state.db.categories().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn backfill(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<BackfillRequest>,
) -> ApiResult<ApiJson<BackfillResponse>> {
    require_role(&principal, &[Role::Admin])?;
    let from = validate_name("from", &request.from)?;
    let moved = state.db.categories().backfill(&id, &from).await?;
    Ok(ApiJson(BackfillResponse { moved }))
}
