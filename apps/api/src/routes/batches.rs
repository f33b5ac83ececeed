use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use rxdesk_core::validation::{
    parse_date, validate_amount, validate_name, validate_optional_text, validate_stock_level,
};
use rxdesk_core::{Batch, Money, Role};
use rxdesk_db::{NewBatch, UpdateBatch};
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/batches", post(create))
        .route("/batches/product/{product_id}", get(list_for_product))
        .route("/batches/{id}", put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    pub product_id: String,
    pub supplier: Option<String>,
    /// `YYYY-MM-DD`
    pub expiry_date: String,
    pub quantity: i64,
    pub cost_price: Money,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatchRequest {
    pub supplier: Option<String>,
    pub expiry_date: Option<String>,
    pub quantity: Option<i64>,
    pub cost_price: Option<Money>,
}

async fn list_for_product(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<ApiJson<Vec<Batch>>> {
    Ok(ApiJson(state.db.batches().list_for_product(&product_id).await?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CreateBatchRequest>,
) -> ApiResult<(StatusCode, ApiJson<Batch>)> {
    require_role(&principal, &[Role::Admin])?;
    validate_stock_level(request.quantity)?;
    validate_amount("costPrice", request.cost_price)?;

    let batch = state
        .db
        .batches()
        .create(NewBatch {
            product_id: validate_name("productId", &request.product_id)?,
            supplier: validate_optional_text("supplier", request.supplier.as_deref())?,
            expiry_date: parse_date("expiryDate", &request.expiry_date)?,
            quantity: request.quantity,
            cost_price: request.cost_price,
        })
        .await?;

    Ok((StatusCode::CREATED, ApiJson(batch)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateBatchRequest>,
) -> ApiResult<ApiJson<Batch>> {
    require_role(&principal, &[Role::Admin])?;
    if let Some(quantity) = request.quantity {
        validate_stock_level(quantity)?;
    }
    if let Some(cost) = request.cost_price {
        validate_amount("costPrice", cost)?;
    }

    let changes = UpdateBatch {
        supplier: request
            .supplier
            .as_deref()
            .map(|s| validate_optional_text("supplier", Some(s)))
            .transpose()?,
        expiry_date: request
            .expiry_date
            .as_deref()
            .map(|d| parse_date("expiryDate", d))
            .transpose()?,
        quantity: request.quantity,
        cost_price: request.cost_price,
    };

    Ok(ApiJson(state.db.batches().update(&id, changes).await?))
}

async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require_role(&principal, &[Role::Admin])?;
    state.db.batches().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
