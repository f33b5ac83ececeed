use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use rxdesk_core::validation::{validate_name, validate_amount, validate_optional_text};
use rxdesk_core::{Money, Product, ProductStock, Role};
use rxdesk_db::{NewProduct, UpdateProduct};
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub price: Money,
    pub description: Option<String>,
}

/// Absent fields are left alone; an empty `description` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub description: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<ApiJson<Vec<ProductStock>>> {
    let products = state.db.products().list_with_stock(query.search.as_deref()).await?;
    Ok(ApiJson(products))
}

async fn get_one(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<ProductStock>> {
    let product = state
        .db
        .products()
        .get_with_stock(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product not found: {}", id)))?;
    Ok(ApiJson(product))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, ApiJson<Product>)> {
    require_role(&principal, &[Role::Admin])?;
    validate_amount("price", request.price)?;

    let product = state
        .db
        .products()
        .create(NewProduct {
            name: validate_name("name", &request.name)?,
            category: validate_name("category", &request.category)?,
            price: request.price,
            description: validate_optional_text("description", request.description.as_deref())?,
        })
        .await?;

    Ok((StatusCode::CREATED, ApiJson(product)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateProductRequest>,
) -> ApiResult<ApiJson<Product>> {
    require_role(&principal, &[Role::Admin])?;
    if let Some(price) = request.price {
        validate_amount("price", price)?;
    }

    let changes = UpdateProduct {
        name: request.name.as_deref().map(|n| validate_name("name", n)).transpose()?,
        category: request
            .category
            .as_deref()
            .map(|c| validate_name("category", c))
            .transpose()?,
        price: request.price,
        description: request
            .description
            .as_deref()
            .map(|d| validate_optional_text("description", Some(d)))
            .transpose()?,
    };

    Ok(ApiJson(state.db.products().update(&id, changes).await?))
}

/// Batches go with the product.
async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require_role(&principal, &[Role::Admin])?;
    state.db.products().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
