//! Checkout and refunds.
//!
//! ```text
//! POST /checkout { items, payment, notes? }
//!      │
//!      ├── role: admin | cashier
//!      ├── cart size / quantity / payment shape checked here
//!      ▼
//! CheckoutService::checkout(principal, lines, payment)   (one transaction)
//!      │
//!      ▼
//! 201 { saleId, invoiceNumber, total, change, createdAt, items }
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use rxdesk_core::checkout::{CartLine, PaymentRequest, RefundLine};
use rxdesk_core::validation::{
    validate_amount, validate_cart_size, validate_optional_text, validate_quantity,
};
use rxdesk_core::{PaymentType, Role, Sale, ValidationError};
use rxdesk_db::CheckoutReceipt;
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/sales/{id}/refund", post(refund))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub payment: PaymentRequest,
    pub notes: Option<String>,
}

/// Omitting `items` refunds everything still refundable.
#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    pub items: Option<Vec<RefundLine>>,
    pub notes: Option<String>,
}

async fn checkout(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, ApiJson<CheckoutReceipt>)> {
    require_role(&principal, &[Role::Admin, Role::Cashier])?;

    validate_cart_size(request.items.len())?;
    for line in &request.items {
        validate_quantity(line.quantity)?;
    }
    if request.payment.payment_type == PaymentType::Cash {
        let received = request
            .payment
            .cash_received
            .ok_or_else(|| ValidationError::required("payment.cashReceived"))?;
        validate_amount("payment.cashReceived", received)?;
    }
    let notes = validate_optional_text("notes", request.notes.as_deref())?;

    let sale = state
        .db
        .checkout()
        .checkout(&principal, &request.items, &request.payment, notes)
        .await?;

    Ok((StatusCode::CREATED, ApiJson(CheckoutReceipt::from(sale))))
}

async fn refund(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(sale_id): ApiPath<String>,
    ApiJson(request): ApiJson<RefundRequest>,
) -> ApiResult<(StatusCode, ApiJson<Sale>)> {
    require_role(&principal, &[Role::Admin, Role::Cashier])?;

    if let Some(lines) = &request.items {
        if lines.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        for line in lines {
            validate_quantity(line.quantity)?;
        }
    }
    let notes = validate_optional_text("notes", request.notes.as_deref())?;

    let refund = state
        .db
        .checkout()
        .refund(&principal, &sale_id, request.items.as_deref(), notes)
        .await?;

    Ok((StatusCode::CREATED, ApiJson(refund)))
}
