use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use rxdesk_core::clock::Period;
use rxdesk_core::report::ExpenseSummary;
use rxdesk_core::validation::{
    parse_date, validate_amount, validate_date_range, validate_optional_text,
};
use rxdesk_core::{Expense, ExpenseCategory, Money, Role};
use rxdesk_db::{ExpenseFilter, NewExpense, UpdateExpense};
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

const EXPENSE_ROLES: &[Role] = &[Role::Admin, Role::Finance];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list).post(create))
        .route("/expenses/summary/month", get(month_summary))
        .route("/expenses/{id}", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub category: Option<ExpenseCategory>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<Period>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub category: ExpenseCategory,
    pub amount: Money,
    /// `YYYY-MM-DD`
    pub date: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Money>,
    pub date: Option<String>,
    pub description: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<ExpenseQuery>,
) -> ApiResult<ApiJson<Vec<Expense>>> {
    require_role(&principal, EXPENSE_ROLES)?;

    let from = query.from.as_deref().map(|d| parse_date("from", d)).transpose()?;
    let to = query.to.as_deref().map(|d| parse_date("to", d)).transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        validate_date_range(from, to)?;
    }

    let filter = ExpenseFilter {
        from,
        to,
        category: query.category,
    };
    Ok(ApiJson(state.db.expenses().list(filter).await?))
}

async fn get_one(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<Expense>> {
    require_role(&principal, EXPENSE_ROLES)?;
    let expense = state
        .db
        .expenses()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Expense not found: {}", id)))?;
    Ok(ApiJson(expense))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CreateExpenseRequest>,
) -> ApiResult<(StatusCode, ApiJson<Expense>)> {
    require_role(&principal, EXPENSE_ROLES)?;
    validate_amount("amount", request.amount)?;

    let input = NewExpense {
        category: request.category,
        amount: request.amount,
        date: parse_date("date", &request.date)?,
        description: validate_optional_text("description", request.description.as_deref())?,
    };
    let expense = state.db.expenses().create(input, &principal.user_id).await?;

    Ok((StatusCode::CREATED, ApiJson(expense)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateExpenseRequest>,
) -> ApiResult<ApiJson<Expense>> {
    require_role(&principal, EXPENSE_ROLES)?;
    if let Some(amount) = request.amount {
        validate_amount("amount", amount)?;
    }

    let changes = UpdateExpense {
        category: request.category,
        amount: request.amount,
        date: request.date.as_deref().map(|d| parse_date("date", d)).transpose()?,
        description: request
            .description
            .as_deref()
            .map(|d| validate_optional_text("description", Some(d)))
            .transpose()?,
    };

    Ok(ApiJson(state.db.expenses().update(&id, changes).await?))
}

async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require_role(&principal, EXPENSE_ROLES)?;
    state.db.expenses().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn month_summary(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<ApiJson<ExpenseSummary>> {
    require_role(&principal, EXPENSE_ROLES)?;
    let period = query
        .period
        .unwrap_or_else(|| Period::containing(state.db.clock().today(Utc::now())));
    Ok(ApiJson(state.db.expenses().month_summary(period).await?))
}
