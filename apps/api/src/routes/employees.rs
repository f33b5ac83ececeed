use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Router;
use rxdesk_core::validation::{parse_date, validate_name, validate_amount};
use rxdesk_core::{Employee, EmployeeStatus, Money, Role};
use rxdesk_db::{NewEmployee, UpdateEmployee};
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

const READERS: &[Role] = &[Role::Admin, Role::Finance];
const WRITERS: &[Role] = &[Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/employees", get(list).post(create))
        .route("/employees/{id}", get(get_one).put(update).delete(delete))
        .route("/employees/{id}/status", patch(set_status))
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeQuery {
    pub status: Option<EmployeeStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    pub name: String,
    /// Job title, free text.
    pub role: String,
    pub base_salary: Money,
    pub hire_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub base_salary: Option<Money>,
    pub hire_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: EmployeeStatus,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<EmployeeQuery>,
) -> ApiResult<ApiJson<Vec<Employee>>> {
    require_role(&principal, READERS)?;
    Ok(ApiJson(state.db.employees().list(query.status).await?))
}

async fn get_one(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<Employee>> {
    require_role(&principal, READERS)?;
    let employee = state
        .db
        .employees()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Employee not found: {}", id)))?;
    Ok(ApiJson(employee))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(request): ApiJson<CreateEmployeeRequest>,
) -> ApiResult<(StatusCode, ApiJson<Employee>)> {
    require_role(&principal, WRITERS)?;
    validate_amount("baseSalary", request.base_salary)?;

    let employee = state
        .db
        .employees()
        .create(NewEmployee {
            name: validate_name("name", &request.name)?,
            role: validate_name("role", &request.role)?,
            base_salary: request.base_salary,
            hire_date: parse_date("hireDate", &request.hire_date)?,
        })
        .await?;

    Ok((StatusCode::CREATED, ApiJson(employee)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateEmployeeRequest>,
) -> ApiResult<ApiJson<Employee>> {
    require_role(&principal, WRITERS)?;
    if let Some(salary) = request.base_salary {
        validate_amount("baseSalary", salary)?;
    }

    let changes = UpdateEmployee {
        name: request.name.as_deref().map(|n| validate_name("name", n)).transpose()?,
        role: request.role.as_deref().map(|r| validate_name("role", r)).transpose()?,
        base_salary: request.base_salary,
        hire_date: request
            .hire_date
            .as_deref()
            .map(|d| parse_date("hireDate", d))
            .transpose()?,
    };

    Ok(ApiJson(state.db.employees().update(&id, changes).await?))
}

async fn set_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<ApiJson<Employee>> {
    require_role(&principal, WRITERS)?;
    Ok(ApiJson(state.db.employees().set_status(&id, request.status).await?))
}

/// 409 once the employee has been paid; deactivate instead.
async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require_role(&principal, WRITERS)?;
    state.db.employees().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
