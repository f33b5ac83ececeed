//! Monthly payroll.
//!
//! Reading a period fills in entries for active employees that do not have
//! one yet, so the first `GET /payroll?period=` of a month opens it.

use std::fmt::Write;

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, put};
use axum::Router;
use chrono::Utc;
use rxdesk_core::clock::Period;
use rxdesk_core::payroll::PayrollAmendment;
use rxdesk_core::validation::parse_date;
use rxdesk_core::{PayrollEntry, PayrollPaymentMethod, Role};
use rxdesk_db::{MarkPaid, PayrollExportRow};
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

const PAYROLL_ROLES: &[Role] = &[Role::Admin, Role::Finance];

const CSV_HEADER: &str =
    "employee,role,period,base_salary,advances,deductions,net_pay,paid,paid_date,payment_method";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payroll", get(list))
        .route("/payroll/export.csv", get(export_csv))
        .route("/payroll/{id}", put(update))
        .route("/payroll/{id}/pay", patch(mark_paid))
}

/// `YYYY-MM`; defaults to the current business month.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<Period>,
}

impl PeriodQuery {
    fn resolve(&self, state: &AppState) -> Period {
        self.period
            .unwrap_or_else(|| Period::containing(state.db.clock().today(Utc::now())))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub paid: bool,
    pub paid_date: Option<String>,
    pub payment_method: Option<PayrollPaymentMethod>,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<ApiJson<Vec<PayrollEntry>>> {
    require_role(&principal, PAYROLL_ROLES)?;
    let period = query.resolve(&state);
    Ok(ApiJson(state.db.payroll().list_or_create_for_period(period).await?))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(amendment): ApiJson<PayrollAmendment>,
) -> ApiResult<ApiJson<PayrollEntry>> {
    require_role(&principal, PAYROLL_ROLES)?;
    Ok(ApiJson(state.db.payroll().update_entry(&id, &amendment).await?))
}

async fn mark_paid(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<MarkPaidRequest>,
) -> ApiResult<ApiJson<PayrollEntry>> {
    require_role(&principal, PAYROLL_ROLES)?;

    let paid_date = request
        .paid_date
        .as_deref()
        .map(|d| parse_date("paidDate", d))
        .transpose()?;
    let today = state.db.clock().today(Utc::now());

    let entry = state
        .db
        .payroll()
        .mark_paid(
            &id,
            MarkPaid {
                paid: request.paid,
                paid_date,
                payment_method: request.payment_method,
            },
            today,
        )
        .await?;
    Ok(ApiJson(entry))
}

async fn export_csv(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<Response> {
    require_role(&principal, PAYROLL_ROLES)?;
    let period = query.resolve(&state);

    let rows = state.db.payroll().export_rows(period).await?;
    let csv = render_csv(&rows);

    let filename = format!("payroll-{}.csv", period);
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        csv,
    )
        .into_response())
}

fn render_csv(rows: &[PayrollExportRow]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    for row in rows {
        let entry = &row.entry;
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{},{}",
            csv_field(&entry.employee_name),
            csv_field(&row.employee_role),
            entry.period,
            entry.base_salary,
            entry.advances,
            entry.deductions,
            entry.net_pay,
            entry.paid,
            entry.paid_date.map(|d| d.to_string()).unwrap_or_default(),
            entry.payment_method.map(|m| m.as_str()).unwrap_or_default(),
        );
    }
    csv
}

/// Quotes a field containing a comma, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
