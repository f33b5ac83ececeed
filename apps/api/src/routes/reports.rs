use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use rxdesk_core::report::{FinancialSummary, Granularity, SalesBucket, SummaryPeriod};
use rxdesk_core::validation::{parse_date, validate_date_range};
use rxdesk_core::{Role, ValidationError};
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::pdf::render_summary;
use crate::state::AppState;

const REPORT_ROLES: &[Role] = &[Role::Admin, Role::Finance];

/// Longest `from..=to` span accepted by the sales report.
const MAX_REPORT_DAYS: i64 = 3_660;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/summary", get(summary))
        .route("/reports/sales", get(sales))
        .route("/reports/pdf", get(pdf))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<SummaryPeriod>,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub from: String,
    pub to: String,
    pub granularity: Option<Granularity>,
}

async fn summary(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<ApiJson<FinancialSummary>> {
    require_role(&principal, REPORT_ROLES)?;
    let period = query.period.unwrap_or(SummaryPeriod::Monthly);
    Ok(ApiJson(state.db.reports().summary(period, Utc::now()).await?))
}

async fn sales(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<ApiJson<Vec<SalesBucket>>> {
    require_role(&principal, REPORT_ROLES)?;

    let from = parse_date("from", &query.from)?;
    let to = parse_date("to", &query.to)?;
    validate_date_range(from, to)?;
    if (to - from).num_days() > MAX_REPORT_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "to".to_string(),
            min: 0,
            max: MAX_REPORT_DAYS,
        }
        .into());
    }

    let granularity = query.granularity.unwrap_or(Granularity::Day);
    Ok(ApiJson(state.db.reports().sales_buckets(from, to, granularity).await?))
}

async fn pdf(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<Response> {
    require_role(&principal, REPORT_ROLES)?;
    let period = query.period.unwrap_or(SummaryPeriod::Monthly);
    let summary = state.db.reports().summary(period, Utc::now()).await?;

    let pharmacy = state.config.pharmacy_name.clone();
    let filename = format!("summary-{}-{}.pdf", summary.period, summary.from);
    let bytes = tokio::task::spawn_blocking(move || render_summary(&pharmacy, &summary))
        .await
        .map_err(|e| ApiError::internal(format!("PDF task failed: {}", e)))??;

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}
