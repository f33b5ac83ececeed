use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use rxdesk_core::alerts::Alerts;
use rxdesk_core::ValidationError;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Widest expiring-soon window a request may ask for.
const MAX_ALERT_DAYS: i64 = 3_660;

pub fn router() -> Router<AppState> {
    Router::new().route("/alerts", get(alerts))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    /// Low-stock threshold override.
    pub threshold: Option<i64>,
    /// Expiring-soon window override, in days.
    pub days: Option<i64>,
}

async fn alerts(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiQuery(query): ApiQuery<AlertQuery>,
) -> ApiResult<ApiJson<Alerts>> {
    let mut thresholds = state.config.alert_thresholds();
    if let Some(threshold) = query.threshold {
        if threshold < 0 {
            return Err(ValidationError::negative("threshold").into());
        }
        thresholds.low_stock = threshold;
    }
    if let Some(days) = query.days {
        if days < 0 {
            return Err(ValidationError::negative("days").into());
        }
        if days > MAX_ALERT_DAYS {
            return Err(ValidationError::OutOfRange {
                field: "days".to_string(),
                min: 0,
                max: MAX_ALERT_DAYS,
            }
            .into());
        }
        thresholds.expiring_within_days = days;
    }

    Ok(ApiJson(state.db.reports().alerts(thresholds, Utc::now()).await?))
}
