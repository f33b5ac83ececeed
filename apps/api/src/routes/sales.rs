use axum::extract::State;
use axum::routing::get;
use axum::Router;
use rxdesk_core::validation::{parse_date, validate_date_range};
use rxdesk_core::{Role, Sale};
use rxdesk_db::SaleFilter;
use serde::Deserialize;

use crate::auth::{require_role, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales/my", get(my_sales))
        .route("/sales/all", get(all_sales))
        .route("/sales/{id}", get(get_one))
}

/// Business-date range (`YYYY-MM-DD`, inclusive) and paging.
#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SalesQuery {
    fn into_filter(self, state: &AppState, cashier_id: Option<String>) -> ApiResult<SaleFilter> {
        let clock = state.db.clock();
        let from = self.from.as_deref().map(|d| parse_date("from", d)).transpose()?;
        let to = self.to.as_deref().map(|d| parse_date("to", d)).transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            validate_date_range(from, to)?;
        }

        Ok(SaleFilter {
            cashier_id,
            from: from.map(|d| clock.day_window(d).start),
            to: to.map(|d| clock.day_window(d).end),
            limit: self.limit,
            offset: self.offset,
        })
    }
}

async fn my_sales(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<ApiJson<Vec<Sale>>> {
    let filter = query.into_filter(&state, Some(principal.user_id.clone()))?;
    Ok(ApiJson(state.db.sales().list(&filter).await?))
}

async fn all_sales(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<ApiJson<Vec<Sale>>> {
    require_role(&principal, &[Role::Admin, Role::Finance])?;
    let filter = query.into_filter(&state, None)?;
    Ok(ApiJson(state.db.sales().list(&filter).await?))
}

/// Cashiers get 404 for sales that are not theirs.
async fn get_one(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiJson<Sale>> {
    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .filter(|s| principal.can_view_all_sales() || s.cashier_id == principal.user_id)
        .ok_or_else(|| ApiError::not_found(format!("Sale not found: {}", id)))?;
    Ok(ApiJson(sale))
}
