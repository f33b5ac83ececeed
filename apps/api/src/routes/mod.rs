//! HTTP routes, one module per resource.
//!
//! | Resource      | Reads                | Writes              |
//! |---------------|----------------------|---------------------|
//! | catalog       | any role             | admin               |
//! | checkout      | -                    | admin, cashier      |
//! | sales         | own (cashier) / all  | -                   |
//! | employees     | admin, finance       | admin               |
//! | payroll       | admin, finance       | admin, finance      |
//! | expenses      | admin, finance       | admin, finance      |
//! | reports       | admin, finance       | -                   |

use axum::Router;

use crate::state::AppState;

pub mod alerts;
pub mod auth;
pub mod batches;
pub mod categories;
pub mod checkout;
pub mod employees;
pub mod expenses;
pub mod payroll;
pub mod products;
pub mod reports;
pub mod sales;
pub mod users;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .merge(batches::router())
        .merge(categories::router())
        .merge(alerts::router())
        .merge(checkout::router())
        .merge(sales::router())
        .merge(employees::router())
        .merge(payroll::router())
        .merge(expenses::router())
        .merge(reports::router())
}
