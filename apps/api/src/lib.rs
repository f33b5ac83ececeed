//! # rxdesk API
//!
//! REST boundary for the pharmacy back-office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           rxdesk API Server                             │
//! │                                                                         │
//! │  Client ──► axum Router ──► AuthUser (JWT) ──► handler ──► rxdesk-db   │
//! │               │                                  │                      │
//! │               ├── TraceLayer                     ├── require_role       │
//! │               └── CorsLayer                      └── validation         │
//! │                                                                         │
//! │  Every failure leaves as ApiError ──► { code, message, details? }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `RXDESK_BIND_ADDR` - listen address (default: 0.0.0.0:8080)
//! - `RXDESK_DB_PATH` - SQLite file (default: ./rxdesk.db)
//! - `RXDESK_JWT_SECRET` - HS256 secret
//! - `RXDESK_BUSINESS_UTC_OFFSET` - business day offset, e.g. `+05:00`
//! - `RXDESK_BOOTSTRAP_ADMIN_EMAIL` / `_PASSWORD` - first admin account

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod pdf;
pub mod routes;
pub mod state;

use axum::Router;
use rxdesk_core::validation::{validate_email, validate_name, validate_password};
use rxdesk_core::Role;
use rxdesk_db::{Database, NewUser};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the application router with tracing and CORS layers.
pub fn build_router(state: AppState) -> Router {
    routes::create_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Creates the configured admin account when the database has no users.
///
/// Returns `true` when an account was created.
pub async fn bootstrap_admin(db: &Database, config: &ApiConfig) -> ApiResult<bool> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(false);
    };
    if db.users().count().await? > 0 {
        return Ok(false);
    }

    validate_password(&admin.password)?;
    let user = db
        .users()
        .create(NewUser {
            name: validate_name("name", &admin.name)?,
            email: validate_email(&admin.email)?,
            role: Role::Admin,
            password_hash: auth::hash_password(&admin.password)?,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
    Ok(true)
}
