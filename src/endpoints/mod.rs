//! Root module for all endpoints.

mod categories;
mod fields;
mod offenders;
mod reports;
mod users;

use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::{auth::ActorContext, policy, serve::AppState, Error, Result};

/// Health check endpoint. Returns name and version of the service.
pub(crate) async fn health() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "version": concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
    })))
}

/// Admins and superadmins manage the taxonomy, field schema and offender
/// registry. Checked before any registry mutation is attempted.
fn require_schema_role(actor: &ActorContext) -> Result<()> {
    if policy::can_manage_schema(actor.role) {
        return Ok(());
    }
    Err(Error::forbidden("schema management requires an admin role"))
}

/// Register all API routes.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/_health", get(health))
        .merge(categories::routes())
        .merge(fields::routes())
        .merge(offenders::routes())
        .merge(reports::routes())
        .merge(users::routes())
}
