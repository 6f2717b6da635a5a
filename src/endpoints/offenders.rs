use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::ActorContext, models::Offender, registry::offenders, serve::AppState, Db, Result,
};

#[derive(Deserialize, Debug)]
struct NameBody {
    name: String,
}

async fn list(_actor: ActorContext, State(db): State<Db>) -> Result<Json<Vec<Offender>>> {
    Ok(Json(offenders::list(&db).await?))
}

async fn create(
    actor: ActorContext,
    State(db): State<Db>,
    Json(input): Json<NameBody>,
) -> Result<Json<Offender>> {
    super::require_schema_role(&actor)?;
    Ok(Json(offenders::create(&db, &input.name).await?))
}

async fn rename(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<NameBody>,
) -> Result<Json<Offender>> {
    super::require_schema_role(&actor)?;
    Ok(Json(offenders::rename(&db, &id, &input.name).await?))
}

async fn remove(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    super::require_schema_role(&actor)?;
    offenders::delete(&db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/offenders", get(list).post(create))
        .route("/offenders/{id}", put(rename).delete(remove))
}
