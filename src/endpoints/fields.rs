use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::ActorContext,
    models::{FieldDefinition, FieldType},
    registry::fields,
    serve::AppState,
    Db, Result,
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FieldBody {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    options: Vec<String>,
}

/// Everyone with a session may read the schema; the submission form
/// renders one input per definition.
async fn list(_actor: ActorContext, State(db): State<Db>) -> Result<Json<Vec<FieldDefinition>>> {
    Ok(Json(fields::list(&db).await?))
}

async fn create(
    actor: ActorContext,
    State(db): State<Db>,
    Json(input): Json<FieldBody>,
) -> Result<Json<FieldDefinition>> {
    super::require_schema_role(&actor)?;
    Ok(Json(
        fields::create(&db, &input.name, input.field_type, input.options).await?,
    ))
}

async fn update(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<FieldBody>,
) -> Result<Json<FieldDefinition>> {
    super::require_schema_role(&actor)?;
    Ok(Json(
        fields::update(&db, &id, &input.name, input.field_type, input.options).await?,
    ))
}

async fn remove(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    super::require_schema_role(&actor)?;
    fields::delete(&db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fields", get(list).post(create))
        .route("/fields/{id}", put(update).delete(remove))
}
