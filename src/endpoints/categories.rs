use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::ActorContext, models::Category, registry::categories, serve::AppState, Db, Result,
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateCategory {
    name: String,
    #[serde(default)]
    subcategories: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct NameBody {
    name: String,
}

#[derive(Serialize, Debug)]
struct SubcategoryAdded {
    category: Category,
    added: bool,
}

#[derive(Serialize, Debug)]
struct SubcategoryRemoved {
    category: Category,
    removed: bool,
}

/// Everyone with a session may read the taxonomy; the submission form
/// renders from it.
async fn list(_actor: ActorContext, State(db): State<Db>) -> Result<Json<Vec<Category>>> {
    Ok(Json(categories::list(&db).await?))
}

async fn create(
    actor: ActorContext,
    State(db): State<Db>,
    Json(input): Json<CreateCategory>,
) -> Result<Json<Category>> {
    super::require_schema_role(&actor)?;
    Ok(Json(
        categories::create(&db, &input.name, input.subcategories).await?,
    ))
}

async fn rename(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<NameBody>,
) -> Result<Json<Category>> {
    super::require_schema_role(&actor)?;
    Ok(Json(categories::rename(&db, &id, &input.name).await?))
}

async fn remove(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    super::require_schema_role(&actor)?;
    categories::delete(&db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_subcategory(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<NameBody>,
) -> Result<Json<SubcategoryAdded>> {
    super::require_schema_role(&actor)?;
    let (category, added) = categories::add_subcategory(&db, &id, &input.name).await?;
    Ok(Json(SubcategoryAdded { category, added }))
}

async fn remove_subcategory(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<NameBody>,
) -> Result<Json<SubcategoryRemoved>> {
    super::require_schema_role(&actor)?;
    let (category, removed) = categories::remove_subcategory(&db, &id, &input.name).await?;
    Ok(Json(SubcategoryRemoved { category, removed }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/{id}", put(rename).delete(remove))
        .route(
            "/categories/{id}/subcategories",
            post(add_subcategory).delete(remove_subcategory),
        )
}
