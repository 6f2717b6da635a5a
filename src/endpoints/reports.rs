use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    auth::ActorContext,
    export::{self, ExportRow},
    filter::{self, FilterSpec},
    models::{Report, ReportStatus},
    reports::{self, NewReport, ReportPatch},
    serve::AppState,
    stats::{self, ReportStats},
    Db, Result,
};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Filter and pagination query parameters. Absent or empty values are
/// unconstrained.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct ListParams {
    text: Option<String>,
    status: Option<ReportStatus>,
    category_id: Option<String>,
    store_number: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    page: usize,
    page_size: Option<usize>,
}

impl ListParams {
    fn spec(&self) -> FilterSpec {
        FilterSpec {
            text: self.text.clone(),
            status: self.status,
            category_id: self.category_id.clone(),
            store_number: self.store_number.clone(),
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    reports: Vec<Report>,
    /// Size of the filtered set before slicing, so clients can lay out
    /// pagination (and reset to page 0 when they change a predicate).
    total: usize,
    page: usize,
    page_size: usize,
}

async fn list(
    actor: ActorContext,
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let visible = reports::load_visible(&db, &actor).await?;
    let filtered = filter::apply(&params.spec(), visible);

    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = filter::paginate(&filtered, params.page, page_size).to_vec();

    Ok(Json(ListResponse {
        total: filtered.len(),
        page: params.page,
        page_size,
        reports: page,
    }))
}

async fn submit(
    actor: ActorContext,
    State(db): State<Db>,
    Json(input): Json<NewReport>,
) -> Result<Json<Report>> {
    Ok(Json(reports::submit(&db, &actor, input).await?))
}

async fn get_one(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Report>> {
    Ok(Json(reports::get_visible(&db, &actor, &id).await?))
}

async fn patch(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<ReportPatch>,
) -> Result<Json<Report>> {
    Ok(Json(
        reports::update_admin_fields(&db, &actor, &id, input).await?,
    ))
}

async fn toggle(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Report>> {
    Ok(Json(reports::toggle_status(&db, &actor, &id).await?))
}

async fn remove(
    actor: ActorContext,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    reports::delete(&db, &actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The export boundary: the filtered, scoped list flattened for the
/// external renderer. Unpaginated on purpose.
async fn export(
    actor: ActorContext,
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ExportRow>>> {
    let visible = reports::load_visible(&db, &actor).await?;
    let filtered = filter::apply(&params.spec(), visible);
    Ok(Json(export::rows(filtered)))
}

async fn report_stats(actor: ActorContext, State(db): State<Db>) -> Result<Json<ReportStats>> {
    let visible = reports::load_visible(&db, &actor).await?;
    Ok(Json(stats::aggregate(&visible)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list).post(submit))
        .route("/reports/export", get(export))
        .route("/reports/stats", get(report_stats))
        .route("/reports/{id}", get(get_one).patch(patch).delete(remove))
        .route("/reports/{id}/toggle", post(toggle))
}
