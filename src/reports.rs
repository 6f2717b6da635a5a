//! Report lifecycle: submission, admin mutation, status toggling, deletion
//! and visibility-scoped loading.
//!
//! Two states only (Pending/Complete), toggled any number of times. Every
//! admin mutation stamps `updated_at`; submission never does. Last write
//! wins — there are no optimistic-concurrency tokens at this layer.

use std::collections::BTreeMap;

use anyhow::Context as _;
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::ActorContext,
    models::{Report, ReportRow, ReportStatus, Role},
    policy, registry, Db, Error, Result,
};

/// Fallback display name for a report whose category has been deleted.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// A submission, as received from the form.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub offender: String,
    /// Defaults to the submitter's assigned store.
    #[serde(default)]
    pub store_number: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// An admin merge patch. Unspecified keys stay untouched; the scope and
/// provenance columns (`store_number`, reporter identity, `created_at`)
/// are never rewritten.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub admin_comment: Option<String>,
    pub category_id: Option<String>,
    pub subcategory: Option<String>,
    pub offender: Option<String>,
    pub fields: Option<BTreeMap<String, String>>,
}

/// Validate and persist a new report. All validation failures are reported
/// together, and nothing is persisted unless every check passes.
pub async fn submit(db: &Db, actor: &ActorContext, input: NewReport) -> Result<Report> {
    let mut problems = Vec::new();

    let store_number = input
        .store_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(actor.store_number.trim())
        .to_owned();
    if store_number.is_empty() {
        problems.push("store number must not be blank".to_owned());
    }

    let category = registry::categories::find(db, &input.category_id).await?;
    let category = match category {
        Some(c) => Some(c),
        None => {
            problems.push("category does not exist".to_owned());
            None
        }
    };

    let subcategory = input.subcategory.trim().to_owned();
    if subcategory.is_empty() {
        problems.push("subcategory must not be blank".to_owned());
    } else if let Some(category) = &category {
        if !category.subcategories.iter().any(|s| *s == subcategory) {
            problems.push(format!(
                "subcategory \"{subcategory}\" is not part of category \"{}\"",
                category.name
            ));
        }
    }

    if !problems.is_empty() {
        return Err(Error::validation(problems));
    }

    let report = Report {
        id: Uuid::new_v4().to_string(),
        category_id: input.category_id,
        subcategory,
        offender: input.offender.trim().to_owned(),
        store_number,
        fields: input.fields,
        status: ReportStatus::Pending,
        admin_comment: String::new(),
        reporter_id: actor.uid.clone(),
        reporter_name: actor.name.clone(),
        created_at: Utc::now(),
        updated_at: None,
        category_name: category.map(|c| c.name),
    };

    sqlx::query(
        r#"
        INSERT INTO reports
            (id, category_id, subcategory, offender, store_number, fields,
             status, admin_comment, reporter_id, reporter_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(&report.id)
    .bind(&report.category_id)
    .bind(&report.subcategory)
    .bind(&report.offender)
    .bind(&report.store_number)
    .bind(serde_json::to_string(&report.fields).context("failed to encode fields")?)
    .bind(report.status.as_str())
    .bind(&report.admin_comment)
    .bind(&report.reporter_id)
    .bind(&report.reporter_name)
    .bind(report.created_at)
    .execute(db)
    .await
    .context("failed to create report")?;

    counter!(crate::metrics::REPORT_SUBMITTED).increment(1);

    Ok(report)
}

const SELECT_REPORT: &str = r#"
    SELECT id, category_id, subcategory, offender, store_number, fields,
           status, admin_comment, reporter_id, reporter_name, created_at, updated_at
    FROM reports
"#;

/// Load every report the actor is allowed to see, category names joined.
/// The scope predicate runs before any caller-supplied filter ever will.
pub async fn load_visible(db: &Db, actor: &ActorContext) -> Result<Vec<Report>> {
    let rows: Vec<ReportRow> = match actor.role {
        Role::Superadmin => sqlx::query_as(SELECT_REPORT)
            .fetch_all(db)
            .await
            .context("failed to load reports")?,
        Role::Admin => {
            sqlx::query_as(&format!("{SELECT_REPORT} WHERE TRIM(store_number) = ?"))
                .bind(actor.store_number.trim())
                .fetch_all(db)
                .await
                .context("failed to load store reports")?
        }
        Role::User => sqlx::query_as(&format!("{SELECT_REPORT} WHERE reporter_id = ?"))
            .bind(&actor.uid)
            .fetch_all(db)
            .await
            .context("failed to load own reports")?,
    };

    let names = registry::categories::names_by_id(db).await?;
    Ok(rows
        .into_iter()
        .map(|row| join_category_name(row.into(), &names))
        .collect())
}

fn join_category_name(
    mut report: Report,
    names: &std::collections::HashMap<String, String>,
) -> Report {
    report.category_name = Some(
        names
            .get(&report.category_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_owned()),
    );
    report
}

async fn find(db: &Db, id: &str) -> Result<Option<Report>> {
    let row: Option<ReportRow> = sqlx::query_as(&format!("{SELECT_REPORT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to query report")?;

    let Some(row) = row else { return Ok(None) };
    let names = registry::categories::names_by_id(db).await?;
    Ok(Some(join_category_name(row.into(), &names)))
}

/// Fetch one report, enforcing visibility.
pub async fn get_visible(db: &Db, actor: &ActorContext, id: &str) -> Result<Report> {
    let report = find(db, id).await?.ok_or_else(|| Error::not_found("report"))?;
    if !policy::can_view(actor, &report) {
        return Err(Error::forbidden("report is outside your scope"));
    }
    Ok(report)
}

/// Authorize a mutation on a report, before anything is written.
async fn get_mutable(db: &Db, actor: &ActorContext, id: &str) -> Result<Report> {
    let report = find(db, id).await?.ok_or_else(|| Error::not_found("report"))?;
    if !policy::can_mutate(actor, &report) {
        return Err(Error::forbidden("not allowed to modify this report"));
    }
    Ok(report)
}

/// Apply an admin merge patch and stamp `updated_at`.
pub async fn update_admin_fields(
    db: &Db,
    actor: &ActorContext,
    id: &str,
    patch: ReportPatch,
) -> Result<Report> {
    let mut report = get_mutable(db, actor, id).await?;

    if let Some(status) = patch.status {
        report.status = status;
    }
    if let Some(admin_comment) = patch.admin_comment {
        report.admin_comment = admin_comment;
    }
    if let Some(category_id) = patch.category_id {
        report.category_id = category_id;
    }
    if let Some(subcategory) = patch.subcategory {
        report.subcategory = subcategory;
    }
    if let Some(offender) = patch.offender {
        report.offender = offender;
    }
    if let Some(fields) = patch.fields {
        report.fields = fields;
    }
    report.updated_at = Some(Utc::now());

    store_mutation(db, &report).await?;
    counter!(crate::metrics::REPORT_UPDATED).increment(1);

    // The category may have been re-pointed; resolve the name again.
    let names = registry::categories::names_by_id(db).await?;
    Ok(join_category_name(report, &names))
}

/// Flip Pending↔Complete. The common one-click case of
/// [`update_admin_fields`], exposed separately.
pub async fn toggle_status(db: &Db, actor: &ActorContext, id: &str) -> Result<Report> {
    let mut report = get_mutable(db, actor, id).await?;

    report.status = report.status.toggled();
    report.updated_at = Some(Utc::now());

    store_mutation(db, &report).await?;
    counter!(crate::metrics::REPORT_TOGGLED).increment(1);

    Ok(report)
}

async fn store_mutation(db: &Db, report: &Report) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE reports
            SET status = ?, admin_comment = ?, category_id = ?, subcategory = ?,
                offender = ?, fields = ?, updated_at = ?
            WHERE id = ?
        "#,
    )
    .bind(report.status.as_str())
    .bind(&report.admin_comment)
    .bind(&report.category_id)
    .bind(&report.subcategory)
    .bind(&report.offender)
    .bind(serde_json::to_string(&report.fields).context("failed to encode fields")?)
    .bind(report.updated_at)
    .bind(&report.id)
    .execute(db)
    .await
    .context("failed to update report")?;

    Ok(())
}

/// Hard delete, irreversible. Only ever reached through an explicit DELETE
/// request — never as a side effect of a read.
pub async fn delete(db: &Db, actor: &ActorContext, id: &str) -> Result<()> {
    get_mutable(db, actor, id).await?;

    sqlx::query(r#"DELETE FROM reports WHERE id = ?"#)
        .bind(id)
        .execute(db)
        .await
        .context("failed to delete report")?;

    counter!(crate::metrics::REPORT_DELETED).increment(1);

    Ok(())
}
