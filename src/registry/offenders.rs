//! Known-offender registry. A label list only: reports copy the *name*,
//! so registry edits never touch existing reports.

use anyhow::Context as _;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{Offender, OffenderRow},
    Db, Error, Result,
};

pub async fn list(db: &Db) -> Result<Vec<Offender>> {
    let rows = sqlx::query_as::<_, OffenderRow>(
        r#"SELECT id, name, created_at FROM offenders ORDER BY name"#,
    )
    .fetch_all(db)
    .await
    .context("failed to list offenders")?;

    Ok(rows.into_iter().map(Offender::from).collect())
}

async fn ensure_unique_name(db: &Db, name: &str, exclude_id: Option<&str>) -> Result<()> {
    let existing: Option<String> =
        sqlx::query_scalar(r#"SELECT id FROM offenders WHERE name = ?"#)
            .bind(name)
            .fetch_optional(db)
            .await
            .context("failed to check offender name")?;

    match existing {
        Some(id) if Some(id.as_str()) != exclude_id => Err(Error::validation([format!(
            "offender \"{name}\" already exists"
        )])),
        _ => Ok(()),
    }
}

pub async fn create(db: &Db, name: &str) -> Result<Offender> {
    let name = super::valid_name(name)?;
    ensure_unique_name(db, &name, None).await?;

    let offender = Offender {
        id: Uuid::new_v4().to_string(),
        name,
        created_at: Utc::now(),
    };

    sqlx::query(r#"INSERT INTO offenders (id, name, created_at) VALUES (?, ?, ?)"#)
        .bind(&offender.id)
        .bind(&offender.name)
        .bind(offender.created_at)
        .execute(db)
        .await
        .context("failed to create offender")?;

    Ok(offender)
}

pub async fn rename(db: &Db, id: &str, name: &str) -> Result<Offender> {
    let name = super::valid_name(name)?;
    ensure_unique_name(db, &name, Some(id)).await?;

    let result = sqlx::query(r#"UPDATE offenders SET name = ? WHERE id = ?"#)
        .bind(&name)
        .bind(id)
        .execute(db)
        .await
        .context("failed to rename offender")?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("offender"));
    }

    let row = sqlx::query_as::<_, OffenderRow>(
        r#"SELECT id, name, created_at FROM offenders WHERE id = ?"#,
    )
    .bind(id)
    .fetch_one(db)
    .await
    .context("failed to reload offender")?;

    Ok(row.into())
}

pub async fn delete(db: &Db, id: &str) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM offenders WHERE id = ?"#)
        .bind(id)
        .execute(db)
        .await
        .context("failed to delete offender")?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("offender"));
    }

    Ok(())
}
