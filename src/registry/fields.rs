//! Field schema registry.
//!
//! Definitions are keyed by *name* inside every report's `fields` map, so a
//! rename detaches historic values from the new name. That trade-off is
//! load-bearing (see DESIGN.md) and must not be "fixed" here.

use anyhow::Context as _;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{FieldDefinition, FieldRow, FieldType},
    Db, Error, Result,
};

pub async fn list(db: &Db) -> Result<Vec<FieldDefinition>> {
    let rows = sqlx::query_as::<_, FieldRow>(
        r#"SELECT id, name, field_type, options, created_at FROM fields ORDER BY name"#,
    )
    .fetch_all(db)
    .await
    .context("failed to list fields")?;

    Ok(rows.into_iter().map(FieldDefinition::from).collect())
}

pub async fn get(db: &Db, id: &str) -> Result<FieldDefinition> {
    let row = sqlx::query_as::<_, FieldRow>(
        r#"SELECT id, name, field_type, options, created_at FROM fields WHERE id = ?"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("failed to query field")?;

    row.map(FieldDefinition::from)
        .ok_or_else(|| Error::not_found("field"))
}

/// Validate one definition in a single pass, reporting every problem at
/// once. Options only exist for `select`; other types persist with none.
fn validate(
    name: &str,
    field_type: FieldType,
    options: Vec<String>,
    duplicate: bool,
) -> Result<(String, Vec<String>)> {
    let mut problems = Vec::new();

    let name = name.trim().to_owned();
    if name.is_empty() {
        problems.push("name must not be blank".to_owned());
    } else if duplicate {
        problems.push(format!("field \"{name}\" already exists"));
    }

    let options: Vec<String> = match field_type {
        FieldType::Select => {
            let options: Vec<String> = options
                .into_iter()
                .map(|o| o.trim().to_owned())
                .filter(|o| !o.is_empty())
                .collect();
            if options.is_empty() {
                problems.push("select fields need at least one option".to_owned());
            }
            options
        }
        _ => Vec::new(),
    };

    if !problems.is_empty() {
        return Err(Error::validation(problems));
    }

    Ok((name, options))
}

async fn name_taken(db: &Db, name: &str, exclude_id: Option<&str>) -> Result<bool> {
    let existing: Option<String> = sqlx::query_scalar(r#"SELECT id FROM fields WHERE name = ?"#)
        .bind(name.trim())
        .fetch_optional(db)
        .await
        .context("failed to check field name")?;

    Ok(matches!(existing, Some(id) if Some(id.as_str()) != exclude_id))
}

pub async fn create(
    db: &Db,
    name: &str,
    field_type: FieldType,
    options: Vec<String>,
) -> Result<FieldDefinition> {
    let duplicate = name_taken(db, name, None).await?;
    let (name, options) = validate(name, field_type, options, duplicate)?;

    let field = FieldDefinition {
        id: Uuid::new_v4().to_string(),
        name,
        field_type,
        options,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"INSERT INTO fields (id, name, field_type, options, created_at) VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&field.id)
    .bind(&field.name)
    .bind(field.field_type.as_str())
    .bind(serde_json::to_string(&field.options).context("failed to encode options")?)
    .bind(field.created_at)
    .execute(db)
    .await
    .context("failed to create field")?;

    Ok(field)
}

pub async fn update(
    db: &Db,
    id: &str,
    name: &str,
    field_type: FieldType,
    options: Vec<String>,
) -> Result<FieldDefinition> {
    let mut field = get(db, id).await?;
    let duplicate = name_taken(db, name, Some(id)).await?;
    let (name, options) = validate(name, field_type, options, duplicate)?;

    sqlx::query(r#"UPDATE fields SET name = ?, field_type = ?, options = ? WHERE id = ?"#)
        .bind(&name)
        .bind(field_type.as_str())
        .bind(serde_json::to_string(&options).context("failed to encode options")?)
        .bind(id)
        .execute(db)
        .await
        .context("failed to update field")?;

    field.name = name;
    field.field_type = field_type;
    field.options = options;
    Ok(field)
}

/// Delete a definition. No cascade: reports keep stale keys in their
/// `fields` maps as display-only data; they never reappear in new forms.
pub async fn delete(db: &Db, id: &str) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM fields WHERE id = ?"#)
        .bind(id)
        .execute(db)
        .await
        .context("failed to delete field")?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("field"));
    }

    Ok(())
}
