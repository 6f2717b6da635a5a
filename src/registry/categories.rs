//! Taxonomy registry: categories and their ordered subcategory lists.

use std::collections::HashMap;

use anyhow::Context as _;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{Category, CategoryRow},
    Db, Error, Result,
};

pub async fn list(db: &Db) -> Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        r#"SELECT id, name, subcategories, created_at FROM categories ORDER BY name"#,
    )
    .fetch_all(db)
    .await
    .context("failed to list categories")?;

    Ok(rows.into_iter().map(Category::from).collect())
}

pub async fn find(db: &Db, id: &str) -> Result<Option<Category>> {
    let row = sqlx::query_as::<_, CategoryRow>(
        r#"SELECT id, name, subcategories, created_at FROM categories WHERE id = ?"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("failed to query category")?;

    Ok(row.map(Category::from))
}

pub async fn get(db: &Db, id: &str) -> Result<Category> {
    find(db, id).await?.ok_or_else(|| Error::not_found("category"))
}

/// Category id → name, for read-time joins. Reports referencing a deleted
/// category simply miss from the map and display as "Unknown".
pub async fn names_by_id(db: &Db) -> Result<HashMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as(r#"SELECT id, name FROM categories"#)
            .fetch_all(db)
            .await
            .context("failed to load category names")?;

    Ok(rows.into_iter().collect())
}

async fn ensure_unique_name(db: &Db, name: &str, exclude_id: Option<&str>) -> Result<()> {
    let existing: Option<String> =
        sqlx::query_scalar(r#"SELECT id FROM categories WHERE name = ?"#)
            .bind(name)
            .fetch_optional(db)
            .await
            .context("failed to check category name")?;

    match existing {
        Some(id) if Some(id.as_str()) != exclude_id => Err(Error::validation([format!(
            "category \"{name}\" already exists"
        )])),
        _ => Ok(()),
    }
}

pub async fn create(db: &Db, name: &str, subcategories: Vec<String>) -> Result<Category> {
    let name = super::valid_name(name)?;
    ensure_unique_name(db, &name, None).await?;

    // Preserve caller order, drop blanks and exact duplicates.
    let mut subs: Vec<String> = Vec::new();
    for sub in subcategories {
        let sub = sub.trim().to_owned();
        if !sub.is_empty() && !subs.contains(&sub) {
            subs.push(sub);
        }
    }

    let category = Category {
        id: Uuid::new_v4().to_string(),
        name,
        subcategories: subs,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"INSERT INTO categories (id, name, subcategories, created_at) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(serde_json::to_string(&category.subcategories).context("failed to encode subcategories")?)
    .bind(category.created_at)
    .execute(db)
    .await
    .context("failed to create category")?;

    Ok(category)
}

pub async fn rename(db: &Db, id: &str, name: &str) -> Result<Category> {
    let mut category = get(db, id).await?;
    let name = super::valid_name(name)?;
    ensure_unique_name(db, &name, Some(id)).await?;

    sqlx::query(r#"UPDATE categories SET name = ? WHERE id = ?"#)
        .bind(&name)
        .bind(id)
        .execute(db)
        .await
        .context("failed to rename category")?;

    category.name = name;
    Ok(category)
}

/// Append a subcategory if not already present (case-sensitive exact
/// match). A duplicate is a no-op, signalled by the returned flag.
pub async fn add_subcategory(db: &Db, id: &str, name: &str) -> Result<(Category, bool)> {
    let mut category = get(db, id).await?;
    let name = super::valid_name(name)?;

    if category.subcategories.iter().any(|s| *s == name) {
        return Ok((category, false));
    }

    category.subcategories.push(name);
    store_subcategories(db, id, &category.subcategories).await?;
    Ok((category, true))
}

/// Remove a subcategory. Absence is a no-op, signalled by the returned
/// flag. Reports already referencing the name keep it (resolved leniently
/// at display time).
pub async fn remove_subcategory(db: &Db, id: &str, name: &str) -> Result<(Category, bool)> {
    let mut category = get(db, id).await?;

    let before = category.subcategories.len();
    category.subcategories.retain(|s| s != name);
    if category.subcategories.len() == before {
        return Ok((category, false));
    }

    store_subcategories(db, id, &category.subcategories).await?;
    Ok((category, true))
}

async fn store_subcategories(db: &Db, id: &str, subcategories: &[String]) -> Result<()> {
    sqlx::query(r#"UPDATE categories SET subcategories = ? WHERE id = ?"#)
        .bind(serde_json::to_string(subcategories).context("failed to encode subcategories")?)
        .bind(id)
        .execute(db)
        .await
        .context("failed to update subcategories")?;

    Ok(())
}

/// Delete a category. Does not cascade: reports keep their `category_id`
/// and resolve to "Unknown" at read time.
pub async fn delete(db: &Db, id: &str) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM categories WHERE id = ?"#)
        .bind(id)
        .execute(db)
        .await
        .context("failed to delete category")?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("category"));
    }

    Ok(())
}
