//! User profile administration. Superadmin only; ordinary admins manage
//! reports, not people. Credentials never pass through here — the identity
//! provider owns them.

use anyhow::Context as _;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::ActorContext,
    models::{Role, UserProfile, UserRow},
    policy,
    serve::AppState,
    Db, Error, Result,
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UserPatch {
    name: Option<String>,
    email: Option<String>,
    store_number: Option<String>,
    role: Option<Role>,
}

fn require_user_admin(actor: &ActorContext) -> Result<()> {
    if policy::can_manage_users(actor.role) {
        return Ok(());
    }
    Err(Error::forbidden("user management requires superadmin"))
}

async fn find(db: &Db, uid: &str) -> Result<UserProfile> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"SELECT uid, name, email, role, store_number FROM users WHERE uid = ?"#,
    )
    .bind(uid)
    .fetch_optional(db)
    .await
    .context("failed to query user")?;

    row.map(UserProfile::from)
        .ok_or_else(|| Error::not_found("user"))
}

async fn list(actor: ActorContext, State(db): State<Db>) -> Result<Json<Vec<UserProfile>>> {
    require_user_admin(&actor)?;

    let rows = sqlx::query_as::<_, UserRow>(
        r#"SELECT uid, name, email, role, store_number FROM users ORDER BY name"#,
    )
    .fetch_all(&db)
    .await
    .context("failed to list users")?;

    Ok(Json(rows.into_iter().map(UserProfile::from).collect()))
}

async fn update(
    actor: ActorContext,
    State(db): State<Db>,
    Path(uid): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserProfile>> {
    require_user_admin(&actor)?;

    let mut profile = find(&db, &uid).await?;
    if let Some(name) = patch.name {
        profile.name = name.trim().to_owned();
    }
    if let Some(email) = patch.email {
        profile.email = email.trim().to_owned();
    }
    if let Some(store_number) = patch.store_number {
        profile.store_number = store_number.trim().to_owned();
    }
    if let Some(role) = patch.role {
        profile.role = role;
    }

    sqlx::query(
        r#"UPDATE users SET name = ?, email = ?, store_number = ?, role = ? WHERE uid = ?"#,
    )
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.store_number)
    .bind(profile.role.as_str())
    .bind(&uid)
    .execute(&db)
    .await
    .context("failed to update user")?;

    Ok(Json(profile))
}

async fn remove(
    actor: ActorContext,
    State(db): State<Db>,
    Path(uid): Path<String>,
) -> Result<StatusCode> {
    require_user_admin(&actor)?;

    let target = find(&db, &uid).await?;
    if target.role == Role::Superadmin {
        return Err(Error::forbidden("cannot delete a superadmin"));
    }
    if target.uid == actor.uid {
        return Err(Error::forbidden("cannot delete yourself"));
    }

    sqlx::query(r#"DELETE FROM users WHERE uid = ?"#)
        .bind(&uid)
        .execute(&db)
        .await
        .context("failed to delete user")?;

    // Revoke their sessions so the deleted profile cannot keep acting.
    sqlx::query(r#"DELETE FROM sessions WHERE uid = ?"#)
        .bind(&uid)
        .execute(&db)
        .await
        .context("failed to revoke sessions")?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list))
        .route("/users/{uid}", put(update).delete(remove))
}
