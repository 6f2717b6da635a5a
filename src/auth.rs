//! Actor resolution.
//!
//! Sign-in/out and credential storage belong to the external identity
//! provider; it writes `sessions` rows and this service only reads them.
//! Every request resolves a bearer token to an [`ActorContext`] up front —
//! role and store scope are never read from ambient state further in.

use anyhow::{anyhow, Context as _};
use axum::{extract::FromRequestParts, http::header};
use chrono::{DateTime, Utc};
use metrics::counter;

use crate::{models::Role, serve::AppState, Error};

/// The resolved actor for one request: identity plus the two attributes the
/// visibility policy consumes.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub uid: String,
    pub name: String,
    pub role: Role,
    pub store_number: String,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    uid: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    name: String,
    role: String,
    store_number: String,
}

impl FromRequestParts<AppState> for ActorContext {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                counter!(crate::metrics::AUTH_FAILED).increment(1);
                Error::unauthenticated(anyhow!("missing bearer token"))
            })?;

        let session = sqlx::query_as::<_, SessionRow>(
            r#"SELECT uid, expires_at FROM sessions WHERE token = ?"#,
        )
        .bind(token)
        .fetch_optional(&state.db)
        .await
        .context("failed to query session")?
        .ok_or_else(|| {
            counter!(crate::metrics::AUTH_FAILED).increment(1);
            Error::unauthenticated(anyhow!("unknown session token"))
        })?;

        if let Some(expires_at) = session.expires_at {
            if expires_at < Utc::now() {
                counter!(crate::metrics::AUTH_FAILED).increment(1);
                return Err(Error::unauthenticated(anyhow!("session expired")));
            }
        }

        // Profile lookup mirrors the frontend's `users` join: a session with
        // no profile document degrades to an unscoped ordinary user.
        let profile = sqlx::query_as::<_, ProfileRow>(
            r#"SELECT name, role, store_number FROM users WHERE uid = ?"#,
        )
        .bind(&session.uid)
        .fetch_optional(&state.db)
        .await
        .context("failed to query user profile")?;

        Ok(match profile {
            Some(p) => Self {
                uid: session.uid,
                name: p.name,
                role: Role::parse(&p.role),
                store_number: p.store_number,
            },
            None => Self {
                uid: session.uid,
                name: String::new(),
                role: Role::User,
                store_number: String::new(),
            },
        })
    }
}
