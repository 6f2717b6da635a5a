//! Store incident report service.
mod auth;
mod config;
mod db;
mod endpoints;
pub mod error;
mod export;
mod filter;
mod metrics;
mod models;
mod policy;
mod registry;
mod reports;
mod serve;
mod stats;

#[cfg(test)]
mod tests;

pub use db::Db;
pub use error::Error;
pub use serve::{run, Result};

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
                                 _        _
 _ __   ___  _ __    ___   _ __ | |_   __| |
| '__| / _ \| '_ \  / _ \ | '__|| __| / _` |
| |   |  __/| |_) || (_) || |   | |_ | (_| |
|_|    \___|| .__/  \___/ |_|    \__| \__,_|
            |_|


This is an incident reporting service for retail stores.

Employees file reports against a store-defined taxonomy;
role-scoped admins triage, annotate and export them.

API routes are under /api/
"
}
