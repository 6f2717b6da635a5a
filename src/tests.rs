//! Testing utilities for the report service.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    db::{self, Db},
    serve::{app, AppState},
};

/// A temporary test directory that will be cleaned up when the struct is dropped.
struct TempDir {
    /// The path to the directory.
    path: PathBuf,
}

impl TempDir {
    /// Create a new temporary directory.
    fn new() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("reportd-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Get the path to the directory.
    fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// A seeded profile plus the session token that authenticates as it.
pub(crate) struct TestUser {
    pub uid: String,
    pub token: String,
}

/// Test state for the application.
pub(crate) struct TestState {
    /// The temporary directory for test data.
    _temp_dir: TempDir,
    /// The address the test server is listening on.
    address: SocketAddr,
    /// Direct pool handle for seeding.
    db: Db,
    /// The HTTP client.
    client: reqwest::Client,
}

impl TestState {
    /// Create a new test state and start the app on an ephemeral port.
    /// Every test gets its own server and database; the spawned server task
    /// lives on the test's runtime and dies with it.
    pub(crate) async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;

        // Find a free port
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))?;
        let address = listener.local_addr()?;
        drop(listener);

        let db_url = format!("sqlite://{}/test.db", temp_dir.path().display());
        let db = db::establish(&db_url)
            .await
            .context("failed to set up test database")?;

        let state = AppState {
            config: AppConfig {
                listen_address: Some(address),
                db: db_url,
                metrics: None,
            },
            db: db.clone(),
        };

        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&address)
                .await
                .context("failed to bind address")?;
            axum::serve(listener, app(state).into_make_service())
                .await
                .context("failed to serve app")
        });

        // Give the server a moment to start
        tokio::time::sleep(Duration::from_millis(200)).await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            _temp_dir: temp_dir,
            address,
            db,
            client,
        })
    }

    /// Seed a profile and a session for it, the way the external identity
    /// provider would, and return the bearer token.
    pub async fn seed_user(&self, role: &str, store_number: &str) -> Result<TestUser> {
        let uid = Uuid::new_v4().to_string();
        let token = Uuid::new_v4().to_string();

        sqlx::query(
            r#"INSERT INTO users (uid, name, email, role, store_number) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&uid)
        .bind(format!("Test {role}"))
        .bind(format!("{uid}@example.com"))
        .bind(role)
        .bind(store_number)
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"INSERT INTO sessions (token, uid, created_at, expires_at) VALUES (?, ?, ?, NULL)"#,
        )
        .bind(&token)
        .bind(&uid)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(TestUser { uid, token })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/api{}", self.address, path)
    }

    pub async fn get(&self, token: &str, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    pub async fn post(&self, token: &str, path: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn put(&self, token: &str, path: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn patch(&self, token: &str, path: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn delete(&self, token: &str, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    pub async fn delete_json(
        &self,
        token: &str,
        path: &str,
        body: &Value,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }
}

/// Create a category with subcategories and return its id.
async fn create_category(
    state: &TestState,
    token: &str,
    name: &str,
    subcategories: &[&str],
) -> Result<String> {
    let response = state
        .post(
            token,
            "/categories",
            &json!({ "name": name, "subcategories": subcategories }),
        )
        .await?;
    anyhow::ensure!(
        response.status().is_success(),
        "category creation failed: {}",
        response.status()
    );
    let body: Value = response.json().await?;
    Ok(body["id"].as_str().context("category has no id")?.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_lifecycle_scenario() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let admin12 = state.seed_user("admin", "12").await?;
        let admin99 = state.seed_user("admin", "99").await?;
        let submitter = state.seed_user("user", "12").await?;

        let category_id = create_category(
            state,
            &superadmin.token,
            "Theft",
            &["Shoplifting", "Employee"],
        )
        .await?;

        let response = state
            .post(
                &superadmin.token,
                "/fields",
                &json!({ "name": "Details", "type": "text" }),
            )
            .await?;
        assert!(response.status().is_success());

        // Submit as an ordinary store employee.
        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({
                    "categoryId": category_id,
                    "subcategory": "Shoplifting",
                    "storeNumber": "12",
                    "fields": { "Details": "caught on camera" },
                }),
            )
            .await?;
        assert!(response.status().is_success());
        let report: Value = response.json().await?;
        let report_id = report["id"].as_str().context("report has no id")?.to_owned();

        assert_eq!(report["status"], "Pending");
        assert!(report["updatedAt"].is_null());
        assert_eq!(report["categoryName"], "Theft");
        assert_eq!(report["storeNumber"], "12");

        // Toggle twice: its own inverse, and each application stamps updatedAt.
        let response = state
            .post(&admin12.token, &format!("/reports/{report_id}/toggle"), &json!({}))
            .await?;
        let toggled: Value = response.json().await?;
        assert_eq!(toggled["status"], "Complete");
        assert!(!toggled["updatedAt"].is_null());

        let response = state
            .post(&admin12.token, &format!("/reports/{report_id}/toggle"), &json!({}))
            .await?;
        let toggled_back: Value = response.json().await?;
        assert_eq!(toggled_back["status"], "Pending");

        // Annotate.
        let response = state
            .patch(
                &admin12.token,
                &format!("/reports/{report_id}"),
                &json!({ "adminComment": "reviewed", "status": "Complete" }),
            )
            .await?;
        let annotated: Value = response.json().await?;
        assert_eq!(annotated["adminComment"], "reviewed");
        assert_eq!(annotated["status"], "Complete");
        assert!(!annotated["updatedAt"].is_null());

        // An admin of another store must not see it, listed or fetched.
        let response = state.get(&admin99.token, "/reports").await?;
        let listing: Value = response.json().await?;
        let ids: Vec<&str> = listing["reports"]
            .as_array()
            .context("reports not an array")?
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert!(!ids.contains(&report_id.as_str()));

        let response = state
            .get(&admin99.token, &format!("/reports/{report_id}"))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        // The superadmin sees it.
        let response = state.get(&superadmin.token, "/reports").await?;
        let listing: Value = response.json().await?;
        let ids: Vec<&str> = listing["reports"]
            .as_array()
            .context("reports not an array")?
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert!(ids.contains(&report_id.as_str()));

        Ok(())
    }

    #[tokio::test]
    async fn subcategory_add_is_idempotent() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;

        let category_id =
            create_category(state, &superadmin.token, "Vandalism", &["Graffiti"]).await?;

        let response = state
            .post(
                &superadmin.token,
                &format!("/categories/{category_id}/subcategories"),
                &json!({ "name": "Broken Window" }),
            )
            .await?;
        let body: Value = response.json().await?;
        assert_eq!(body["added"], true);

        let response = state
            .post(
                &superadmin.token,
                &format!("/categories/{category_id}/subcategories"),
                &json!({ "name": "Broken Window" }),
            )
            .await?;
        let body: Value = response.json().await?;
        assert_eq!(body["added"], false);

        let occurrences = body["category"]["subcategories"]
            .as_array()
            .context("subcategories not an array")?
            .iter()
            .filter(|s| *s == "Broken Window")
            .count();
        assert_eq!(occurrences, 1);

        // Removal signals the same way.
        let response = state
            .delete_json(
                &superadmin.token,
                &format!("/categories/{category_id}/subcategories"),
                &json!({ "name": "Broken Window" }),
            )
            .await?;
        let body: Value = response.json().await?;
        assert_eq!(body["removed"], true);

        Ok(())
    }

    #[tokio::test]
    async fn deleted_category_resolves_to_unknown() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let submitter = state.seed_user("user", "31").await?;

        let category_id =
            create_category(state, &superadmin.token, "Slip Hazard", &["Wet Floor"]).await?;

        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({
                    "categoryId": category_id,
                    "subcategory": "Wet Floor",
                }),
            )
            .await?;
        assert!(response.status().is_success());
        let report: Value = response.json().await?;
        let report_id = report["id"].as_str().context("report has no id")?.to_owned();

        let response = state
            .delete(&superadmin.token, &format!("/categories/{category_id}"))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        // Reading the report must not fail; the name degrades.
        let response = state
            .get(&superadmin.token, &format!("/reports/{report_id}"))
            .await?;
        assert!(response.status().is_success());
        let report: Value = response.json().await?;
        assert_eq!(report["categoryName"], "Unknown");
        assert_eq!(report["categoryId"], category_id);

        Ok(())
    }

    #[tokio::test]
    async fn submit_validation_reports_every_problem() -> Result<()> {
        let state = &TestState::new().await?;
        let submitter = state.seed_user("user", "").await?;

        // Unknown category, blank subcategory, no store anywhere.
        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({ "categoryId": "nope", "subcategory": "" }),
            )
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        Ok(())
    }

    #[tokio::test]
    async fn subcategory_membership_is_enforced_on_submit() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let submitter = state.seed_user("user", "44").await?;

        let category_id =
            create_category(state, &superadmin.token, "Fraud", &["Refund"]).await?;

        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({ "categoryId": category_id, "subcategory": "Coupon" }),
            )
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        Ok(())
    }

    #[tokio::test]
    async fn select_fields_require_options() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;

        let response = state
            .post(
                &superadmin.token,
                "/fields",
                &json!({ "name": "Region", "type": "select", "options": [] }),
            )
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        // With options it goes through, and non-select types drop them.
        let response = state
            .post(
                &superadmin.token,
                "/fields",
                &json!({ "name": "Region", "type": "select", "options": ["North", "South"] }),
            )
            .await?;
        assert!(response.status().is_success());
        let field: Value = response.json().await?;
        let field_id = field["id"].as_str().context("field has no id")?.to_owned();

        let response = state
            .put(
                &superadmin.token,
                &format!("/fields/{field_id}"),
                &json!({ "name": "Region", "type": "text", "options": ["stale"] }),
            )
            .await?;
        assert!(response.status().is_success());
        let field: Value = response.json().await?;
        assert_eq!(field["options"], json!([]));

        Ok(())
    }

    #[tokio::test]
    async fn listing_requires_a_resolved_session() -> Result<()> {
        let state = &TestState::new().await?;

        // No token at all.
        let response = state
            .client
            .get(state.url("/reports"))
            .send()
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        // A token nobody issued.
        let response = state.get("not-a-session", "/reports").await?;
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        Ok(())
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() -> Result<()> {
        let state = &TestState::new().await?;
        let user = state.seed_user("user", "5").await?;

        let token = Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO sessions (token, uid, created_at, expires_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(&token)
        .bind(&user.uid)
        .bind(Utc::now() - chrono::Duration::days(2))
        .bind(Utc::now() - chrono::Duration::days(1))
        .execute(&state.db)
        .await?;

        let response = state.get(&token, "/reports").await?;
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        Ok(())
    }

    #[tokio::test]
    async fn submitters_cannot_mutate_their_own_reports() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let submitter = state.seed_user("user", "63").await?;

        let category_id =
            create_category(state, &superadmin.token, "Harassment", &["Customer"]).await?;

        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({ "categoryId": category_id, "subcategory": "Customer" }),
            )
            .await?;
        let report: Value = response.json().await?;
        let report_id = report["id"].as_str().context("report has no id")?.to_owned();

        // Visible to its reporter...
        let response = state
            .get(&submitter.token, &format!("/reports/{report_id}"))
            .await?;
        assert!(response.status().is_success());

        // ...but read-only for them.
        let response = state
            .patch(
                &submitter.token,
                &format!("/reports/{report_id}"),
                &json!({ "adminComment": "self-serve" }),
            )
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let response = state
            .post(&submitter.token, &format!("/reports/{report_id}/toggle"), &json!({}))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let response = state
            .delete(&submitter.token, &format!("/reports/{report_id}"))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        Ok(())
    }

    #[tokio::test]
    async fn admin_cannot_reach_other_stores_through_filters() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let admin12 = state.seed_user("admin", "112").await?;
        let reporter7 = state.seed_user("user", "107").await?;

        let category_id =
            create_category(state, &superadmin.token, "Burglary", &["After Hours"]).await?;

        let response = state
            .post(
                &reporter7.token,
                "/reports",
                &json!({ "categoryId": category_id, "subcategory": "After Hours" }),
            )
            .await?;
        let report: Value = response.json().await?;
        let foreign_id = report["id"].as_str().context("report has no id")?.to_owned();

        // Even asking for the other store by number yields nothing: the
        // visibility scope runs before the filter does.
        let response = state
            .get(&admin12.token, "/reports?storeNumber=107")
            .await?;
        let listing: Value = response.json().await?;
        assert_eq!(listing["total"], 0);

        // Free text cannot find it either.
        let response = state
            .get(&admin12.token, "/reports?text=burglary")
            .await?;
        let listing: Value = response.json().await?;
        let ids: Vec<&str> = listing["reports"]
            .as_array()
            .context("reports not an array")?
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert!(!ids.contains(&foreign_id.as_str()));

        // The superadmin finds it by store filter.
        let response = state
            .get(&superadmin.token, "/reports?storeNumber=107")
            .await?;
        let listing: Value = response.json().await?;
        let ids: Vec<&str> = listing["reports"]
            .as_array()
            .context("reports not an array")?
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert!(ids.contains(&foreign_id.as_str()));

        Ok(())
    }

    #[tokio::test]
    async fn export_joins_category_names() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let submitter = state.seed_user("user", "88").await?;

        let category_id =
            create_category(state, &superadmin.token, "Arson", &["Dumpster"]).await?;

        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({
                    "categoryId": category_id,
                    "subcategory": "Dumpster",
                    "fields": { "Details": "small fire out back" },
                }),
            )
            .await?;
        assert!(response.status().is_success());

        let response = state
            .get(&superadmin.token, "/reports/export?storeNumber=88")
            .await?;
        let rows: Value = response.json().await?;
        let rows = rows.as_array().context("export not an array")?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["categoryName"], "Arson");
        assert_eq!(rows[0]["fields"]["Details"], "small fire out back");

        Ok(())
    }

    #[tokio::test]
    async fn stats_count_offenders_and_categories() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let submitter = state.seed_user("user", "71").await?;

        let category_id =
            create_category(state, &superadmin.token, "Loitering", &["Parking Lot"]).await?;

        for _ in 0..2 {
            let response = state
                .post(
                    &submitter.token,
                    "/reports",
                    &json!({
                        "categoryId": category_id,
                        "subcategory": "Parking Lot",
                        "offender": "J. Doe",
                    }),
                )
                .await?;
            assert!(response.status().is_success());
        }

        // The submitter's stats cover exactly their own reports.
        let response = state.get(&submitter.token, "/reports/stats").await?;
        let stats: Value = response.json().await?;
        assert_eq!(stats["byOffender"]["J. Doe"], 2);
        assert_eq!(stats["byCategory"]["Loitering"], 2);

        Ok(())
    }

    #[tokio::test]
    async fn user_management_is_superadmin_only() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let admin = state.seed_user("admin", "20").await?;
        let user = state.seed_user("user", "20").await?;

        let response = state.get(&admin.token, "/users").await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        // Reassign the user's store, trimming as the manager UI does.
        let response = state
            .put(
                &superadmin.token,
                &format!("/users/{}", user.uid),
                &json!({ "storeNumber": " 21 " }),
            )
            .await?;
        assert!(response.status().is_success());
        let profile: Value = response.json().await?;
        assert_eq!(profile["storeNumber"], "21");

        // Guard rails: no deleting superadmins, no deleting yourself.
        let other_superadmin = state.seed_user("superadmin", "").await?;
        let response = state
            .delete(&superadmin.token, &format!("/users/{}", other_superadmin.uid))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let response = state
            .delete(&superadmin.token, &format!("/users/{}", superadmin.uid))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        // Deleting an ordinary user also revokes their session.
        let response = state
            .delete(&superadmin.token, &format!("/users/{}", user.uid))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        let response = state.get(&user.token, "/reports").await?;
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_report_is_explicit_and_final() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;
        let submitter = state.seed_user("user", "55").await?;

        let category_id =
            create_category(state, &superadmin.token, "Spill", &["Aisle"]).await?;

        let response = state
            .post(
                &submitter.token,
                "/reports",
                &json!({ "categoryId": category_id, "subcategory": "Aisle" }),
            )
            .await?;
        let report: Value = response.json().await?;
        let report_id = report["id"].as_str().context("report has no id")?.to_owned();

        let response = state
            .delete(&superadmin.token, &format!("/reports/{report_id}"))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        let response = state
            .get(&superadmin.token, &format!("/reports/{report_id}"))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_across_registries() -> Result<()> {
        let state = &TestState::new().await?;
        let superadmin = state.seed_user("superadmin", "").await?;

        create_category(state, &superadmin.token, "Returns Abuse", &[]).await?;
        let response = state
            .post(
                &superadmin.token,
                "/categories",
                &json!({ "name": "Returns Abuse" }),
            )
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = state
            .post(&superadmin.token, "/offenders", &json!({ "name": "R. Smith" }))
            .await?;
        assert!(response.status().is_success());
        let response = state
            .post(&superadmin.token, "/offenders", &json!({ "name": "R. Smith" }))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = state
            .post(&superadmin.token, "/categories", &json!({ "name": "   " }))
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        Ok(())
    }
}
