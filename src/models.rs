//! Entity types for all collections, plus their database row mappings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor role. Closed set; anything unrecognized in the `users` table
/// degrades to `User` rather than failing the whole request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            "superadmin" => Self::Superadmin,
            _ => Self::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }
}

/// Report status. Exactly two states, toggled by admins.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    Complete,
}

impl ReportStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Complete" => Self::Complete,
            _ => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Complete => "Complete",
        }
    }

    /// The other state. Applying twice returns the original value.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Complete,
            Self::Complete => Self::Pending,
        }
    }
}

/// Custom form field type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Textarea,
}

impl FieldType {
    pub fn parse(s: &str) -> Self {
        match s {
            "number" => Self::Number,
            "select" => Self::Select,
            "textarea" => Self::Textarea,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Select => "select",
            Self::Textarea => "textarea",
        }
    }
}

/// A report classification category with its ordered subcategory names.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub subcategories: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A site-defined custom form field. Fields appear by *name* in every
/// report's `fields` map, so renaming a definition detaches historic values.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Non-empty iff `field_type` is `select`.
    #[serde(default)]
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A known offender name. Copied into reports by value, never by id.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Offender {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An incident report.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub category_id: String,
    pub subcategory: String,
    /// Offender tag; free text or a registry name. May be empty.
    #[serde(default)]
    pub offender: String,
    /// Scope partition key. Set at creation, never rewritten.
    pub store_number: String,
    /// Custom field values keyed by field definition *name*. Unknown keys
    /// are tolerated and round-trip untouched.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    pub status: ReportStatus,
    #[serde(default)]
    pub admin_comment: String,
    pub reporter_id: String,
    pub reporter_name: String,
    pub created_at: DateTime<Utc>,
    /// None until the first admin mutation.
    pub updated_at: Option<DateTime<Utc>>,
    /// Joined from the taxonomy at read time; "Unknown" when the category
    /// has since been deleted. Not persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

/// A user profile, as resolved for policy decisions. Credentials live with
/// the identity provider; this service only reads role and store scope.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub store_number: String,
}

// Row types for sqlx. JSON-shaped columns (subcategory lists, field maps)
// are TEXT and decoded here; malformed JSON degrades to empty rather than
// poisoning the listing.

#[derive(sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub subcategories: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subcategories: serde_json::from_str(&row.subcategories).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct FieldRow {
    pub id: String,
    pub name: String,
    pub field_type: String,
    pub options: String,
    pub created_at: DateTime<Utc>,
}

impl From<FieldRow> for FieldDefinition {
    fn from(row: FieldRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            field_type: FieldType::parse(&row.field_type),
            options: serde_json::from_str(&row.options).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct OffenderRow {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<OffenderRow> for Offender {
    fn from(row: OffenderRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct ReportRow {
    pub id: String,
    pub category_id: String,
    pub subcategory: String,
    pub offender: String,
    pub store_number: String,
    pub fields: String,
    pub status: String,
    pub admin_comment: String,
    pub reporter_id: String,
    pub reporter_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            subcategory: row.subcategory,
            offender: row.offender,
            store_number: row.store_number,
            fields: serde_json::from_str(&row.fields).unwrap_or_default(),
            status: ReportStatus::parse(&row.status),
            admin_comment: row.admin_comment,
            reporter_id: row.reporter_id,
            reporter_name: row.reporter_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category_name: None,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub store_number: String,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            uid: row.uid,
            name: row.name,
            email: row.email,
            role: Role::parse(&row.role),
            store_number: row.store_number,
        }
    }
}
