//! Export projection boundary.
//!
//! The PDF/CSV renderer lives outside this service; our only obligation is
//! to hand it the already-filtered, role-scoped list with category names
//! pre-joined and the dynamic fields flattened alongside the fixed columns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::{Report, ReportStatus},
    reports::UNKNOWN_CATEGORY,
};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub category_name: String,
    pub subcategory: String,
    pub status: ReportStatus,
    pub offender: String,
    pub store_number: String,
    pub admin_comment: String,
    pub reporter_name: String,
    pub fields: BTreeMap<String, String>,
}

pub fn rows(reports: Vec<Report>) -> Vec<ExportRow> {
    reports
        .into_iter()
        .map(|r| ExportRow {
            id: r.id,
            created_at: r.created_at,
            category_name: r
                .category_name
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_owned()),
            subcategory: r.subcategory,
            status: r.status,
            offender: r.offender,
            store_number: r.store_number,
            admin_comment: r.admin_comment,
            reporter_name: r.reporter_name,
            fields: r.fields,
        })
        .collect()
}
