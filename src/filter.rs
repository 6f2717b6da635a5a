//! Report filtering, search, ordering and pagination.
//!
//! Everything here is pure and synchronous; it runs over a list the
//! visibility policy has already scoped. Free-text search matches against a
//! normalized textual projection of the report, so results cannot depend on
//! incidental serialization order.

use chrono::{NaiveDate, NaiveTime, TimeZone as _, Utc};

use crate::models::{Report, ReportStatus};

/// Combined filter criteria. An absent or empty field is unconstrained
/// ("match everything"), never "match empty".
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub text: Option<String>,
    pub status: Option<ReportStatus>,
    pub category_id: Option<String>,
    pub store_number: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// A trimmed, non-empty constraint value, or None for "unconstrained".
fn constraint(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Whether one report passes every predicate of the filter. Predicates are
/// evaluated cheapest first and short-circuit.
pub fn matches(spec: &FilterSpec, report: &Report) -> bool {
    if let Some(status) = spec.status {
        if report.status != status {
            return false;
        }
    }

    if let Some(category_id) = constraint(&spec.category_id) {
        if report.category_id != category_id {
            return false;
        }
    }

    if let Some(store) = constraint(&spec.store_number) {
        if report.store_number.trim() != store {
            return false;
        }
    }

    // Calendar-day bounds: `date_from` floors to 00:00:00 and `date_to`
    // ceils to 23:59:59, both inclusive, in UTC.
    if let Some(from) = spec.date_from {
        let floor = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
        if report.created_at < floor {
            return false;
        }
    }
    if let Some(to) = spec.date_to {
        let ceil = Utc.from_utc_datetime(&to.and_hms_opt(23, 59, 59).expect("valid wall time"));
        if report.created_at > ceil {
            return false;
        }
    }

    if let Some(text) = constraint(&spec.text) {
        let needle = text.to_lowercase();
        if !haystack(report).contains(&needle) {
            return false;
        }
    }

    true
}

/// The lower-cased textual projection free-text search runs over: every
/// scalar attribute plus every custom field key and value. Field entries
/// iterate in key order, so two reports with the same content always
/// project identically.
fn haystack(report: &Report) -> String {
    let mut out = String::new();
    let mut push = |s: &str| {
        out.push_str(&s.to_lowercase());
        out.push('\n');
    };

    push(&report.id);
    push(&report.category_id);
    if let Some(name) = &report.category_name {
        push(name);
    }
    push(&report.subcategory);
    push(&report.offender);
    push(&report.store_number);
    push(report.status.as_str());
    push(&report.admin_comment);
    push(&report.reporter_id);
    push(&report.reporter_name);
    push(&report.created_at.to_rfc3339());

    for (key, value) in &report.fields {
        push(key);
        push(value);
    }

    out
}

/// Newest first; ties broken by id ascending so the order is deterministic.
pub fn sort(reports: &mut [Report]) {
    reports.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Filter and order a visibility-scoped report list.
pub fn apply(spec: &FilterSpec, mut reports: Vec<Report>) -> Vec<Report> {
    reports.retain(|r| matches(spec, r));
    sort(&mut reports);
    reports
}

/// Pure slice of the filtered, sorted list. Out-of-range pages are empty,
/// never an error.
pub fn paginate(reports: &[Report], page: usize, page_size: usize) -> &[Report] {
    let start = page.saturating_mul(page_size);
    if start >= reports.len() {
        return &[];
    }
    let end = usize::min(start + page_size, reports.len());
    &reports[start..end]
}
