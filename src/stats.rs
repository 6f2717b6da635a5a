//! Aggregate counts backing the stats dashboard. Pure fold over an
//! already-scoped report list; rendering happens client-side.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{models::Report, reports::UNKNOWN_CATEGORY};

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    /// Reports per offender tag. Untagged reports are skipped.
    pub by_offender: BTreeMap<String, u64>,
    /// Reports per resolved category name; orphans count under "Unknown".
    pub by_category: BTreeMap<String, u64>,
}

pub fn aggregate(reports: &[Report]) -> ReportStats {
    let mut stats = ReportStats::default();

    for report in reports {
        if !report.offender.is_empty() {
            *stats.by_offender.entry(report.offender.clone()).or_default() += 1;
        }

        let category = report
            .category_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_owned());
        *stats.by_category.entry(category).or_default() += 1;
    }

    stats
}
