//! Metric name constants.

use std::time::Duration;

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config;

pub const AUTH_FAILED: &str = "reportd.auth.failed"; // Counter.

pub const REPORT_SUBMITTED: &str = "reportd.report.submitted"; // Counter.
pub const REPORT_UPDATED: &str = "reportd.report.updated"; // Counter.
pub const REPORT_TOGGLED: &str = "reportd.report.toggled"; // Counter.
pub const REPORT_DELETED: &str = "reportd.report.deleted"; // Counter.

/// Must be ran exactly once on startup. This will declare all of the instruments for `metrics`.
pub fn setup(config: &Option<config::MetricConfig>) -> anyhow::Result<()> {
    describe_counter!(AUTH_FAILED, "The number of failed authentication attempts.");

    describe_counter!(REPORT_SUBMITTED, "The count of submitted reports.");
    describe_counter!(REPORT_UPDATED, "The count of admin report updates.");
    describe_counter!(REPORT_TOGGLED, "The count of report status toggles.");
    describe_counter!(REPORT_DELETED, "The count of deleted reports.");

    if let Some(config) = config {
        match config {
            config::MetricConfig::PrometheusPush(prometheus_config) => {
                PrometheusBuilder::new()
                    .with_push_gateway(
                        prometheus_config.url.clone(),
                        Duration::from_secs(10),
                        None,
                        None,
                    )
                    .context("failed to set up push gateway")?
                    .install()
                    .context("failed to install metrics exporter")?;
            }
        }
    }

    Ok(())
}
