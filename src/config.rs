use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub listen_address: Option<SocketAddr>,
    /// SQLite connection URL, e.g. `sqlite://data/reportd.db`.
    pub db: String,
    pub metrics: Option<MetricConfig>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum MetricConfig {
    PrometheusPush(PrometheusPushConfig),
}

#[derive(Deserialize, Debug, Clone)]
pub struct PrometheusPushConfig {
    /// Push gateway endpoint.
    pub url: String,
}
