use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context as _;
use axum::{extract::FromRef, routing::get, Router};
use chrono::Utc;
use clap::Parser;
use clap_verbosity_flag::{log::LevelFilter, InfoLevel, Verbosity};
use figment::{providers::Format as _, Figment};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use super::config::AppConfig;
use super::db::{self, Db};
pub use super::error::Error;

/// The application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug, Clone)]
/// Command line arguments.
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "default.toml")]
    pub config: PathBuf,
    /// The verbosity level.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Clone, FromRef)]
/// The application state, shared across all routes.
pub struct AppState {
    /// The application configuration.
    pub config: AppConfig,
    /// The main database connection pool.
    pub db: Db,
}

/// Build the full application router.
pub(crate) fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(super::index))
        .nest("/api", super::endpoints::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The main application entry point.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up trace logging to console and account for the user-provided verbosity flag.
    if args.verbosity.log_level_filter() != LevelFilter::Off {
        let lvl = match args.verbosity.log_level_filter() {
            LevelFilter::Error => tracing::Level::ERROR,
            LevelFilter::Warn => tracing::Level::WARN,
            LevelFilter::Info | LevelFilter::Off => tracing::Level::INFO,
            LevelFilter::Debug => tracing::Level::DEBUG,
            LevelFilter::Trace => tracing::Level::TRACE,
        };
        tracing_subscriber::fmt().with_max_level(lvl).init();
    }

    if !args.config.exists() {
        // Throw up a warning if the config file does not exist.
        //
        // This is not fatal because users can specify all configuration settings via
        // the environment, but the most likely scenario here is that a user accidentally
        // omitted the config file for some reason (e.g. forgot to mount it into Docker).
        warn!(
            "configuration file {} does not exist",
            args.config.display()
        );
    }

    // Read and parse the user-provided configuration.
    let config: AppConfig = Figment::new()
        .admerge(figment::providers::Toml::file(args.config))
        .admerge(figment::providers::Env::prefixed("REPORTD_"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize metrics reporting.
    super::metrics::setup(&config.metrics).context("failed to set up metrics exporter")?;

    let db = db::establish(&config.db)
        .await
        .context("failed to establish database connection pool")?;

    bootstrap_superadmin(&db).await?;

    let addr = config
        .listen_address
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));

    let app = app(AppState {
        config: config.clone(),
        db: db.clone(),
    });

    info!("listening on {addr}");
    info!("connect to: http://127.0.0.1:{}", addr.port());

    let listener = TcpListener::bind(&addr)
        .await
        .context("failed to bind address")?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("failed to serve app")
}

/// Determine whether or not this was the first startup (i.e. no users exist
/// at all). If so, create a superadmin profile plus a session token and
/// share the token via the console — otherwise the admin surface would be
/// unreachable. The identity provider takes over from there.
async fn bootstrap_superadmin(db: &Db) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
        .fetch_one(db)
        .await
        .context("failed to count users")?;

    if count != 0 {
        return Ok(());
    }

    let uid = Uuid::new_v4().to_string();
    let token = Uuid::new_v4().to_string();

    sqlx::query(
        r#"INSERT INTO users (uid, name, email, role, store_number) VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&uid)
    .bind("Superadmin")
    .bind("")
    .bind("superadmin")
    .bind("")
    .execute(db)
    .await
    .context("failed to create bootstrap superadmin")?;

    sqlx::query(
        r#"INSERT INTO sessions (token, uid, created_at, expires_at) VALUES (?, ?, ?, NULL)"#,
    )
    .bind(&token)
    .bind(&uid)
    .bind(Utc::now())
    .execute(db)
    .await
    .context("failed to create bootstrap session")?;

    // N.B: This is a sensitive message, so we're bypassing `tracing` here and
    // logging it directly to console.
    println!("=====================================");
    println!("            FIRST STARTUP            ");
    println!("=====================================");
    println!("No users exist yet. A superadmin was");
    println!("created; authenticate with this token:");
    println!("{token}");
    println!("=====================================");

    Ok(())
}
