mod config;
mod db;
mod errors;
mod models;
mod profiles;
mod resume;
mod routes;
mod state;
mod survey;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::profiles::store::{InMemoryProfileStore, PgProfileStore};
use crate::resume::store::PgResumeStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::survey::store::PgSurveyStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career API v{}", env!("CARGO_PKG_VERSION"));

    info!(
        "Profile survey: '{}' (answers sync to user profiles)",
        config.profile_survey_name
    );

    let state = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url, config.db_max_connections).await?;
            AppState::new(
                &config,
                Arc::new(PgSurveyStore::new(pool.clone())),
                Arc::new(PgResumeStore::new(pool.clone())),
                Arc::new(PgProfileStore::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL is not set; using in-memory stores, nothing will be persisted");
            AppState::in_memory(&config, Arc::new(InMemoryProfileStore::new()))
        }
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
