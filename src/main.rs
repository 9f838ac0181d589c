//! SQL Study Room API
//!
//! Backend for a SQL-learning platform: problems, reference solutions, query history
//! and a natural-language-to-SQL chat assistant.
//!
//! NL2SQL PIPELINE: a question is turned into SQL by a language model,
//! checked by a read-only safety gate, executed against the study-room
//! database and logged to the QUERY table in the background.

mod config;
mod db;
mod error;
mod llm;
mod models;
mod nl2sql;
mod routes;
mod state;

use crate::config::Settings;
use crate::nl2sql::Nl2SqlService;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("🚀 Starting SQL Study Room API...");

    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let pool = db::create_pool(&settings.database)?;
    if let Err(e) = db::verify(&pool).await {
        error!("❌ FATAL: Failed to reach the database: {}", e);
        error!("DATABASE_URL (or DB_*) must point at an accessible database");
        return Err(e.into());
    }
    info!(
        "✅ Database pool ready ({}:{}/{}, TLS: {})",
        settings.database.host,
        settings.database.port,
        settings.database.database,
        settings.database.use_tls
    );

    let nl2sql = Nl2SqlService::from_settings(pool.clone(), &settings)?;
    info!("🤖 NL2SQL assistant using model {}", settings.llm.model);
    warn!("⚠️  Generated SQL runs with this service's database role; grant it read-only access");

    let state = Arc::new(AppState::new(pool, nl2sql));
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   GET  /health                         - Health check");
    info!("   POST /chat/nl2sql                    - Answer a question with SQL");
    info!("   GET  /chat/history/{{account_number}}  - Recent assistant queries");
    info!("   GET  /problems?reviewed=bool         - List problems");
    info!("   GET  /solution/{{problem_id}}          - Get a problem's solution");
    info!("   POST /solution                       - Add a solution");
    info!("   PUT  /solution/{{problem_id}}          - Update a solution");
    info!("");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlroom_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
