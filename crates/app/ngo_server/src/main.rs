//! NGO site API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! seeds the SUPER_ADMIN if asked to, and serves the admin and public API.

use std::sync::Arc;

use clap::Parser;
use ngo_api::AppState;
use ngo_api::config::ApiConfig;
use ngo_core::auth::jwt::TokenCodec;
use ngo_core::auth::queries::PgUserRepository;
use ngo_core::auth::repository::{InMemoryUserRepository, UserRepository};
use ngo_core::auth::store::UserStore;
use ngo_core::content::connector::ContentConnector;
use ngo_core::pool::SessionPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "ngo_server", about = "NGO site API server", version)]
struct Args {
    /// Address to listen on; overrides `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Keep users and content in process memory instead of PostgreSQL.
    ///
    /// Everything is lost on exit. Intended for local UI work.
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Maximum number of connections in the shared user-store pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ngo_api=debug,ngo_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(addr) = args.bind_addr {
        config.bind_addr = addr;
    }
    let tokens = TokenCodec::new(config.jwt_secret.as_bytes(), config.token_ttl_secs)?;

    let (repo, connector, db): (Arc<dyn UserRepository>, ContentConnector, _) = if args.memory {
        warn!("running with in-memory stores; data will not persist");
        (
            Arc::new(InMemoryUserRepository::new()),
            ContentConnector::memory(),
            None,
        )
    } else {
        info!(max_connections = args.max_connections, "connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        ngo_api::migrate(&pool).await?;

        let connector =
            ContentConnector::postgres(&config.database_url, config.session_max_connections)?;
        (
            Arc::new(PgUserRepository::new(pool.clone())),
            connector,
            Some(pool),
        )
    };

    let users = UserStore::new(repo);
    if let Some(seed) = &config.seed_admin {
        match users.seed_admin(&seed.username, &seed.password).await? {
            Some(admin) => info!(username = %admin.username, "seeded super admin"),
            None => info!(username = %seed.username, "super admin already exists"),
        }
    }

    let sessions = SessionPool::with_idle_timeout(connector.clone(), config.session_idle_timeout);
    let state = AppState {
        users,
        tokens,
        sessions: sessions.clone(),
        config: config.clone(),
    };
    let app = ngo_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let ct = CancellationToken::new();
    tokio::spawn({
        let ct = ct.clone();
        async move {
            shutdown_signal().await;
            ct.cancel();
        }
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await;

    sessions.shutdown().await;
    connector.shutdown().await;
    if let Some(pool) = db {
        pool.close().await;
    }
    result?;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("interrupt received, shutting down"),
        _ = terminate => info!("terminate received, shutting down"),
    }
}
