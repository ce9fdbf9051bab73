use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use sqlbot_backend::config::Config;
use sqlbot_backend::routes;
use sqlbot_backend::services::agent::{AgentFactory, SqlAgentFactory};
use sqlbot_backend::services::database::SqlDatabase;
use sqlbot_backend::services::ollama::OllamaClient;
use sqlbot_backend::services::session_manager::{SessionManager, SessionStore};
use sqlbot_backend::services::session_store::SqliteSessionStore;
use sqlbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::from_env();
    init_tracing(&cfg);

    info!(version = env!("CARGO_PKG_VERSION"), "sqlbot starting");

    // Refuse traffic until the store can be opened.
    if let Err(e) = SqlDatabase::open_read_only(&cfg.database_path).await {
        error!(
            database = %cfg.database_path.display(),
            error = %e,
            "failed to start application"
        );
        return Err(e).context("database check failed");
    }
    info!(database = %cfg.database_path.display(), "database reachable (read-only)");

    let sessions: Arc<dyn SessionStore> = match &cfg.session_database_url {
        Some(url) => {
            let store = SqliteSessionStore::connect(url)
                .await
                .context("failed to open session database")?;
            info!(session_db = %url, "using sqlite session store");
            Arc::new(store)
        }
        None => {
            info!("using in-memory session store");
            Arc::new(SessionManager::new())
        }
    };

    let agents: Arc<dyn AgentFactory> = Arc::new(
        SqlAgentFactory::new(OllamaClient::new(cfg.ollama_url.clone()), cfg.database_path.clone())
            .with_limits(cfg.agent_max_iterations, cfg.agent_top_k),
    );

    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.bind_address))?;
    let state = Arc::new(AppState::new(cfg, sessions, agents)?);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "sqlbot running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("sqlbot stopped");
    Ok(())
}

fn init_tracing(cfg: &Config) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: SQLBOT_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
