use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scrapewatch::db::{MemoryStore, SqlStore, Storage};
use scrapewatch::server::config::{CheckerKind, ServerConfig, StorageKind};
use scrapewatch::services::auth_service;
use scrapewatch::services::checker::{Checker, HttpChecker, RandomChecker};
use scrapewatch::services::encryption_service::TokenCipher;
use scrapewatch::services::fix_generator::{DisabledGenerator, FixGenerator, OpenAiGenerator};
use scrapewatch::services::repository_service::HttpRepositoryProbe;
use scrapewatch::version::{VERSION, banner};
use scrapewatch::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // JSON into a daily-rotated file
    let file_appender = rolling::daily(log_dir, "scrapewatch.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn open_store(config: &ServerConfig) -> Result<Arc<dyn Storage>, Box<dyn std::error::Error + Send + Sync>> {
    match config.storage {
        StorageKind::Memory => {
            warn!("Using in-memory storage. Data is lost on shutdown.");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageKind::Sql => {
            if let Some(parent) = config.db_path.as_deref().and_then(|p| Path::new(p).parent()) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Ok(Arc::new(SqlStore::connect(&config.database_url, 10).await?))
        }
    }
}

fn build_generator(config: &ServerConfig) -> Result<Arc<dyn FixGenerator>, Box<dyn std::error::Error + Send + Sync>> {
    match config.openai_api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(Arc::new(OpenAiGenerator::new(
            config.openai_base_url.clone(),
            key,
            config.openai_model.clone(),
        )?)),
        _ => {
            warn!("OPENAI_API_KEY is not set. AI endpoints will report a service error.");
            Ok(Arc::new(DisabledGenerator))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C.");
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
                error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Checked before clap so the output stays a single line.
    if std::env::args().any(|arg| arg == "--version") {
        println!("{}", banner());
        return Ok(());
    }

    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, environment = %config.environment, "Starting server.");

    let store = open_store(&config).await?;
    auth_service::ensure_admin(store.as_ref(), &config).await?;

    let checker: Arc<dyn Checker> = match config.checker_kind {
        CheckerKind::Random => Arc::new(RandomChecker::new(config.checker_success_rate)),
        CheckerKind::Http => Arc::new(HttpChecker::new()?),
    };

    let app_state = Arc::new(AppState {
        store: store.clone(),
        checker,
        config_tester: Arc::new(HttpChecker::new()?),
        generator: build_generator(&config)?,
        probe: Arc::new(HttpRepositoryProbe::new()?),
        cipher: Arc::new(TokenCipher::new(&config.encryption_key)?),
        config: config.clone(),
    });

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP server listening.");

    axum::serve(listener, create_axum_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = store.close().await {
        error!(error = %e, "Failed to close storage cleanly.");
    }
    info!("Server stopped.");
    Ok(())
}
