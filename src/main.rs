use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gtm_playbook::config::AppConfig;
use gtm_playbook::session::{PlaybookGenerator, SessionStore, spawn_expiry_task};
use gtm_playbook::{cli, web};

/// How often idle sessions are swept.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Turn go-to-market questionnaire answers into a PDF playbook
#[derive(Parser)]
#[command(name = "gtm-playbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web wizard (default)
    Serve {
        /// Listen address (overrides GTM_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,

        /// Listen port (overrides GTM_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate a playbook from a JSON answers file, without the web UI
    Generate {
        /// JSON file keyed by field name
        #[arg(short, long)]
        answers: PathBuf,

        /// Output PDF path (defaults to <Product>_GTM_Playbook.pdf)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    match cli.command.unwrap_or(Commands::Serve {
        bind: None,
        port: None,
    }) {
        Commands::Serve { bind, port } => serve(config, bind, port).await,
        Commands::Generate { answers, out } => {
            let generator = PlaybookGenerator::from_credential(config.api_key, config.llm)
                .context("Failed to create LLM provider")?;
            let written = cli::generate_to_file(&generator, &answers, out.as_deref()).await?;
            eprintln!("Playbook written to {}", written.display());
            Ok(())
        }
    }
}

/// Log to stderr, and to a daily file as well when a log directory is set.
fn init_tracing(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gtm-playbook.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

async fn serve(config: AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let bind = bind.unwrap_or(config.bind_addr);
    let port = port.unwrap_or(config.port);
    let shared_key = config.api_key.is_some();

    let store = SessionStore::new(config.session_idle_timeout);
    let _expiry = spawn_expiry_task(Arc::clone(&store), EXPIRY_SWEEP_INTERVAL);
    let generator = Arc::new(
        PlaybookGenerator::from_credential(config.api_key, config.llm.clone())
            .context("Failed to create LLM provider")?,
    );
    let app = web::router(store, generator);

    eprintln!("GTM Playbook v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Wizard: http://{bind}:{port}/");
    eprintln!("   API: http://{bind}:{port}/api/sessions");
    if !shared_key {
        eprintln!("   OPENAI_API_KEY not set, the form will ask for a key per session");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    tracing::info!(bind = %bind, port, "GTM playbook server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
