use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use tagboard::{config::DaemonConfig, hardware, rest, AppContext};

#[derive(Parser)]
#[command(
    name = "tagboard",
    about = "Tag Board — NFC task-tracking daemon for Raspberry Pi",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP API port
    #[arg(long, env = "TAGBOARD_PORT")]
    port: Option<u16>,

    /// Data directory for the JSON stores and config.toml
    #[arg(long, env = "TAGBOARD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TAGBOARD_LOG")]
    log: Option<String>,

    /// Bind address (default: 0.0.0.0; use 127.0.0.1 to go local-only)
    #[arg(long, env = "TAGBOARD_BIND")]
    bind: Option<String>,

    /// Bearer token required on API requests. Unset disables auth.
    #[arg(long, env = "TAGBOARD_AUTH_TOKEN")]
    auth_token: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TAGBOARD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon (default when no subcommand given).
    ///
    /// Examples:
    ///   tagboard serve
    ///   tagboard
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(DaemonConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind,
        args.auth_token,
    ));

    // Init once — must happen before any tracing calls.
    let _file_guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    match args.command {
        None | Some(Command::Serve) => run_server(config).await,
    }
}

async fn run_server(config: Arc<DaemonConfig>) -> Result<()> {
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

    if config.auth_token.is_none() {
        tracing::warn!("no auth token configured — the API is unauthenticated");
    }

    let sink = hardware::detect(&config.hardware);
    let ctx = Arc::new(AppContext::new(config.clone(), sink));

    info!(
        data_dir = %config.data_dir.display(),
        nfc_public = config.nfc_public,
        "tagboard {} starting",
        env!("CARGO_PKG_VERSION")
    );
    rest::start_rest_server(ctx).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default) or `"json"` (structured output
/// for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("tagboard.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
