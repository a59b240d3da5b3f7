use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use user_locale::config::{Config, LoggingConfig};
use user_locale::{Locale, LocaleResolver, Localization, app};

#[derive(Parser, Debug)]
#[command(name = "user-locale", version, about = "Demo server for the user locale middleware")]
struct Args {
    /// Path to config.toml (defaults to conf/config.toml or config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let _log_guard = init_logging(&config.logging)?;

    let default_locale = Locale::parse(&config.locale.default_locale)
        .context("Invalid locale.default_locale")?;
    let localization = Localization::new(default_locale);
    let resolver = LocaleResolver::from_config(&config.locale, localization)
        .context("Invalid [locale] configuration")?;

    tracing::info!(
        "Locale middleware: cookie={}, default={}, accepted={:?}",
        resolver.cookie_name(),
        resolver.default_locale(),
        config.locale.accepted_locales
    );

    let app = app::build_router(Arc::new(resolver))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Stdout logging plus an optional daily-rolling log file.
///
/// The returned guard must stay alive for the file writer to flush.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid logging.level '{}'", config.level))?;

    let Some(file) = config.file.as_deref() else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init()?;
        return Ok(None);
    };

    let path = Path::new(file);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("logging.file '{}' has no file name", file))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()?;

    Ok(Some(guard))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
