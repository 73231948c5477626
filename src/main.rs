use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use feedhook::chat::{ChatDefaults, MessageFormatter, WebhookPublisher};
use feedhook::command::{self, CommandState};
use feedhook::config::Config;
use feedhook::dispatch::{Deliverer, DispatchSettings, Dispatcher, Registry, Scheduler};
use feedhook::feed::HttpFeedSource;
use feedhook::logging;
use feedhook::store::FeedStore;

#[derive(Parser, Debug)]
#[command(
    name = "feedhook",
    version,
    about = "Relays new RSS/Atom entries to a chat incoming webhook"
)]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "./config.toml")]
    config: PathBuf,

    /// Command server listen address (overrides the config file)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Deployment environment recorded in logs
    #[arg(long, default_value = "dev")]
    environment: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let span = tracing::info_span!(
        "feedhook",
        application = env!("CARGO_PKG_NAME"),
        environment = %args.environment,
        version = env!("CARGO_PKG_VERSION"),
    );

    run(args).instrument(span).await
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let bind = args.bind.clone().unwrap_or_else(|| config.bind.clone());

    let client = HttpFeedSource::default_client().context("Failed to build HTTP client")?;
    let source = Arc::new(HttpFeedSource::new(client.clone()));
    let registry = Registry::new(config.feeds.clone(), source);

    let (dispatcher, deliveries) = Dispatcher::new(registry.clone(), DispatchSettings::from(&config));
    let deliverer = Deliverer::new(
        MessageFormatter::new(ChatDefaults::from(&config)),
        Arc::new(WebhookPublisher::new(
            client,
            SecretString::from(config.webhook_url.clone()),
        )),
    );
    let (scheduler, trigger) = Scheduler::new(Arc::new(dispatcher), deliverer, deliveries);

    let state = CommandState::new(
        registry,
        config.token.clone(),
        FeedStore::new(config.feed_file.clone()),
    )
    .with_trigger(trigger);
    let listener = TcpListener::bind(bind.as_str())
        .await
        .with_context(|| format!("Failed to bind command server to {bind}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()).in_current_span());

    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()).in_current_span());
    let server = command::serve(
        listener,
        command::create_router(Arc::new(state)),
        shutdown.clone(),
    );

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Command server failed");
        shutdown.cancel();
    }
    scheduler_task.await.context("Scheduler task panicked")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => tracing::info!("Received SIGINT, shutting down gracefully"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
    shutdown.cancel();
}
