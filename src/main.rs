use std::sync::Arc;

use clap::Parser;
use mongodb::Client;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use timeline_streamer::pipeline::LinearGapThreshold;
use timeline_streamer::server::{router, AppState};
use timeline_streamer::settings::Settings;
use timeline_streamer::store::MongoStoreGateway;

/// Timeline Streaming Acceleration Service.
#[derive(Debug, Parser)]
struct Args {
    /// Address to bind the HTTP/WebSocket server to. Overrides `config/timeline.toml`.
    #[arg(long, env = "TIMELINE_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// MongoDB connection string. Overrides `config/timeline.toml`.
    #[arg(long, env = "TIMELINE_MONGO_URI")]
    mongo_uri: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load()?;
    if let Some(bind_address) = args.bind_address {
        settings.bind_address = bind_address;
    }
    if let Some(mongo_uri) = args.mongo_uri {
        settings.mongo_uri = mongo_uri;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    // One client for the process (spec §9): the driver pools connections
    // internally, so there is no reason for every connection handler to
    // hold, or worse reconstruct, its own.
    let client = Client::with_uri_str(&settings.mongo_uri).await?;
    let store = Arc::new(MongoStoreGateway::new(client));
    let gap_policy = Arc::new(LinearGapThreshold);
    let shutdown = CancellationToken::new();

    let state = AppState {
        store,
        gap_policy,
        shutdown: shutdown.clone(),
    };

    let listener = tokio::net::TcpListener::bind(settings.bind_address.as_str()).await?;
    tracing::info!(address = %settings.bind_address, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    shutdown.cancel();
}
