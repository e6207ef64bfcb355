mod audio;
mod config;
mod logging;
mod mqtt;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use escape_api::{Snapshots, create_app};
use escape_core::ServerState;
use escape_engine::Dispatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::CommandAudioPlayer;
use crate::config::{FileConfigSource, Settings};
use crate::logging::LogFormat;

/// Messages received from the broker but not yet dispatched
const INBOUND_CAPACITY: usize = 256;

/// How long the MQTT event loop gets to send its Disconnect on shutdown
const MQTT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Command line arguments for the escape room server
#[derive(Parser, Debug)]
#[command(name = "escaperoom-server")]
#[command(about = "Escape room control server")]
struct Args {
    /// Path to the server configuration JSON file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Address to bind the status API to, overrides the configuration
    #[arg(long)]
    http_bind: Option<String>,

    /// Log level or filter directive, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load configuration '{}'", args.config.display()))?;

    logging::init(
        args.log_level.as_deref().unwrap_or(&settings.log_level),
        args.log_format.unwrap_or(settings.log_format),
        settings.log_file.as_deref(),
    );

    tracing::info!(
        config = %args.config.display(),
        stations = settings.room.station_configs.len(),
        "Starting escape room server"
    );

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let (transport, mut mqtt_task) = mqtt::connect(&settings.mqtt_broker, inbound_tx);
    let transport = Arc::new(transport);

    let dispatcher = Dispatcher::with_room_handlers(
        ServerState::new(settings.room.clone()),
        transport.clone(),
        Arc::new(FileConfigSource::new(args.config.clone())),
        Arc::new(CommandAudioPlayer::new(
            settings.audio_base_path.clone(),
            &settings.audio_player,
        )),
    );

    let http_task = if settings.http.enabled {
        let bind = args.http_bind.as_deref().unwrap_or(&settings.http.bind);
        Some(serve_status_api(bind, dispatcher.subscribe()).await?)
    } else {
        None
    };

    let last_state = dispatcher.run(inbound_rx, shutdown_signal()).await;
    tracing::info!(session_state = %last_state.session_state(), "Shutting down");

    transport.disconnect();
    if tokio::time::timeout(MQTT_DRAIN_TIMEOUT, &mut mqtt_task)
        .await
        .is_err()
    {
        tracing::warn!("MQTT event loop did not stop in time");
        mqtt_task.abort();
    }
    if let Some(task) = http_task {
        task.abort();
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn serve_status_api(bind: &str, snapshots: Snapshots) -> anyhow::Result<JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind status API to {bind}"))?;
    tracing::info!("Status API listening on {}", bind);

    let app = create_app(snapshots);
    Ok(tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(%error, "Status API stopped");
        }
    }))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
