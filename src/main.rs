#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use livedeck::backend::{HttpBackend, OverlayBackend, StreamBackend};
use livedeck::config::DashboardConfig;
use livedeck::constants;
use livedeck::dashboard::Dashboard;
use livedeck::overlay;
use livedeck::stream::{ExternalPlayer, StreamPhase};

#[derive(Debug, Parser)]
#[command(name = "livedeck", version)]
#[command(about = "Operator dashboard for RTSP-to-HLS streams with live overlays")]
struct Cli {
    /// Backend API root, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the operator window (default)
    Gui,
    /// Start a stream and play it until it ends or SIGINT/SIGTERM
    Start { rtsp_url: String },
    /// Stop a backend stream by id
    Stop { stream_id: String },
    /// List backend streams
    Streams,
    /// Print stored overlays as JSON
    Overlays,
    /// Print the compositor output for the stored overlays as JSON
    Render,
}

fn parse_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn subscriber(level: TraceLevel) -> FmtSubscriber {
    FmtSubscriber::builder().with_max_level(level).finish()
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")
}

fn backend(config: &DashboardConfig) -> Result<HttpBackend> {
    HttpBackend::new(&config.api_base, config.request_timeout())
        .context(format!("Invalid API base {}", config.api_base))
}

fn run_headless(config: &DashboardConfig, rtsp_url: &str) -> Result<()> {
    let backend = Arc::new(backend(config)?);
    let player = config.player.clone();

    runtime()?.block_on(async move {
        let mut dashboard = Dashboard::new(backend, config.dashboard_settings(), |events| {
            ExternalPlayer::new(&player, events)
        });
        livedeck::signals::forward_shutdown(dashboard.sender())?;

        dashboard
            .start_stream(rtsp_url)
            .context(format!("Failed to start stream from {rtsp_url}"))?;
        info!("Press Ctrl+C to stop");
        let last = dashboard.run_session().await;
        if last.phase == StreamPhase::Failed {
            bail!(
                "Stream from {rtsp_url} failed: {}",
                last.error.as_deref().unwrap_or(constants::status::FAILED)
            );
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn run_command(command: Command, config: &DashboardConfig) -> Result<()> {
    match command {
        Command::Gui => livedeck::gui::run_gui(config),
        Command::Start { rtsp_url } => run_headless(config, &rtsp_url),
        Command::Stop { stream_id } => {
            let backend = backend(config)?;
            runtime()?
                .block_on(backend.stop_stream(&stream_id))
                .context(format!("Failed to stop stream {stream_id}"))?;
            println!("Stopped {stream_id}");
            Ok(())
        }
        Command::Streams => {
            let backend = backend(config)?;
            let streams = runtime()?
                .block_on(backend.list_streams())
                .context(constants::notices::FETCH_STREAMS_FAILED)?;
            for stream in streams {
                println!(
                    "{}\trunning={}\tready={}\t{}",
                    stream.stream_id,
                    stream.is_running,
                    stream.playlist_ready,
                    stream.rtsp_url.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Command::Overlays => {
            let backend = backend(config)?;
            let overlays = runtime()?
                .block_on(backend.list_overlays())
                .context("Failed to fetch overlays")?;
            println!("{}", serde_json::to_string_pretty(&overlays)?);
            Ok(())
        }
        Command::Render => {
            let backend = backend(config)?;
            let overlays = runtime()?
                .block_on(backend.list_overlays())
                .context("Failed to fetch overlays")?;
            println!("{}", serde_json::to_string_pretty(&overlay::render(&overlays))?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // LOG_LEVEL covers config loading; the config file and then the CLI flag
    // override it for the rest of the run
    let env_level = std::env::var(constants::env::LOG_LEVEL)
        .unwrap_or_else(|_| constants::config::DEFAULT_LOG_LEVEL.to_string());
    let mut config = tracing::subscriber::with_default(subscriber(parse_level(&env_level)), || {
        match &cli.config {
            Some(path) => DashboardConfig::load_from(path),
            None => DashboardConfig::load(),
        }
    })?;

    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    let level = cli
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or(&env_level);
    tracing::subscriber::set_global_default(subscriber(parse_level(level)))?;
    info!(api_base = %config.api_base, "livedeck starting");

    run_command(cli.command.unwrap_or(Command::Gui), &config)
}
