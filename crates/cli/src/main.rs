use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use events::Event;
use serde_json::Value;
use server::config::{AutodialConfig, CONFIG_FILE};
use server::{create_router, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str =
    "autodial=info,server=info,dialer=info,telephony=info,tower_http=info";
const DEFAULT_URL: &str = "http://127.0.0.1:5000";

#[derive(Parser)]
#[command(name = "autodial")]
#[command(about = "Sequential auto-dialer over a single SIP line", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Write a default config file
    Init {
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the status of a running server
    Status {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Overrides `[server] port` from the config file
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Register with the SIP server on startup
    #[arg(long)]
    auto_connect: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(args)) => serve(args).await,
        Some(Commands::Init { config, force }) => init_config(&config, force).await,
        Some(Commands::Status { url }) => status(&url).await,
        None => {
            serve(ServeArgs {
                config: PathBuf::from(CONFIG_FILE),
                ..Default::default()
            })
            .await
        }
    }
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    AutodialConfig::default()
        .write(path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default configuration to {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Fill in the [sip] section");
    println!("  2. Run 'autodial serve --auto-connect'");

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    init_tracing(args.log_file.as_deref())?;

    let mut config = AutodialConfig::read(&args.config).await;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = AppState::simulated(&config);

    if args.auto_connect {
        let sip_config = state.settings.sip_config();
        match state.line.connect(&sip_config).await {
            Ok(()) => {
                state.event_bus.emit(Event::TelephonyConnected {
                    server: sip_config.server.clone(),
                });
            }
            Err(e) => tracing::warn!(error = %e, "Auto-connect failed; use POST /api/connect to retry"),
        }
    }

    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    println!();
    println!("Autodial");
    println!("════════════════════════════════════════");
    println!();
    println!("  API Server:  http://{}", addr);
    println!("  Swagger UI:  http://{}/swagger-ui", addr);
    println!("  Config:      {}", args.config.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn status(url: &str) -> Result<()> {
    let base = url.trim_end_matches('/');

    let status: Value = fetch_json(&format!("{}/api/status", base)).await?;
    let stats: Value = fetch_json(&format!("{}/api/call-history/stats", base)).await?;

    println!();
    println!("Server:    {}", base);
    println!(
        "Line:      {}",
        if status["connected"].as_bool().unwrap_or(false) {
            "connected"
        } else {
            "disconnected"
        }
    );
    println!("State:     {}", status["state"].as_str().unwrap_or("unknown"));

    if let Some(progress) = status["progress"].as_object() {
        println!(
            "Progress:  {}/{} (run {})",
            progress.get("processed").and_then(Value::as_u64).unwrap_or(0),
            progress.get("total").and_then(Value::as_u64).unwrap_or(0),
            progress.get("runId").and_then(Value::as_str).unwrap_or("?"),
        );
    }

    if let Some(call) = status["currentCall"].as_object() {
        println!(
            "Dialing:   {} {} ({})",
            call.get("caseId").and_then(Value::as_str).unwrap_or("?"),
            call.get("customerName").and_then(Value::as_str).unwrap_or(""),
            call.get("phoneNumber").and_then(Value::as_str).unwrap_or(""),
        );
    }

    println!();
    println!("Calls ({}):", stats["total"].as_u64().unwrap_or(0));
    for (label, key) in [
        ("answered", "answered"),
        ("not answered", "notAnswered"),
        ("not active", "notActive"),
        ("voicemail", "voicemail"),
        ("error", "error"),
        ("in progress", "inProgress"),
    ] {
        println!("  {:<13} {}", label, stats[key].as_u64().unwrap_or(0));
    }
    println!();

    Ok(())
}

async fn fetch_json(url: &str) -> Result<Value> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to reach {}", url))?
        .error_for_status()?;

    Ok(response.json().await?)
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    Ok(())
}
