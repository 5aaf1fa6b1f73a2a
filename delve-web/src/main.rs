//! Delve Web Server
//!
//! Serves the dual-model chat, research and model introspection APIs.

use clap::Parser;
use delve_core::{init_logging, DelveConfig, LogFormat, LoggingConfig};
use delve_web::{DelveServerBuilder, WebConfig};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Delve Web Server - dual-model chat and web research API
#[derive(Parser)]
#[command(name = "delve-web")]
#[command(about = "HTTP API for Delve")]
#[command(version)]
struct Args {
    /// Server host to bind to (defaults to DELVE_HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on (defaults to DELVE_PORT or 2024)
    #[arg(short, long)]
    port: Option<u16>,

    /// Frontend build directory served under /app
    #[arg(long)]
    static_dir: Option<String>,

    /// TOML model configuration; API keys still come from the environment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let logging = LoggingConfig {
        level: args.log_level.clone(),
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Compact
        },
        filter_directives: vec![
            format!("delve_web={}", args.log_level),
            "tower_http=debug".to_string(),
        ],
        ..LoggingConfig::default()
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let mut web = WebConfig::from_env();
    if let Some(host) = args.host {
        web.host = host;
    }
    if let Some(port) = args.port {
        web.port = port;
    }
    if args.static_dir.is_some() {
        web.static_dir = args.static_dir;
    }

    let delve = match &args.config {
        Some(path) => DelveConfig::from_file(path).map(DelveConfig::with_env_keys),
        None => DelveConfig::from_env(),
    };
    let delve = match delve {
        Ok(delve) => delve,
        Err(e) => {
            error!("Failed to load model configuration: {}", e);
            std::process::exit(1);
        }
    };

    for key in delve.missing_keys() {
        warn!("{} is not set; requests using that provider will report an error", key);
    }

    let mut builder = DelveServerBuilder::new()
        .host(web.host.clone())
        .port(web.port)
        .delve_config(delve);
    if let Some(dir) = web.static_dir.clone() {
        builder = builder.static_dir(dir);
    }

    let server = match builder.build() {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Delve web server on http://{}", web.address());
    if let Err(e) = server.start().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
