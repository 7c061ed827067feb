use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod api;
mod config;
mod error;
mod jobs;
mod media;
mod service;
mod utils;

use config::Config;
use service::DownloadService;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Http {
        /// Address to listen on, overrides the config file
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Serve JSON-RPC tool calls on stdin/stdout
    Rpc,
    /// Download one video into the download directory and wait for it
    Download {
        url: String,

        /// Maximum height such as `480p`, defaults to the config file's
        #[arg(short, long)]
        quality: Option<String>,
    },
    /// Check that yt-dlp and ffmpeg are installed
    Check,
}

fn get_config_path(args: &Args) -> Option<String> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("CONFIG_FILE") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{}/tubejobs/config.toml", xdg_config_home);
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/tubejobs/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

fn init_logging(config: &Config, to_stderr: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // stdout belongs to the protocol in RPC mode
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    match (config.get_logging_format() == "json", to_stderr) {
        (true, true) => builder.json().with_writer(std::io::stderr).init(),
        (true, false) => builder.json().init(),
        (false, true) => builder.with_writer(std::io::stderr).init(),
        (false, false) => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = get_config_path(&args);
    let config = match &config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::default(),
    };

    init_logging(&config, matches!(args.command, Command::Rpc));

    info!("Starting tubejobs...");
    match &config_path {
        Some(path) => info!("Loaded config from: {}", path),
        None => info!("No config file found, using defaults"),
    }

    config.ensure_download_dir()?;
    info!(
        "Download directory: {}",
        config.downloads.directory.display()
    );

    let service = DownloadService::from_config(&config.downloads);

    match args.command {
        Command::Http { bind } => {
            if !service.check_extractor().await {
                warn!("yt-dlp is not available, downloads will fail");
            }
            let bind = bind.unwrap_or_else(|| config.http.bind.clone());
            api::http::serve(service, &bind).await
        }
        Command::Rpc => {
            if !service.check_extractor().await {
                warn!("yt-dlp is not available, downloads will fail");
            }
            api::rpc::serve_stdio(service).await
        }
        Command::Download { url, quality } => {
            api::cli::download(&service, &url, quality.as_deref(), api::cli::POLL_INTERVAL)
                .await
                .map(|_| ())
        }
        Command::Check => {
            if service.check_extractor().await {
                info!("✅ Media extractor is available");
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "yt-dlp is not available. Please install yt-dlp or set downloads.ytdlp_path."
                ))
            }
        }
    }
}
