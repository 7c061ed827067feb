use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DownloadsConfig {
    pub directory: PathBuf,
    pub default_quality: String,
    /// Host substrings a URL must contain to be accepted at all
    pub supported_hosts: Vec<String>,
    pub ytdlp_path: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("download"),
            default_quality: "720p".to_string(),
            supported_hosts: vec![
                "youtube.com".to_string(),
                "youtu.be".to_string(),
                "m.youtube.com".to_string(),
            ],
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub downloads: DownloadsConfig,
    pub http: HttpConfig,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config file {}", path))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        Ok(config)
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }

    /// Creates the download directory if it does not exist yet.
    pub fn ensure_download_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.downloads.directory).with_context(|| {
            format!(
                "Failed to create download directory {}",
                self.downloads.directory.display()
            )
        })
    }
}
