use super::{
    extractor::{Extractor, ProgressFn},
    types::{ByteProgress, ItemFilter, TransferRequest},
};
use crate::error::ExtractionError;
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    sync::watch,
};
use tracing::{debug, info, warn};

const PROGRESS_PREFIX: &str = "tubejobs-progress";

pub struct YtDlpExtractor {
    program: String,
}

impl YtDlpExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> ExtractionError {
        ExtractionError::Spawn {
            program: self.program.clone(),
            message: e.to_string(),
        }
    }

    fn transfer_command(&self, request: &TransferRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--output")
            .arg(&request.output_template)
            .arg("--format")
            .arg(request.quality.format_selector());

        match request.items {
            ItemFilter::NoPlaylist => {
                command.arg("--no-playlist");
            }
            ItemFilter::PlaylistItem(index) => {
                command
                    .arg("--yes-playlist")
                    .arg("--playlist-items")
                    .arg(index.to_string());
            }
            ItemFilter::WholePlaylist => {
                command.arg("--yes-playlist");
            }
        }

        command
            .arg("--dump-json")
            .arg("--no-simulate")
            .arg("--progress")
            .arg("--newline")
            .arg("--progress-template")
            .arg(format!(
                "download:{} %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s",
                PROGRESS_PREFIX
            ))
            .arg("--no-warnings")
            .arg(&request.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn inspect(&self, url: &str, playlist: bool) -> Result<Value, ExtractionError> {
        debug!("Extracting metadata with yt-dlp for: {}", url);

        let output = Command::new(&self.program)
            .arg("--dump-single-json")
            .arg("--flat-playlist")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg(if playlist { "--yes-playlist" } else { "--no-playlist" })
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ExtractionError::Failed(failure_message(
                &String::from_utf8_lossy(&output.stderr),
                &output.status.to_string(),
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(json_str.trim())
            .map_err(|e| ExtractionError::InvalidOutput(e.to_string()))
    }

    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: ProgressFn<'_>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<Value, ExtractionError> {
        if *cancel.borrow() {
            return Err(ExtractionError::Cancelled);
        }

        info!(
            "Downloading with yt-dlp: {} ({:?}, {})",
            request.url, request.items, request.quality.label
        );

        let mut child = self
            .transfer_command(request)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractionError::InvalidOutput("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractionError::InvalidOutput("yt-dlp stderr unavailable".into()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_done = false;
        let mut err_done = false;
        let mut cancel_closed = false;

        let mut info: Option<Value> = None;
        let mut errors: Vec<String> = Vec::new();

        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(line)) => {
                        if let Some(p) = parse_progress_line(&line) {
                            progress(p);
                        } else if line.trim_start().starts_with('{') {
                            match serde_json::from_str::<Value>(line.trim()) {
                                Ok(value) => info = Some(value),
                                Err(e) => debug!("Ignoring unparsable yt-dlp line: {}", e),
                            }
                        }
                    }
                    Ok(None) => out_done = true,
                    Err(e) => {
                        warn!("Failed to read yt-dlp stdout: {}", e);
                        out_done = true;
                    }
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(line)) => {
                        if let Some(p) = parse_progress_line(&line) {
                            progress(p);
                        } else if !line.trim().is_empty() {
                            debug!("yt-dlp: {}", line);
                            errors.push(line);
                        }
                    }
                    Ok(None) => err_done = true,
                    Err(e) => {
                        warn!("Failed to read yt-dlp stderr: {}", e);
                        err_done = true;
                    }
                },
                changed = cancel.changed(), if !cancel_closed => {
                    if changed.is_err() {
                        cancel_closed = true;
                    } else if *cancel.borrow() {
                        info!("Cancelling yt-dlp transfer for {}", request.url);
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill yt-dlp: {}", e);
                        }
                        return Err(ExtractionError::Cancelled);
                    }
                }
            }
        }

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(ExtractionError::Failed(failure_message(
                &errors.join("\n"),
                &status.to_string(),
            )));
        }

        Ok(info.unwrap_or(Value::Null))
    }

    async fn check_availability(&self) -> bool {
        let ytdlp = match probe_version(&self.program, "--version").await {
            Ok(version) => {
                info!("yt-dlp {} found at {}", version, self.program);
                true
            }
            Err(e) => {
                warn!("yt-dlp unavailable: {}", e);
                false
            }
        };

        // only needed when the chosen format merges separate audio and video streams
        if let Err(e) = probe_version("ffmpeg", "-version").await {
            warn!("ffmpeg unavailable, merged formats will fail: {}", e);
        }

        ytdlp
    }
}

/// Runs `program flag` and returns the first line it prints.
async fn probe_version(program: &str, flag: &str) -> Result<String, ExtractionError> {
    let output = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ExtractionError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ExtractionError::Failed(failure_message(
            &String::from_utf8_lossy(&output.stderr),
            &output.status.to_string(),
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// Parses a line produced by our `--progress-template`.
/// yt-dlp prints `NA` for fields it does not know yet.
fn parse_progress_line(line: &str) -> Option<ByteProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace().map(parse_byte_count);

    let downloaded = fields.next().flatten()?;
    let total = fields.next().flatten();
    let estimate = fields.next().flatten();

    Some(ByteProgress {
        downloaded,
        total: total.or(estimate),
    })
}

fn parse_byte_count(field: &str) -> Option<u64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

fn failure_message(stderr: &str, status: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    // yt-dlp prefixes the interesting lines with "ERROR:"
    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        errors.join("\n")
    } else if !lines.is_empty() {
        lines.join("\n")
    } else {
        format!("yt-dlp exited with {}", status)
    }
}
