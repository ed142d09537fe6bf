//! yt-dlp based media fetcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::{FetchError, MediaFetcher};

/// Configuration for the yt-dlp fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtDlpConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,

    /// Directory or binary yt-dlp should use for ffmpeg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_location: Option<PathBuf>,

    /// Target audio format (extension).
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Target audio bitrate in kbps.
    #[serde(default = "default_audio_quality")]
    pub audio_quality_kbps: u32,

    /// yt-dlp search prefix, e.g. `ytsearch` or `ytmsearch`.
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,

    /// Timeout for a single download in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional yt-dlp arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> u32 {
    320
}

fn default_search_prefix() -> String {
    "ytsearch".to_string()
}

fn default_timeout() -> u64 {
    600
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            ffmpeg_location: None,
            audio_format: default_audio_format(),
            audio_quality_kbps: default_audio_quality(),
            search_prefix: default_search_prefix(),
            timeout_secs: default_timeout(),
            extra_args: Vec::new(),
        }
    }
}

/// Fetches audio by running yt-dlp as a subprocess.
pub struct YtDlpFetcher {
    config: YtDlpConfig,
}

impl YtDlpFetcher {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(YtDlpConfig::default())
    }

    /// Check that the yt-dlp binary can be executed.
    pub async fn validate(&self) -> Result<(), FetchError> {
        let result = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(FetchError::download_failed(
                format!("yt-dlp --version exited with code: {:?}", output.status.code()),
                Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::BinaryNotFound {
                path: self.config.binary_path.clone(),
            }),
            Err(e) => Err(FetchError::Io(e)),
        }
    }

    /// Builds yt-dlp arguments for one search-and-extract run.
    fn build_args(&self, query: &str, output_base: &Path) -> Vec<String> {
        // yt-dlp treats % in the output template as a field reference
        let template = format!(
            "{}.%(ext)s",
            output_base.to_string_lossy().replace('%', "%%")
        );

        let mut args = vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            self.config.audio_format.clone(),
            "--audio-quality".to_string(),
            format!("{}K", self.config.audio_quality_kbps),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
        ];

        if let Some(ref location) = self.config.ffmpeg_location {
            args.extend([
                "--ffmpeg-location".to_string(),
                location.to_string_lossy().to_string(),
            ]);
        }

        args.extend(self.config.extra_args.iter().cloned());

        args.extend([
            "-o".to_string(),
            template,
            format!("{}:{}", self.config.search_prefix, query),
        ]);

        args
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn output_extension(&self) -> &str {
        &self.config.audio_format
    }

    async fn fetch(&self, query: &str, output_base: &Path) -> Result<PathBuf, FetchError> {
        let args = self.build_args(query, output_base);
        debug!("Running yt-dlp for '{}'", query);

        let mut child = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::BinaryNotFound {
                        path: self.config.binary_path.clone(),
                    }
                } else {
                    FetchError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::download_failed("yt-dlp stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                error_output.push_str(&line);
                error_output.push('\n');
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    let error_output = error_output.trim().to_string();
                    let reason = error_output
                        .lines()
                        .rev()
                        .find(|l| l.starts_with("ERROR"))
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("yt-dlp exited with code: {:?}", status.code()));
                    return Err(FetchError::download_failed(
                        reason,
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(FetchError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(FetchError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let mut output_path = output_base.as_os_str().to_owned();
        output_path.push(".");
        output_path.push(&self.config.audio_format);
        let output_path = PathBuf::from(output_path);

        tokio::fs::metadata(&output_path)
            .await
            .map_err(|_| FetchError::download_failed("Output file not created", None))?;

        Ok(output_path)
    }
}
