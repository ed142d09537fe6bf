use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::catalog::SpotifyConfig;
use crate::fetcher::{CoverFetcherConfig, YtDlpConfig};
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub fetcher: YtDlpConfig,
    #[serde(default)]
    pub covers: CoverFetcherConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub spotify: SanitizedSpotifyConfig,
    pub fetcher: SanitizedFetcherConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized Spotify config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSpotifyConfig {
    pub client_id_configured: bool,
    pub client_secret_configured: bool,
    pub timeout_secs: u64,
}

/// Media fetcher settings that are safe to expose.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetcherConfig {
    pub binary_path: PathBuf,
    pub audio_format: String,
    pub audio_quality_kbps: u32,
    pub search_prefix: String,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            spotify: SanitizedSpotifyConfig {
                client_id_configured: !config.spotify.client_id.is_empty(),
                client_secret_configured: !config.spotify.client_secret.is_empty(),
                timeout_secs: config.spotify.timeout_secs,
            },
            fetcher: SanitizedFetcherConfig {
                binary_path: config.fetcher.binary_path.clone(),
                audio_format: config.fetcher.audio_format.clone(),
                audio_quality_kbps: config.fetcher.audio_quality_kbps,
                search_prefix: config.fetcher.search_prefix.clone(),
                timeout_secs: config.fetcher.timeout_secs,
            },
            orchestrator: config.orchestrator.clone(),
        }
    }
}
