use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Target audio format and quality are usable
/// - Retention window and progress buffer are not zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.fetcher.audio_format.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "fetcher.audio_format cannot be empty".to_string(),
        ));
    }

    if config.fetcher.audio_quality_kbps == 0 {
        return Err(ConfigError::ValidationError(
            "fetcher.audio_quality_kbps cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.retention_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.retention_ms cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.progress_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.progress_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
