use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::info;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// A missing file is not an error: defaults plus environment are used, so the
/// service can run from `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET` alone.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        info!("Config file {:?} not found, using defaults", path);
    }

    figment
        .merge(spotify_env())
        .merge(Env::prefixed("MIXTAPE_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// The conventional Spotify credential variables, mapped onto the `[spotify]` section.
fn spotify_env() -> Env {
    Env::raw().filter_map(|key| {
        if key.as_str().eq_ignore_ascii_case("SPOTIFY_CLIENT_ID") {
            Some("spotify.client_id".into())
        } else if key.as_str().eq_ignore_ascii_case("SPOTIFY_CLIENT_SECRET") {
            Some("spotify.client_secret".into())
        } else {
            None
        }
    })
}
