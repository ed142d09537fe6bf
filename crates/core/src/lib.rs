pub mod archiver;
pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod metrics;
pub mod orchestrator;
pub mod processor;
pub mod progress;
pub mod session;
pub mod tagger;
pub mod testing;

pub use archiver::{ArchiveError, Archiver, ZipArchiver};
pub use catalog::{
    playlist_id_from_reference, CatalogError, PlaylistProvider, ResolveError, SpotifyClient,
    SpotifyConfig, TrackDescriptor, TrackResolver,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig,
};
pub use fetcher::{
    CoverError, CoverFetcher, CoverFetcherConfig, FetchError, HttpCoverFetcher, MediaFetcher,
    YtDlpConfig, YtDlpFetcher,
};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, SessionOrchestrator};
pub use processor::{TrackOutcome, TrackProcessor};
pub use progress::{ProgressChannel, ProgressEvent, ProgressPublisher, ProgressSubscription};
pub use session::{Session, SessionError, SessionRegistry, SessionStatus};
pub use tagger::{Id3TagWriter, TagError, TagWriter};
