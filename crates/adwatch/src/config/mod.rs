pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_config_or_default};
pub use schema::{Config, FetcherConfig, JobsConfig, LoggingConfig};

use std::path::PathBuf;

/// Returns the canonical config path: `~/.adwatch/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".adwatch").join("config.json"))
}
