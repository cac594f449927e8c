pub mod config;
pub mod error;
pub mod types;

pub use config::{ContentMarkers, MarkersFile, MonitorConfig, NotifyConfig, WatchFile};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
