//! Monitor configuration: built-in defaults, an optional `deploywatch.toml`
//! file layered on top, and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default interval between check cycles in continuous mode.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// Default per-candidate request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_CANDIDATES: &[&str] = &[
    "kidsbook.dev",
    "www.kidsbook.dev",
    "the-real-mermaids-interactive-book-git-main-bitzkowitz26s-projects.vercel.app",
];

pub const DEFAULT_CONTENT_MARKERS: &[&str] = &["Real Mermaids", "Interactive Book", "Raquel"];

pub const DEFAULT_LEGACY_MARKERS: &[&str] = &["Create Amazing Stories"];

/// On-disk config file. Every field is optional and overrides the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchFile {
    pub check_interval: Option<String>,
    pub request_timeout: Option<String>,
    pub alert_on_rollback: Option<bool>,
    pub alert_on_failure: Option<bool>,
    pub log_file: Option<PathBuf>,
    pub candidates: Option<Vec<String>>,
    pub markers: Option<MarkersFile>,
    pub notify: Option<NotifyConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkersFile {
    pub content: Option<Vec<String>>,
    pub legacy: Option<Vec<String>>,
}

impl WatchFile {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Substrings that identify which version of the site is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMarkers {
    /// Any of these present means the expected content is live.
    pub content: Vec<String>,
    /// Any of these present means the legacy design is live.
    pub legacy: Vec<String>,
}

impl Default for ContentMarkers {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT_MARKERS.iter().map(|s| s.to_string()).collect(),
            legacy: DEFAULT_LEGACY_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// External notification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// POST a JSON payload here for every change not suppressed by the alert policy.
    pub webhook_url: Option<String>,
}

/// Resolved monitor configuration. Built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub project_name: String,
    pub check_interval: Duration,
    pub request_timeout: Duration,
    pub alert_on_rollback: bool,
    pub alert_on_failure: bool,
    /// Append-only log file. `None` logs to stdout only.
    pub log_file: Option<PathBuf>,
    /// Ordered candidate origins, tried first to last.
    pub candidates: Vec<String>,
    pub markers: ContentMarkers,
    pub notify: NotifyConfig,
}

impl MonitorConfig {
    /// Defaults for a project.
    pub fn new(project_name: &str) -> Self {
        Self {
            project_name: project_name.to_string(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            alert_on_rollback: true,
            alert_on_failure: true,
            log_file: Some(default_log_file(project_name)),
            candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            markers: ContentMarkers::default(),
            notify: NotifyConfig::default(),
        }
    }

    /// Defaults for a project with a config file layered on top.
    pub fn from_file(project_name: &str, path: &Path) -> ConfigResult<Self> {
        let mut config = Self::new(project_name);
        config.apply_file(WatchFile::from_file(path)?)?;
        Ok(config)
    }

    /// Override fields present in `file`.
    pub fn apply_file(&mut self, file: WatchFile) -> ConfigResult<()> {
        if let Some(raw) = file.check_interval {
            self.check_interval = parse_duration(&raw)
                .ok_or_else(|| ConfigError::Invalid(format!("bad check_interval: {raw:?}")))?;
        }
        if let Some(raw) = file.request_timeout {
            self.request_timeout = parse_duration(&raw)
                .ok_or_else(|| ConfigError::Invalid(format!("bad request_timeout: {raw:?}")))?;
        }
        if let Some(v) = file.alert_on_rollback {
            self.alert_on_rollback = v;
        }
        if let Some(v) = file.alert_on_failure {
            self.alert_on_failure = v;
        }
        if let Some(path) = file.log_file {
            self.log_file = Some(path);
        }
        if let Some(candidates) = file.candidates {
            self.candidates = candidates;
        }
        if let Some(markers) = file.markers {
            if let Some(content) = markers.content {
                self.markers.content = content;
            }
            if let Some(legacy) = markers.legacy {
                self.markers.legacy = legacy;
            }
        }
        if let Some(notify) = file.notify {
            self.notify = notify;
        }
        Ok(())
    }

    /// Reject configurations the monitor cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::Invalid("project name is empty".into()));
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::Invalid("check interval must be non-zero".into()));
        }
        if self.candidates.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid("no candidate origins configured".into()));
        }
        if self.markers.content.iter().all(|m| m.is_empty()) {
            return Err(ConfigError::Invalid("no content markers configured".into()));
        }
        Ok(())
    }

    /// Candidate origins as request URLs, in priority order.
    pub fn candidate_urls(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(candidate_url)
            .collect()
    }
}

/// `deployment-monitor-<project>.log`
pub fn default_log_file(project_name: &str) -> PathBuf {
    PathBuf::from(format!("deployment-monitor-{project_name}.log"))
}

/// Bare hostnames become `https://<host>/`; full URLs pass through.
pub fn candidate_url(candidate: &str) -> String {
    if candidate.starts_with("https://") || candidate.starts_with("http://") {
        candidate.to_string()
    } else {
        format!("https://{}/", candidate.trim_end_matches('/'))
    }
}

/// Parse a duration string like "5s", "500ms", "5m", or plain seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
