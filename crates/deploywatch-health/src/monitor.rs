//! Health-check orchestrator.
//!
//! `HealthCheck` ties fetcher, extractor, differ, and emitter into one check
//! cycle and owns the single last-known `Snapshot`. A cycle borrows the
//! orchestrator mutably, so cycles of one instance never overlap; the
//! continuous loop awaits each cycle before it observes the next tick.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use deploywatch_core::{ChangeRecord, DeploymentStatus, MonitorConfig, Snapshot};

use crate::alert::{AlertEmitter, AlertPolicy, Notifier, WebhookNotifier};
use crate::differ::diff;
use crate::extractor::ContentExtractor;
use crate::fetcher::{FetchOutcome, Fetcher, HttpTransport, Transport};
use crate::sink::LogSink;

/// Orchestrator state: `Idle → Checking → (Healthy | Alerting) → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Checking,
    Healthy,
    Alerting,
}

/// What one check cycle observed.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: Snapshot,
    pub changes: Vec<ChangeRecord>,
    /// `Healthy` or `Alerting`.
    pub outcome: MonitorState,
}

/// A condition that makes a one-shot check fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthIssue {
    NotReady(DeploymentStatus),
    MissingContent,
    LegacyDesign,
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthIssue::NotReady(status) => {
                write!(f, "Deployment not reachable (status: {status})")
            }
            HealthIssue::MissingContent => f.write_str("Missing interactive book content"),
            HealthIssue::LegacyDesign => f.write_str("Old design detected or content issues"),
        }
    }
}

/// One-shot result: healthy iff ready, modern design, and book content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    pub issues: Vec<HealthIssue>,
}

impl HealthVerdict {
    pub fn assess(snapshot: &Snapshot) -> Self {
        let mut issues = Vec::new();
        if snapshot.status != DeploymentStatus::Ready {
            issues.push(HealthIssue::NotReady(snapshot.status));
        }
        if !snapshot.has_book_content() {
            issues.push(HealthIssue::MissingContent);
        }
        if !snapshot.is_modern_design() {
            issues.push(HealthIssue::LegacyDesign);
        }
        Self { issues }
    }

    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    /// 0 when healthy, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_healthy() { 0 } else { 1 }
    }
}

pub struct HealthCheck {
    config: MonitorConfig,
    fetcher: Fetcher,
    extractor: ContentExtractor,
    emitter: AlertEmitter,
    sink: Arc<LogSink>,
    last_known: Option<Snapshot>,
    state: MonitorState,
}

impl HealthCheck {
    /// Build a monitor with the HTTP transport, the configured log file,
    /// and a webhook notifier when one is configured.
    pub fn new(config: MonitorConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        let sink = LogSink::open(config.log_file.as_deref()).with_context(|| {
            format!("failed to open log file {:?}", config.log_file)
        })?;
        let webhook = match &config.notify.webhook_url {
            Some(url) => Some(WebhookNotifier::new(url.clone(), config.request_timeout)?),
            None => None,
        };

        let mut check = Self::with_parts(config, Arc::new(transport), Arc::new(sink))?;
        if let Some(webhook) = webhook {
            check.add_notifier(Arc::new(webhook));
        }
        Ok(check)
    }

    /// Build a monitor around an explicit transport and sink.
    pub fn with_parts(
        config: MonitorConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<LogSink>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let extractor = ContentExtractor::new(config.markers.clone())?;
        let fetcher = Fetcher::new(transport, config.candidate_urls());
        let emitter = AlertEmitter::new(sink.clone(), AlertPolicy::from_config(&config));

        Ok(Self {
            config,
            fetcher,
            extractor,
            emitter,
            sink,
            last_known: None,
            state: MonitorState::Idle,
        })
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.emitter.add_notifier(notifier);
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn last_known(&self) -> Option<&Snapshot> {
        self.last_known.as_ref()
    }

    /// Fetch the candidates and build a snapshot. Never fails: an
    /// unreachable deployment yields an `error` snapshot. Leaves the state
    /// at `Checking`; `run_cycle` moves it on.
    async fn check(&mut self) -> Snapshot {
        self.state = MonitorState::Checking;
        self.sink.info(format!(
            "Checking deployment status for {}...",
            self.config.project_name
        ));

        let outcome = self.fetcher.fetch().await;
        for failure in outcome.failures() {
            self.sink
                .warn(format!("Failed to check {}: {}", failure.url, failure.error));
        }

        match outcome {
            FetchOutcome::Fetched { url, body, .. } => {
                debug!(%url, bytes = body.len(), "extracting content signature");
                Snapshot::ready(url, self.extractor.extract(&body))
            }
            FetchOutcome::Unreachable { .. } => {
                let reason = "All candidates failed";
                self.sink
                    .error(format!("Error checking deployment: {reason}"));
                Snapshot::error(reason)
            }
        }
    }

    /// Run one check cycle and replace the last-known snapshot.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.sink.info("Running deployment health check...");

        let snapshot = self.check().await;
        let changes = diff(self.last_known.as_ref(), &snapshot);

        let outcome = if changes.is_empty() {
            self.sink.info("No changes detected - deployment healthy");
            MonitorState::Healthy
        } else {
            self.state = MonitorState::Alerting;
            for change in &changes {
                self.emitter.emit(change).await;
            }
            MonitorState::Alerting
        };
        self.state = outcome;

        if let Some(content) = &snapshot.content {
            self.sink.info(format!(
                "Current status: {} | Title: \"{}\" | Book Content: {} | Design: {}",
                snapshot.status,
                content.title,
                if content.has_book_content { "Yes" } else { "No" },
                if content.is_modern_design { "Modern" } else { "Old" },
            ));
        }

        self.last_known = Some(snapshot.clone());
        self.state = MonitorState::Idle;

        CycleReport {
            snapshot,
            changes,
            outcome,
        }
    }

    /// Run exactly one cycle and judge the result.
    pub async fn run_once(&mut self) -> HealthVerdict {
        self.sink.info(format!(
            "Running one-time health check for {}",
            self.config.project_name
        ));

        let report = self.run_cycle().await;
        let verdict = HealthVerdict::assess(&report.snapshot);

        if verdict.is_healthy() {
            self.sink
                .info("Deployment is healthy - Interactive book content detected");
        } else {
            self.sink.error("Deployment issues detected");
            for issue in &verdict.issues {
                self.sink.info(format!("   - {issue}"));
            }
        }
        verdict
    }

    /// Run a cycle immediately, then one per interval, until `shutdown`
    /// flips or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.sink.info(format!(
            "Starting deployment monitor for {}",
            self.config.project_name
        ));
        self.sink.info(format!(
            "Check interval: {}s",
            self.config.check_interval.as_secs_f64()
        ));

        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.sink.info("Deployment monitor started");
        info!(project = %self.config.project_name, "monitor loop starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.changed() => {
                    debug!("monitor loop shutting down");
                    break;
                }
            }
        }

        self.sink.info("Deployment monitor stopped");
    }
}
