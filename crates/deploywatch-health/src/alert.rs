//! Alert rendering and delivery.
//!
//! Every change record is written to the log sink at `WARN`. High-severity
//! records additionally get an `ALERT` escalation line, and every record
//! that is not suppressed by the alert policy is handed to each registered
//! `Notifier`. Notifier failures are logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use deploywatch_core::{ChangeKind, ChangeRecord, MonitorConfig};

use crate::sink::LogSink;

/// Escalation line written at `ALERT` for high-severity records.
pub const ESCALATION_MESSAGE: &str = "HIGH SEVERITY ALERT - Manual intervention may be required";

/// Appended to design changes that land on the legacy design.
pub const LEGACY_DESIGN_MARKER: &str = "OLD DESIGN DETECTED!";

/// Human-readable message for a change record.
pub fn render(change: &ChangeRecord) -> String {
    match change.kind {
        ChangeKind::StatusChange => {
            format!("DEPLOYMENT STATUS CHANGED: {} -> {}", change.from, change.to)
        }
        ChangeKind::ContentChange => format!(
            "CONTENT CHANGED ({}): \"{}\" -> \"{}\"",
            change.field.as_deref().unwrap_or("content"),
            change.from,
            change.to
        ),
        ChangeKind::DesignChange => {
            let mut message = format!("DESIGN CHANGED: {} -> {}", change.from, change.to);
            if change.is_rollback() {
                message.push(' ');
                message.push_str(LEGACY_DESIGN_MARKER);
            }
            message
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("rejected with status {0}")]
    Rejected(u16),
}

/// Pluggable external alert channel (chat, email, pager...).
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, change: &ChangeRecord) -> Result<(), NotifyError>;
}

/// POSTs `{"text": <message>, "change": <record>}` to a webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, change: &ChangeRecord) -> Result<(), NotifyError> {
        let payload = json!({
            "text": render(change),
            "change": change,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        debug!(url = %self.url, kind = %change.kind, "webhook notified");
        Ok(())
    }
}

/// Which escalations are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub alert_on_rollback: bool,
    pub alert_on_failure: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            alert_on_rollback: true,
            alert_on_failure: true,
        }
    }
}

impl AlertPolicy {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            alert_on_rollback: config.alert_on_rollback,
            alert_on_failure: config.alert_on_failure,
        }
    }

    /// Whether escalation (ALERT line and notifiers) is disabled for `change`.
    pub fn suppresses(&self, change: &ChangeRecord) -> bool {
        (change.is_failure() && !self.alert_on_failure)
            || (change.is_rollback() && !self.alert_on_rollback)
    }
}

pub struct AlertEmitter {
    sink: Arc<LogSink>,
    policy: AlertPolicy,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl AlertEmitter {
    pub fn new(sink: Arc<LogSink>, policy: AlertPolicy) -> Self {
        Self {
            sink,
            policy,
            notifiers: Vec::new(),
        }
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub async fn emit(&self, change: &ChangeRecord) {
        self.sink.warn(render(change));

        if self.policy.suppresses(change) {
            debug!(kind = %change.kind, to = %change.to, "escalation suppressed by policy");
            return;
        }

        if change.is_high() {
            self.sink.alert(ESCALATION_MESSAGE);
        }

        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(change).await {
                self.sink
                    .error(format!("Notifier {} failed: {e}", notifier.name()));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use deploywatch_core::DeploymentStatus;

    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) seen: Mutex<Vec<ChangeRecord>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, change: &ChangeRecord) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(change.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn notify(&self, _change: &ChangeRecord) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected(503))
        }
    }

    pub(crate) fn file_sink(dir: &Path) -> Arc<LogSink> {
        Arc::new(
            LogSink::open(Some(&dir.join("monitor.log")))
                .unwrap()
                .without_echo(),
        )
    }

    pub(crate) fn read_log(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("monitor.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn render_messages() {
        let status = ChangeRecord::status(DeploymentStatus::Ready, DeploymentStatus::Error);
        assert_eq!(render(&status), "DEPLOYMENT STATUS CHANGED: ready -> error");

        let content = ChangeRecord::content("heading", "Before", "After");
        assert_eq!(
            render(&content),
            "CONTENT CHANGED (heading): \"Before\" -> \"After\""
        );

        let upgrade = ChangeRecord::design(false, true);
        assert_eq!(render(&upgrade), "DESIGN CHANGED: old -> modern");
    }

    #[test]
    fn design_regression_carries_legacy_marker() {
        let message = render(&ChangeRecord::design(true, false));
        assert!(message.starts_with("DESIGN CHANGED: modern -> old"));
        assert!(message.contains(LEGACY_DESIGN_MARKER));
    }

    #[tokio::test]
    async fn medium_change_is_warn_only() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let mut emitter = AlertEmitter::new(file_sink(dir.path()), AlertPolicy::default());
        emitter.add_notifier(notifier.clone());

        emitter.emit(&ChangeRecord::content("heading", "a", "b")).await;

        let lines = read_log(dir.path());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[WARN] CONTENT CHANGED"));
        assert_eq!(notifier.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn high_change_escalates() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = AlertEmitter::new(file_sink(dir.path()), AlertPolicy::default());

        emitter.emit(&ChangeRecord::design(true, false)).await;

        let lines = read_log(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[WARN] DESIGN CHANGED: modern -> old"));
        assert!(lines[1].ends_with(&format!("[ALERT] {ESCALATION_MESSAGE}")));
    }

    #[tokio::test]
    async fn notifier_failure_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(RecordingNotifier::default());
        let mut emitter = AlertEmitter::new(file_sink(dir.path()), AlertPolicy::default());
        emitter.add_notifier(Arc::new(FailingNotifier));
        emitter.add_notifier(recorder.clone());

        emitter
            .emit(&ChangeRecord::status(DeploymentStatus::Ready, DeploymentStatus::Error))
            .await;

        let lines = read_log(dir.path());
        assert!(lines.iter().any(|l| l.contains("[ERROR] Notifier failing failed")));
        // Later notifiers still run.
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn policy_suppresses_escalation_but_not_warning() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(RecordingNotifier::default());
        let policy = AlertPolicy {
            alert_on_rollback: false,
            alert_on_failure: false,
        };
        let mut emitter = AlertEmitter::new(file_sink(dir.path()), policy);
        emitter.add_notifier(recorder.clone());

        emitter.emit(&ChangeRecord::design(true, false)).await;
        emitter
            .emit(&ChangeRecord::status(DeploymentStatus::Ready, DeploymentStatus::Error))
            .await;

        let lines = read_log(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains("[WARN]")));
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn policy_only_targets_failures_and_rollbacks() {
        let policy = AlertPolicy {
            alert_on_rollback: false,
            alert_on_failure: false,
        };
        assert!(!policy.suppresses(&ChangeRecord::design(false, true)));
        assert!(!policy.suppresses(&ChangeRecord::status(
            DeploymentStatus::Error,
            DeploymentStatus::Ready
        )));
        assert!(!AlertPolicy::default().suppresses(&ChangeRecord::design(true, false)));
    }
}
