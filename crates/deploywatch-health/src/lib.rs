//! deploywatch-health: content-sniffing deployment health checks.
//!
//! Polls an ordered list of candidate origins, infers deployment status and
//! content version from the returned HTML, diffs it against the last known
//! snapshot, and emits severity-tagged alerts on transitions.
//!
//! # Architecture
//!
//! ```text
//! HealthCheck (owns last-known Snapshot)
//!   ├── Fetcher → Transport (HttpTransport) → FetchOutcome
//!   ├── ContentExtractor → ContentSignature
//!   ├── diff(previous, current) → Vec<ChangeRecord>
//!   └── AlertEmitter
//!       ├── LogSink (WARN per change, ALERT escalation)
//!       └── Notifier (webhook, ...)
//! ```
//!
//! # Run modes
//!
//! `HealthCheck::run` checks immediately and then once per interval until a
//! shutdown signal arrives. `HealthCheck::run_once` checks once and returns a
//! `HealthVerdict` whose exit code is 0 only when the deployment is ready,
//! shows the expected content markers, and does not show legacy markers.

pub mod alert;
pub mod differ;
pub mod extractor;
pub mod fetcher;
pub mod monitor;
pub mod sink;

pub use alert::{AlertEmitter, AlertPolicy, Notifier, NotifyError, WebhookNotifier};
pub use differ::diff;
pub use extractor::ContentExtractor;
pub use fetcher::{FetchOutcome, Fetcher, HttpTransport, Transport, TransportError};
pub use monitor::{CycleReport, HealthCheck, HealthIssue, HealthVerdict, MonitorState};
pub use sink::{LogLevel, LogSink};
