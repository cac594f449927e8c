//! Snapshot and change-record types shared across deploywatch crates.
//!
//! A `Snapshot` is one point-in-time observation of a deployment. The
//! differ compares two consecutive snapshots and produces `ChangeRecord`s,
//! which live only for the cycle that produced them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Snapshot ───────────────────────────────────────────────────────

/// Deployment status inferred from a check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// At least one candidate origin responded.
    Ready,
    /// Every candidate origin failed.
    Error,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Ready => "ready",
            DeploymentStatus::Error => "error",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags and fields derived from one fetched HTML body.
///
/// Indicates which version of the site content is currently live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSignature {
    pub title: String,
    pub heading: String,
    pub has_book_content: bool,
    pub is_modern_design: bool,
}

/// "modern" or "old", as used in design-change records.
pub fn design_label(is_modern: bool) -> &'static str {
    if is_modern { "modern" } else { "old" }
}

/// One observation of deployment status plus derived content signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: DeploymentStatus,
    pub timestamp: DateTime<Utc>,
    /// Origin that answered, if any.
    pub url: Option<String>,
    /// Present whenever a body was obtained.
    pub content: Option<ContentSignature>,
    /// Why the cycle degraded to `error`.
    pub error: Option<String>,
}

impl Snapshot {
    /// A snapshot for a cycle where `url` answered.
    pub fn ready(url: impl Into<String>, content: ContentSignature) -> Self {
        Self {
            status: DeploymentStatus::Ready,
            timestamp: Utc::now(),
            url: Some(url.into()),
            content: Some(content),
            error: None,
        }
    }

    /// A degraded snapshot for a cycle where no candidate answered.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: DeploymentStatus::Error,
            timestamp: Utc::now(),
            url: None,
            content: None,
            error: Some(reason.into()),
        }
    }

    pub fn has_book_content(&self) -> bool {
        self.content.as_ref().is_some_and(|c| c.has_book_content)
    }

    pub fn is_modern_design(&self) -> bool {
        self.content.as_ref().is_some_and(|c| c.is_modern_design)
    }
}

// ── Change records ─────────────────────────────────────────────────

/// What kind of difference a `ChangeRecord` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    StatusChange,
    ContentChange,
    DesignChange,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::StatusChange => "status_change",
            ChangeKind::ContentChange => "content_change",
            ChangeKind::DesignChange => "design_change",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

/// A single detected difference between consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    /// Which content field changed (content changes only).
    pub field: Option<String>,
    pub from: String,
    pub to: String,
    pub severity: Severity,
}

impl ChangeRecord {
    pub fn status(from: DeploymentStatus, to: DeploymentStatus) -> Self {
        let severity = if to == DeploymentStatus::Error {
            Severity::High
        } else {
            Severity::Medium
        };
        Self {
            kind: ChangeKind::StatusChange,
            field: None,
            from: from.to_string(),
            to: to.to_string(),
            severity,
        }
    }

    pub fn content(field: &str, from: &str, to: &str) -> Self {
        Self {
            kind: ChangeKind::ContentChange,
            field: Some(field.to_string()),
            from: from.to_string(),
            to: to.to_string(),
            severity: Severity::Medium,
        }
    }

    pub fn design(from_modern: bool, to_modern: bool) -> Self {
        Self {
            kind: ChangeKind::DesignChange,
            field: None,
            from: design_label(from_modern).to_string(),
            to: design_label(to_modern).to_string(),
            severity: Severity::High,
        }
    }

    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }

    /// True for a design change that lands on the legacy design.
    pub fn is_rollback(&self) -> bool {
        self.kind == ChangeKind::DesignChange && self.to == design_label(false)
    }

    /// True for a status change that lands on `error`.
    pub fn is_failure(&self) -> bool {
        self.kind == ChangeKind::StatusChange && self.to == DeploymentStatus::Error.as_str()
    }
}
