//! Candidate fetching.
//!
//! Issues a plain GET against each candidate origin in priority order and
//! returns the first body that arrives without a transport error. Any HTTP
//! status counts as a response; only connection, TLS, timeout, and body
//! errors fall through to the next candidate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Why a single candidate attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// A single GET against a URL, returning the response body as text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, TransportError>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        debug!(%url, status = %response.status(), "candidate responded");

        response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

/// A candidate that was tried and failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub url: String,
    pub error: TransportError,
}

/// Result of walking the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `url` answered with `body`. `failures` lists the candidates tried before it.
    Fetched {
        url: String,
        body: String,
        failures: Vec<CandidateFailure>,
    },
    /// Every candidate failed.
    Unreachable { failures: Vec<CandidateFailure> },
}

impl FetchOutcome {
    pub fn failures(&self) -> &[CandidateFailure] {
        match self {
            FetchOutcome::Fetched { failures, .. } | FetchOutcome::Unreachable { failures } => {
                failures
            }
        }
    }
}

/// Sequential fallback across an ordered candidate list.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    candidates: Vec<String>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, candidates: Vec<String>) -> Self {
        Self {
            transport,
            candidates,
        }
    }

    /// Try each candidate once, in order.
    pub async fn fetch(&self) -> FetchOutcome {
        let mut failures = Vec::new();

        for url in &self.candidates {
            match self.transport.get(url).await {
                Ok(body) => {
                    return FetchOutcome::Fetched {
                        url: url.clone(),
                        body,
                        failures,
                    };
                }
                Err(error) => {
                    debug!(%url, %error, "candidate failed");
                    failures.push(CandidateFailure {
                        url: url.clone(),
                        error,
                    });
                }
            }
        }

        FetchOutcome::Unreachable { failures }
    }
}
