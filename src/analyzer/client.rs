//! Blocking HTTP client for the analysis service
//!
//! The orchestrator side of the wire protocol. Requests carry a timeout
//! proportional to batch size and are made exactly once; the single
//! bounded retry per batch lives with the callers (index and call-graph
//! builders), so transport failures surface here unretried.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::AnalyzerError;

use super::AnalysisBackend;
use super::wire::{
    AnalyzeRequest, AnalyzeResponse, ClassRecord, HealthResponse, IndexBatchRequest,
    IndexBatchResponse, IndexResult, ShutdownResponse,
};

/// Base timeout for any request.
const BASE_TIMEOUT: Duration = Duration::from_secs(30);
/// Additional allowance per class file in a batch.
const PER_FILE_TIMEOUT: Duration = Duration::from_millis(100);

pub struct HttpAnalyzer {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpAnalyzer {
    /// `base_url` is the service root, e.g. `http://127.0.0.1:8766`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: ureq::agent(),
        }
    }

    /// Poll `/health` until the service answers, with doubling backoff.
    pub fn wait_ready(&self, attempts: u32) -> Result<HealthResponse, AnalyzerError> {
        let mut delay = Duration::from_millis(250);
        let mut last_error = AnalyzerError::Unavailable("no attempts made".to_string());
        for _ in 0..attempts {
            match self.health() {
                Ok(health) => return Ok(health),
                Err(e) => {
                    debug!(error = %e, "analyzer not ready yet");
                    last_error = e;
                }
            }
            std::thread::sleep(delay);
            delay = delay.saturating_mul(2);
        }
        Err(last_error)
    }

    /// Ask the service to exit after its grace period.
    pub fn shutdown(&self) -> Result<ShutdownResponse, AnalyzerError> {
        let url = format!("{}/shutdown", self.base_url);
        let response = self
            .agent
            .post(&url)
            .timeout(BASE_TIMEOUT)
            .call()
            .map_err(map_error)?;
        response
            .into_json()
            .map_err(|e| AnalyzerError::Protocol(e.to_string()))
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<R, AnalyzerError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .post(&url)
            .timeout(timeout)
            .send_json(body)
            .map_err(map_error)?;
        response
            .into_json()
            .map_err(|e| AnalyzerError::Protocol(e.to_string()))
    }
}

fn map_error(error: ureq::Error) -> AnalyzerError {
    match error {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            AnalyzerError::Http { status, body }
        }
        ureq::Error::Transport(transport) => AnalyzerError::Unavailable(transport.to_string()),
    }
}

fn batch_timeout(files: usize) -> Duration {
    BASE_TIMEOUT + PER_FILE_TIMEOUT.saturating_mul(files as u32)
}

impl AnalysisBackend for HttpAnalyzer {
    fn health(&self) -> Result<HealthResponse, AnalyzerError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .agent
            .get(&url)
            .timeout(Duration::from_secs(5))
            .call()
            .map_err(map_error)?;
        response
            .into_json()
            .map_err(|e| AnalyzerError::Protocol(e.to_string()))
    }

    fn index_batch(&self, class_files: &[String]) -> Result<Vec<IndexResult>, AnalyzerError> {
        let request = IndexBatchRequest {
            class_files: class_files.to_vec(),
        };
        let response: IndexBatchResponse =
            self.post_json("/index/batch", &request, batch_timeout(class_files.len()))?;
        Ok(response.results)
    }

    fn analyze_files(
        &self,
        class_files: &[String],
        domains: &[String],
    ) -> Result<Vec<ClassRecord>, AnalyzerError> {
        let request = AnalyzeRequest {
            class_files: Some(class_files.to_vec()),
            domains: domains.to_vec(),
            ..AnalyzeRequest::default()
        };
        let response: AnalyzeResponse =
            self.post_json("/analyze", &request, batch_timeout(class_files.len()))?;
        Ok(response.classes)
    }
}
