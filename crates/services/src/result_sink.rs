use std::env;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;

use exam_core::model::ExamResult;

use crate::error::ResultSubmitError;

/// Destination for graded results.
///
/// Submissions are fire-and-forget from the session's point of view: the
/// workflow logs a failure and moves on, because the score is computed
/// client-side before the network call.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Post one graded result.
    ///
    /// # Errors
    ///
    /// Returns `ResultSubmitError` on network or server failure.
    async fn submit_result(&self, result: &ExamResult) -> Result<(), ResultSubmitError>;
}

/// Result sink backed by the platform's HTTP API.
#[derive(Clone)]
pub struct HttpResultSink {
    client: Client,
    base_url: String,
}

impl HttpResultSink {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Build from the `EXAM_RESULTS_URL` environment variable.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EXAM_RESULTS_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url))
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn submit_result(&self, result: &ExamResult) -> Result<(), ResultSubmitError> {
        let url = format!("{}/results", self.base_url);
        let response = self.client.post(url).json(result).send().await?;

        if !response.status().is_success() {
            return Err(ResultSubmitError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Sink that records submissions in memory, for tests.
#[derive(Clone, Default)]
pub struct RecordingResultSink {
    results: Arc<Mutex<Vec<ExamResult>>>,
}

impl RecordingResultSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<ExamResult> {
        self.results.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ResultSink for RecordingResultSink {
    async fn submit_result(&self, result: &ExamResult) -> Result<(), ResultSubmitError> {
        if let Ok(mut guard) = self.results.lock() {
            guard.push(result.clone());
        }
        Ok(())
    }
}
