use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use reqwest::Client;

use exam_core::model::{Exam, ExamId, SubjectId, Unit, UnitId};

use crate::error::ContentError;

/// Read-only source of exams and units.
///
/// The engine never writes through this interface; authoring happens in an
/// out-of-scope CMS.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch an exam record with its questions.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the record is missing, the request fails, or
    /// the payload is malformed.
    async fn get_exam(&self, id: &ExamId) -> Result<Exam, ContentError>;

    /// Fetch a unit record with its nested lessons and exercises.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the record is missing, the request fails, or
    /// the payload is malformed.
    async fn get_unit(&self, id: &UnitId, subject_id: &SubjectId) -> Result<Unit, ContentError>;
}

/// Content store backed by the platform's HTTP API.
#[derive(Clone)]
pub struct HttpContentStore {
    client: Client,
    base_url: String,
}

impl HttpContentStore {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Build from the `EXAM_CONTENT_URL` environment variable.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EXAM_CONTENT_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url))
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn get_exam(&self, id: &ExamId) -> Result<Exam, ContentError> {
        let url = format!("{}/exams/{id}", self.base_url);
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound);
        }
        if !response.status().is_success() {
            return Err(ContentError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }

    async fn get_unit(&self, id: &UnitId, subject_id: &SubjectId) -> Result<Unit, ContentError> {
        let url = format!("{}/subjects/{subject_id}/units/{id}", self.base_url);
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound);
        }
        if !response.status().is_success() {
            return Err(ContentError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }
}

/// In-memory content store for tests and offline runs.
#[derive(Clone, Default)]
pub struct FixtureContentStore {
    exams: HashMap<ExamId, Exam>,
    units: HashMap<(SubjectId, UnitId), Unit>,
}

impl FixtureContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_exam(mut self, exam: Exam) -> Self {
        self.exams.insert(exam.id.clone(), exam);
        self
    }

    #[must_use]
    pub fn with_unit(mut self, subject_id: SubjectId, unit_id: UnitId, unit: Unit) -> Self {
        self.units.insert((subject_id, unit_id), unit);
        self
    }
}

#[async_trait]
impl ContentStore for FixtureContentStore {
    async fn get_exam(&self, id: &ExamId) -> Result<Exam, ContentError> {
        self.exams.get(id).cloned().ok_or(ContentError::NotFound)
    }

    async fn get_unit(&self, id: &UnitId, subject_id: &SubjectId) -> Result<Unit, ContentError> {
        self.units
            .get(&(subject_id.clone(), id.clone()))
            .cloned()
            .ok_or(ContentError::NotFound)
    }
}
