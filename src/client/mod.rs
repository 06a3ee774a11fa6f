//! Exam-taking client: the `ExamApi` seam, its HTTP implementation, and the headless driver
//! that runs a `TakingSession` against it.

pub(crate) mod cli;
pub(crate) mod driver;
pub(crate) mod http;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::services::taking_session::{ExamSnapshot, SessionError, Submission};

#[derive(Debug, Error)]
pub(crate) enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected the request ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Server-side outcome of a recorded submission.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub(crate) struct SubmittedResult {
    pub(crate) id: String,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
}

#[async_trait]
pub(crate) trait ExamApi: Send + Sync {
    /// Starts or resumes the caller's attempt and returns the exam as a taker sees it.
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamSnapshot, ClientError>;

    async fn submit(&self, submission: &Submission) -> Result<SubmittedResult, ClientError>;
}
