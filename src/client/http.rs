use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::client::{ClientError, ExamApi, SubmittedResult};
use crate::core::time::parse_rfc3339;
use crate::services::taking_session::{ExamSnapshot, Submission, TakingQuestion};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Deserialize)]
struct AttemptStartBody {
    exam: ExamBody,
    attempt: AttemptBody,
    #[serde(default)]
    remaining_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ExamBody {
    id: String,
    title: String,
    duration_minutes: i32,
    #[serde(default)]
    questions: Vec<TakingQuestion>,
}

#[derive(Debug, Deserialize)]
struct AttemptBody {
    expires_at: String,
}

/// `ExamApi` over the REST surface, authenticated with a bearer token.
#[derive(Debug, Clone)]
pub(crate) struct HttpExamApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpExamApi {
    pub(crate) fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamSnapshot, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/exams/{exam_id}/attempts")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: AttemptStartBody = decode(response).await?;

        let remaining = remaining_until(&body.attempt.expires_at, OffsetDateTime::now_utc())
            .or_else(|| body.remaining_seconds.map(|seconds| seconds.max(0) as u64));

        Ok(ExamSnapshot {
            exam_id: body.exam.id,
            title: body.exam.title,
            duration_minutes: body.exam.duration_minutes,
            questions: body.exam.questions,
            remaining_seconds: remaining,
        })
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmittedResult, ClientError> {
        let response = self
            .client
            .post(self.url("/results"))
            .bearer_auth(&self.token)
            .json(submission)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let raw_body = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::Api { status: status.as_u16(), detail: error_detail(&raw_body) });
    }

    serde_json::from_str(&raw_body)
        .map_err(|err| ClientError::Decode(format!("{err} (status {status})")))
}

fn error_detail(raw_body: &str) -> String {
    serde_json::from_str::<Value>(raw_body)
        .ok()
        .and_then(|parsed| parsed.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| raw_body.trim().to_string())
}

/// Whole seconds left on an attempt deadline, clamped at zero.
fn remaining_until(expires_at: &str, now: OffsetDateTime) -> Option<u64> {
    let deadline = parse_rfc3339(expires_at)?;
    Some((deadline - now).whole_seconds().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn remaining_is_measured_from_the_deadline() {
        let now = datetime!(2026-03-01 10:00:00 UTC);
        assert_eq!(remaining_until("2026-03-01T10:30:00Z", now), Some(1800));
        assert_eq!(remaining_until("2026-03-01T09:59:00Z", now), Some(0));
        assert_eq!(remaining_until("soon", now), None);
    }

    #[test]
    fn error_detail_prefers_the_api_message() {
        assert_eq!(error_detail(r#"{"detail":"Attempt has expired"}"#), "Attempt has expired");
        assert_eq!(error_detail(" bad gateway \n"), "bad gateway");
    }

    #[test]
    fn attempt_start_body_matches_the_server_shape() {
        let body: AttemptStartBody = serde_json::from_value(serde_json::json!({
            "exam": {
                "id": "exam-1",
                "title": "Quiz",
                "instructions": "",
                "duration_minutes": 30,
                "surveillance": false,
                "subject_id": "s1",
                "status": "published",
                "questions": [{"id": "q1", "text": "Pick", "type": "multiple-choice", "options": ["a", "b"]}]
            },
            "attempt": {
                "id": "a1",
                "exam_id": "exam-1",
                "status": "active",
                "started_at": "2026-03-01T10:00:00Z",
                "expires_at": "2026-03-01T10:30:00Z",
                "submitted_at": null
            },
            "remaining_seconds": 1800
        }))
        .expect("decode");

        assert_eq!(body.exam.questions.len(), 1);
        assert_eq!(body.exam.questions[0].options, vec!["a", "b"]);
        assert_eq!(body.remaining_seconds, Some(1800));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpExamApi::new("http://exams.test/api/v1/", "token").expect("client");
        assert_eq!(api.url("/results"), "http://exams.test/api/v1/results");
    }
}
