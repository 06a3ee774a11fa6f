//! Client-side state of one student working through one exam.
//!
//! The session owns the countdown and the answer map and hands out the submission payload
//! exactly once, either when the student submits or when the countdown reaches zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::types::QuestionType;

pub(crate) const URGENT_BELOW_SECONDS: u64 = 300;
pub(crate) const WARNING_BELOW_SECONDS: u64 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SessionError {
    #[error("exam definition is not valid for taking: {0}")]
    InvalidExam(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct TakingQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(rename = "type", default)]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Vec<String>,
}

/// What the taker knows about the exam: no answer key, only content and timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExamSnapshot {
    pub(crate) exam_id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Vec<TakingQuestion>,
    /// Server-computed time left when resuming an attempt.
    pub(crate) remaining_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct Submission {
    pub(crate) exam_id: String,
    pub(crate) answers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitTrigger {
    Manual,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Running,
    Submitted(SubmitTrigger),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeUrgency {
    Normal,
    Warning,
    Urgent,
}

impl TimeUrgency {
    pub(crate) fn from_remaining(seconds: u64) -> Self {
        if seconds < URGENT_BELOW_SECONDS {
            Self::Urgent
        } else if seconds < WARNING_BELOW_SECONDS {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// `m:ss`, minutes unpadded.
pub(crate) fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug)]
pub(crate) struct TakingSession {
    exam_id: String,
    remaining: u64,
    answers: BTreeMap<String, String>,
    state: SessionState,
}

impl TakingSession {
    pub(crate) fn start(exam: &ExamSnapshot) -> Result<Self, SessionError> {
        let total = full_duration_seconds(exam)?;
        Ok(Self::running(exam, total))
    }

    /// Like `start`, but honours time already spent on a server-side attempt.
    pub(crate) fn resume(exam: &ExamSnapshot) -> Result<Self, SessionError> {
        let total = full_duration_seconds(exam)?;
        let remaining = exam.remaining_seconds.map_or(total, |left| left.min(total));
        Ok(Self::running(exam, remaining))
    }

    fn running(exam: &ExamSnapshot, remaining: u64) -> Self {
        Self {
            exam_id: exam.exam_id.clone(),
            remaining,
            answers: BTreeMap::new(),
            state: SessionState::Running,
        }
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub(crate) fn is_submitted(&self) -> bool {
        matches!(self.state, SessionState::Submitted(_))
    }

    /// Advances the countdown by one second. Returns the submission on the tick that
    /// reaches zero, and never again.
    pub(crate) fn tick(&mut self) -> Option<Submission> {
        if self.is_submitted() {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return Some(self.finish(SubmitTrigger::Expired));
        }
        None
    }

    /// Last write wins. Returns false once the session is submitted.
    pub(crate) fn answer(&mut self, question_id: impl Into<String>, value: impl Into<String>) -> bool {
        if self.is_submitted() {
            return false;
        }
        self.answers.insert(question_id.into(), value.into());
        true
    }

    pub(crate) fn submit(&mut self) -> Option<Submission> {
        if self.is_submitted() {
            return None;
        }
        Some(self.finish(SubmitTrigger::Manual))
    }

    fn finish(&mut self, trigger: SubmitTrigger) -> Submission {
        self.state = SessionState::Submitted(trigger);
        Submission { exam_id: self.exam_id.clone(), answers: self.answers.clone() }
    }
}

fn full_duration_seconds(exam: &ExamSnapshot) -> Result<u64, SessionError> {
    if exam.exam_id.trim().is_empty() {
        return Err(SessionError::InvalidExam("missing exam id"));
    }
    if exam.duration_minutes <= 0 {
        return Err(SessionError::InvalidExam("duration must be positive"));
    }
    Ok(exam.duration_minutes as u64 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(duration_minutes: i32) -> ExamSnapshot {
        ExamSnapshot {
            exam_id: "exam-1".to_string(),
            title: "Algorithms quiz".to_string(),
            duration_minutes,
            questions: vec![
                TakingQuestion {
                    id: "q1".to_string(),
                    text: "First".to_string(),
                    question_type: QuestionType::MultipleChoice,
                    options: vec!["a".to_string(), "b".to_string()],
                },
                TakingQuestion {
                    id: "q2".to_string(),
                    text: "Second".to_string(),
                    question_type: QuestionType::MultipleChoice,
                    options: vec!["a".to_string(), "b".to_string()],
                },
            ],
            remaining_seconds: None,
        }
    }

    #[test]
    fn start_sets_sixty_seconds_per_minute() {
        for minutes in [1, 2, 45, 180] {
            let session = TakingSession::start(&snapshot(minutes)).expect("start");
            assert_eq!(session.remaining(), minutes as u64 * 60);
            assert_eq!(session.state(), SessionState::Running);
        }
    }

    #[test]
    fn invalid_exam_blocks_the_session() {
        assert!(TakingSession::start(&snapshot(0)).is_err());
        assert!(TakingSession::start(&snapshot(-3)).is_err());

        let mut missing_id = snapshot(10);
        missing_id.exam_id = " ".to_string();
        assert_eq!(
            TakingSession::start(&missing_id).unwrap_err(),
            SessionError::InvalidExam("missing exam id")
        );
    }

    #[test]
    fn sixty_ticks_submit_exactly_once() {
        let mut session = TakingSession::start(&snapshot(1)).expect("start");
        let mut submissions = Vec::new();

        for _ in 0..60 {
            if let Some(submission) = session.tick() {
                submissions.push(submission);
            }
        }
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].answers.is_empty());
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.state(), SessionState::Submitted(SubmitTrigger::Expired));

        for _ in 0..10 {
            assert!(session.tick().is_none());
        }
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn ticks_decrement_by_one() {
        let mut session = TakingSession::start(&snapshot(1)).expect("start");
        for expected in (1..60).rev() {
            assert!(session.tick().is_none());
            assert_eq!(session.remaining(), expected);
        }
    }

    #[test]
    fn expiry_submits_partial_answers() {
        let mut session = TakingSession::start(&snapshot(1)).expect("start");
        session.answer("q1", "0");
        let submission = (0..60).find_map(|_| session.tick()).expect("auto submission");
        assert_eq!(submission.exam_id, "exam-1");
        assert_eq!(submission.answers.get("q1").map(String::as_str), Some("0"));
        assert!(!submission.answers.contains_key("q2"));
    }

    #[test]
    fn answers_are_last_write_wins() {
        let mut session = TakingSession::start(&snapshot(5)).expect("start");
        assert!(session.answer("q1", "0"));
        assert!(session.answer("q1", "1"));
        assert_eq!(session.answers().get("q1").map(String::as_str), Some("1"));
    }

    #[test]
    fn manual_submit_is_single_shot() {
        let mut session = TakingSession::start(&snapshot(5)).expect("start");
        session.answer("q1", "1");

        let first = session.submit().expect("first submit");
        assert_eq!(first.answers.len(), 1);
        assert!(session.submit().is_none());
        assert!(session.submit().is_none());
        assert!(session.tick().is_none());
        assert_eq!(session.state(), SessionState::Submitted(SubmitTrigger::Manual));
    }

    #[test]
    fn answers_after_submission_are_ignored() {
        let mut session = TakingSession::start(&snapshot(5)).expect("start");
        session.submit();
        assert!(!session.answer("q2", "1"));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn resume_caps_remaining_to_duration() {
        let mut exam = snapshot(1);
        exam.remaining_seconds = Some(42);
        assert_eq!(TakingSession::resume(&exam).expect("resume").remaining(), 42);

        exam.remaining_seconds = Some(10_000);
        assert_eq!(TakingSession::resume(&exam).expect("resume").remaining(), 60);

        exam.remaining_seconds = None;
        assert_eq!(TakingSession::resume(&exam).expect("resume").remaining(), 60);
    }

    #[test]
    fn resume_with_no_time_left_expires_on_next_tick() {
        let mut exam = snapshot(1);
        exam.remaining_seconds = Some(0);
        let mut session = TakingSession::resume(&exam).expect("resume");
        assert!(session.tick().is_some());
    }

    #[test]
    fn display_format_is_minutes_and_padded_seconds() {
        assert_eq!(format_remaining(3600), "60:00");
        assert_eq!(format_remaining(605), "10:05");
        assert_eq!(format_remaining(59), "0:59");
        assert_eq!(format_remaining(0), "0:00");
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(TimeUrgency::from_remaining(299), TimeUrgency::Urgent);
        assert_eq!(TimeUrgency::from_remaining(300), TimeUrgency::Warning);
        assert_eq!(TimeUrgency::from_remaining(599), TimeUrgency::Warning);
        assert_eq!(TimeUrgency::from_remaining(600), TimeUrgency::Normal);
        assert_eq!(TimeUrgency::from_remaining(0), TimeUrgency::Urgent);
    }
}
