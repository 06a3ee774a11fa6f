use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::client::{ClientError, ExamApi, SubmittedResult};
use crate::services::taking_session::{
    format_remaining, SubmitTrigger, TakingSession, TimeUrgency,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Answer { question_id: String, value: String },
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    Started { title: String, questions: usize, remaining: u64 },
    Tick { remaining: u64, display: String, urgency: TimeUrgency },
    Submitted { trigger: SubmitTrigger, result: SubmittedResult },
    SubmitFailed { trigger: SubmitTrigger, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionOutcome {
    Submitted(SubmittedResult),
    Failed(String),
}

/// Runs one exam from fetch to a single submission.
///
/// The countdown keeps running when `commands` closes, so an abandoned taker still auto-submits
/// at zero. A failed submission is reported once and never retried.
pub(crate) async fn run_session<A: ExamApi + ?Sized>(
    api: &A,
    exam_id: &str,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<SessionOutcome, ClientError> {
    let exam = api.fetch_exam(exam_id).await?;
    let mut session = TakingSession::resume(&exam)?;

    emit(
        &events,
        SessionEvent::Started {
            title: exam.title.clone(),
            questions: exam.questions.len(),
            remaining: session.remaining(),
        },
    );

    let period = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut commands_open = true;

    let (submission, trigger) = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let due = session.tick();
                let remaining = session.remaining();
                emit(&events, SessionEvent::Tick {
                    remaining,
                    display: format_remaining(remaining),
                    urgency: TimeUrgency::from_remaining(remaining),
                });
                if let Some(submission) = due {
                    break (submission, SubmitTrigger::Expired);
                }
            }
            command = commands.recv(), if commands_open => match command {
                Some(SessionCommand::Answer { question_id, value }) => {
                    session.answer(question_id, value);
                }
                Some(SessionCommand::Submit) => {
                    if let Some(submission) = session.submit() {
                        break (submission, SubmitTrigger::Manual);
                    }
                }
                None => commands_open = false,
            },
        }
    };

    tracing::debug!(exam_id, ?trigger, answers = submission.answers.len(), "Submitting exam");
    match api.submit(&submission).await {
        Ok(result) => {
            emit(&events, SessionEvent::Submitted { trigger, result: result.clone() });
            Ok(SessionOutcome::Submitted(result))
        }
        Err(err) => {
            let error = err.to_string();
            tracing::warn!(exam_id, error = %error, "Exam submission failed");
            emit(&events, SessionEvent::SubmitFailed { trigger, error: error.clone() });
            Ok(SessionOutcome::Failed(error))
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    // Nobody listening is fine; the session runs regardless.
    let _ = events.send(event);
}
