use anyhow::{Context, Result};
use time::Duration;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

/// Expires active attempts whose deadline plus the submit grace has passed. Returns how many
/// attempts were flipped.
pub(crate) async fn expire_overdue_attempts(state: &AppState) -> Result<u64> {
    let now = primitive_now_utc();
    let grace = state.settings().exam().submit_grace_period_seconds;
    let cutoff = now - Duration::seconds(grace.min(i64::MAX as u64) as i64);

    let expired = repositories::attempts::expire_overdue(state.db(), cutoff, now)
        .await
        .context("Failed to expire overdue attempts")?;

    if expired > 0 {
        tracing::info!(expired, cutoff = %cutoff, "Expired overdue attempts");
        metrics::attempts_expired(expired);
    }

    Ok(expired)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::expire_overdue_attempts;
    use crate::core::time::primitive_now_utc;
    use crate::db::types::{AttemptStatus, ExamStatus};
    use crate::repositories;
    use crate::test_support;

    #[tokio::test]
    async fn sweep_expires_only_attempts_past_grace() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let teacher = test_support::insert_teacher(ctx.state.db(), "990001").await;
        let subject = test_support::insert_subject(ctx.state.db(), "SW101", Some(&teacher.id)).await;
        let exam = test_support::insert_exam(
            ctx.state.db(),
            "Sweep",
            &subject.id,
            &teacher.id,
            test_support::two_choice_questions(),
            ExamStatus::Published,
        )
        .await;

        let now = primitive_now_utc();
        let seeds = [
            ("990002", now - Duration::minutes(5)),
            ("990003", now - Duration::seconds(10)),
            ("990004", now + Duration::minutes(10)),
        ];
        let mut students = Vec::new();
        for (digits, expires_at) in seeds {
            let student = test_support::insert_student(ctx.state.db(), digits).await;
            repositories::attempts::create(
                ctx.state.db(),
                repositories::attempts::CreateAttempt {
                    id: &format!("attempt-{digits}"),
                    exam_id: &exam.id,
                    student_id: &student.id,
                    started_at: expires_at - Duration::minutes(30),
                    expires_at,
                },
            )
            .await
            .expect("seed attempt");
            students.push(student);
        }

        let expired = expire_overdue_attempts(&ctx.state).await.expect("sweep");
        assert_eq!(expired, 1);

        let mut statuses = Vec::new();
        for student in &students {
            let attempt = repositories::attempts::find_by_exam_and_student(
                ctx.state.db(),
                &exam.id,
                &student.id,
            )
            .await
            .expect("load attempt")
            .expect("attempt exists");
            statuses.push(attempt.status);
        }
        assert_eq!(
            statuses,
            vec![AttemptStatus::Expired, AttemptStatus::Active, AttemptStatus::Active]
        );
    }
}
