use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, started_at, expires_at, submitted_at, status, \
    created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
}

pub(crate) async fn find_by_exam_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE exam_id = $1 AND student_id = $2"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

/// Returns false when another request already created the attempt for this pair.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_attempts (
            id, exam_id, student_id, started_at, expires_at, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$4,$4)
        ON CONFLICT (exam_id, student_id) DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.exam_id)
    .bind(attempt.student_id)
    .bind(attempt.started_at)
    .bind(attempt.expires_at)
    .bind(AttemptStatus::Active)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves an active attempt to submitted. False when it was no longer active.
pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_attempts SET status = $1, submitted_at = $2, updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(AttemptStatus::Submitted)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::Active)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn mark_expired(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_attempts SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
    )
    .bind(AttemptStatus::Expired)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::Active)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Expires every active attempt whose deadline is at or before `cutoff`.
pub(crate) async fn expire_overdue(
    pool: &PgPool,
    cutoff: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_attempts SET status = $1, updated_at = $2
         WHERE status = $3 AND expires_at <= $4",
    )
    .bind(AttemptStatus::Expired)
    .bind(now)
    .bind(AttemptStatus::Active)
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
