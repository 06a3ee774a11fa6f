use sqlx::PgPool;

use crate::db::models::User;
use crate::repositories::users;

/// Returns false when the student was already enrolled.
pub(crate) async fn enroll(
    pool: &PgPool,
    subject_id: &str,
    student_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO subject_enrollments (subject_id, student_id, enrolled_at)
         VALUES ($1, $2, $3)
         ON CONFLICT DO NOTHING",
    )
    .bind(subject_id)
    .bind(student_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn unenroll(
    pool: &PgPool,
    subject_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM subject_enrollments WHERE subject_id = $1 AND student_id = $2")
            .bind(subject_id)
            .bind(student_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn is_enrolled(
    executor: impl sqlx::PgExecutor<'_>,
    subject_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM subject_enrollments WHERE subject_id = $1 AND student_id = $2
        )",
    )
    .bind(subject_id)
    .bind(student_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_students(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<User>, sqlx::Error> {
    let columns = users::COLUMNS
        .split(',')
        .map(|column| format!("u.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");

    sqlx::query_as::<_, User>(&format!(
        "SELECT {columns} FROM users u
         JOIN subject_enrollments e ON e.student_id = u.id
         WHERE e.subject_id = $1
         ORDER BY u.last_name, u.first_name"
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_subject(pool: &PgPool, subject_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM subject_enrollments WHERE subject_id = $1")
        .bind(subject_id)
        .fetch_one(pool)
        .await
}
