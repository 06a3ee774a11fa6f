use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{Exam, Question};
use crate::db::types::ExamStatus;

pub(crate) const COLUMNS: &str = "\
    id, title, instructions, duration_minutes, surveillance, questions, created_by, \
    subject_id, status, is_active, created_at, updated_at, published_at, closed_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn title_taken(
    pool: &PgPool,
    title: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM exams WHERE title = $1 AND ($2::text IS NULL OR id <> $2)
        )",
    )
    .bind(title)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) instructions: &'a str,
    pub(crate) duration_minutes: i32,
    pub(crate) surveillance: bool,
    pub(crate) questions: Vec<Question>,
    pub(crate) created_by: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, instructions, duration_minutes, surveillance, questions,
            created_by, subject_id, status, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,TRUE,$10,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.instructions)
    .bind(params.duration_minutes)
    .bind(params.surveillance)
    .bind(Json(params.questions))
    .bind(params.created_by)
    .bind(params.subject_id)
    .bind(ExamStatus::Draft)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateExam<'a> {
    pub(crate) title: &'a str,
    pub(crate) instructions: &'a str,
    pub(crate) duration_minutes: i32,
    pub(crate) surveillance: bool,
    pub(crate) questions: Vec<Question>,
    pub(crate) subject_id: &'a str,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Replaces exam content while it is still a draft. `None` means the exam is gone or no longer
/// a draft.
pub(crate) async fn update_draft(
    pool: &PgPool,
    id: &str,
    params: UpdateExam<'_>,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = $1,
            instructions = $2,
            duration_minutes = $3,
            surveillance = $4,
            questions = $5,
            subject_id = $6,
            updated_at = $7
         WHERE id = $8 AND status = $9
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.instructions)
    .bind(params.duration_minutes)
    .bind(params.surveillance)
    .bind(Json(params.questions))
    .bind(params.subject_id)
    .bind(params.updated_at)
    .bind(id)
    .bind(ExamStatus::Draft)
    .fetch_optional(pool)
    .await
}

/// Compare-and-set status change. Returns `None` when the stored status is no longer `from`.
pub(crate) async fn transition_status(
    pool: &PgPool,
    id: &str,
    from: ExamStatus,
    to: ExamStatus,
    is_active: bool,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            status = $1,
            is_active = $2,
            published_at = CASE WHEN $1 = 'published'::examstatus THEN $3 ELSE published_at END,
            closed_at = CASE WHEN $1 = 'closed'::examstatus THEN $3 ELSE closed_at END,
            updated_at = $3
         WHERE id = $4 AND status = $5
         RETURNING {COLUMNS}",
    ))
    .bind(to)
    .bind(is_active)
    .bind(now)
    .bind(id)
    .bind(from)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_results(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

/// Filters for exam listings. `student_id` restricts to published exams of enrolled subjects.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ExamFilter<'a> {
    pub(crate) subject_id: Option<&'a str>,
    pub(crate) status: Option<ExamStatus>,
    pub(crate) student_id: Option<&'a str>,
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: ExamFilter<'_>) {
    builder.push(" WHERE TRUE");
    if let Some(subject_id) = filter.subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id.to_string());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(student_id) = filter.student_id {
        builder.push(" AND status = ");
        builder.push_bind(ExamStatus::Published);
        builder.push(" AND subject_id IN (SELECT subject_id FROM subject_enrollments WHERE student_id = ");
        builder.push_bind(student_id.to_string());
        builder.push(")");
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: ExamFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exams"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: ExamFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams");
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
