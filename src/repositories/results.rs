use std::collections::BTreeMap;

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::ExamResult;

pub(crate) const COLUMNS: &str = "\
    id, user_id, exam_id, answers, score, correct_answers, total_questions, completed_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamResultRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) institutional_id: Option<String>,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) completed_at: PrimitiveDateTime,
}

pub(crate) struct CreateResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) answers: BTreeMap<String, String>,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) completed_at: PrimitiveDateTime,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!("SELECT {COLUMNS} FROM results WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    exam_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM results WHERE user_id = $1 AND exam_id = $2)")
        .bind(user_id)
        .bind(exam_id)
        .fetch_one(executor)
        .await
}

/// Inserts the result unless one already exists for the (user, exam) pair.
pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateResult<'_>,
) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "INSERT INTO results (
            id, user_id, exam_id, answers, score, correct_answers, total_questions, completed_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (user_id, exam_id) DO NOTHING
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.exam_id)
    .bind(Json(params.answers))
    .bind(params.score)
    .bind(params.correct_answers)
    .bind(params.total_questions)
    .bind(params.completed_at)
    .fetch_optional(executor)
    .await
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    user_id: Option<&str>,
    exam_id: Option<&str>,
) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id.to_string());
    }
    if let Some(exam_id) = exam_id {
        builder.push(" AND exam_id = ");
        builder.push_bind(exam_id.to_string());
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    user_id: Option<&str>,
    exam_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamResult>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM results"));
    push_filters(&mut builder, user_id, exam_id);
    builder.push(" ORDER BY completed_at DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ExamResult>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    user_id: Option<&str>,
    exam_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM results");
    push_filters(&mut builder, user_id, exam_id);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_for_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<ExamResultRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamResultRow>(
        "SELECT r.id,
                r.user_id,
                u.first_name,
                u.last_name,
                u.institutional_id,
                r.score,
                r.correct_answers,
                r.total_questions,
                r.completed_at
         FROM results r
         JOIN users u ON u.id = r.user_id
         WHERE r.exam_id = $1
         ORDER BY r.score DESC, u.last_name, u.first_name",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}
