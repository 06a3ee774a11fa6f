use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Subject;
use crate::db::types::CourseLevel;

pub(crate) const COLUMNS: &str = "\
    id, subject_name, subject_code, course_level, prerequisite, assigned_faculty_id, \
    created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!("SELECT {COLUMNS} FROM subjects WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn code_taken(
    pool: &PgPool,
    subject_code: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM subjects
            WHERE lower(subject_code) = lower($1) AND ($2::text IS NULL OR id <> $2)
        )",
    )
    .bind(subject_code)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    faculty_id: Option<&str>,
) -> Result<Vec<Subject>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM subjects"));
    if let Some(faculty_id) = faculty_id {
        builder.push(" WHERE assigned_faculty_id = ");
        builder.push_bind(faculty_id);
    }
    builder.push(" ORDER BY subject_code");

    builder.build_query_as::<Subject>().fetch_all(pool).await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE id IN (SELECT subject_id FROM subject_enrollments WHERE student_id = $1)
         ORDER BY subject_code"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateSubject<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_name: &'a str,
    pub(crate) subject_code: &'a str,
    pub(crate) course_level: CourseLevel,
    pub(crate) prerequisite: Option<&'a str>,
    pub(crate) assigned_faculty_id: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubject<'_>,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (
            id, subject_name, subject_code, course_level, prerequisite, assigned_faculty_id,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.subject_name)
    .bind(params.subject_code)
    .bind(params.course_level)
    .bind(params.prerequisite)
    .bind(params.assigned_faculty_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateSubject {
    pub(crate) subject_name: Option<String>,
    pub(crate) subject_code: Option<String>,
    pub(crate) course_level: Option<CourseLevel>,
    pub(crate) prerequisite: Option<String>,
    pub(crate) assigned_faculty_id: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSubject,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "UPDATE subjects SET
            subject_name = COALESCE($1, subject_name),
            subject_code = COALESCE($2, subject_code),
            course_level = COALESCE($3, course_level),
            prerequisite = COALESCE($4, prerequisite),
            assigned_faculty_id = COALESCE($5, assigned_faculty_id),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.subject_name)
    .bind(params.subject_code)
    .bind(params.course_level)
    .bind(params.prerequisite)
    .bind(params.assigned_faculty_id)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_exams(pool: &PgPool, subject_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE subject_id = $1")
        .bind(subject_id)
        .fetch_one(pool)
        .await
}
