use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::User;
use crate::db::types::UserRole;

pub(crate) const COLUMNS: &str = "\
    id, role, institutional_id, email, hashed_password, first_name, last_name, \
    profile_picture, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_institutional_id(
    pool: &PgPool,
    institutional_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE institutional_id = $1"))
        .bind(institutional_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Looks a user up by primary key first, then by institutional id.
pub(crate) async fn find_by_reference(
    pool: &PgPool,
    reference: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE id = $1 OR institutional_id = $1 \
         ORDER BY (id = $1) DESC LIMIT 1"
    ))
    .bind(reference)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn exists_by_institutional_id_or_email(
    pool: &PgPool,
    institutional_id: &str,
    email: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE institutional_id = $1 OR lower(email) = lower($2))",
    )
    .bind(institutional_id)
    .bind(email)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) role: UserRole,
    pub(crate) institutional_id: Option<&'a str>,
    pub(crate) email: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, role, institutional_id, email, hashed_password, first_name, last_name,
            is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.role)
    .bind(params.institutional_id)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateUser {
    pub(crate) role: Option<UserRole>,
    pub(crate) institutional_id: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) profile_picture: Option<String>,
    pub(crate) is_active: Option<bool>,
    pub(crate) hashed_password: Option<String>,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateUser,
    now: time::PrimitiveDateTime,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            role = COALESCE($1, role),
            institutional_id = COALESCE($2, institutional_id),
            email = COALESCE($3, email),
            first_name = COALESCE($4, first_name),
            last_name = COALESCE($5, last_name),
            profile_picture = COALESCE($6, profile_picture),
            is_active = COALESCE($7, is_active),
            hashed_password = COALESCE($8, hashed_password),
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}",
    ))
    .bind(params.role)
    .bind(params.institutional_id)
    .bind(params.email)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.profile_picture)
    .bind(params.is_active)
    .bind(params.hashed_password)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, role: Option<UserRole>, search: Option<&str>) {
    builder.push(" WHERE TRUE");
    if let Some(role) = role {
        builder.push(" AND role = ");
        builder.push_bind(role);
    }
    if let Some(search) = search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (first_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR last_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR institutional_id ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    role: Option<UserRole>,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<User>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM users"));
    push_filters(&mut builder, role, search);
    builder.push(" ORDER BY created_at DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<User>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    role: Option<UserRole>,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_filters(&mut builder, role, search);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
