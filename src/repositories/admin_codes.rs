use sqlx::PgPool;
use uuid::Uuid;

/// Makes `code_hash` the only active admin code.
pub(crate) async fn replace_active(
    pool: &PgPool,
    code_hash: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE admin_codes SET is_active = FALSE WHERE code_hash <> $1 AND is_active")
        .bind(code_hash)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO admin_codes (id, code_hash, is_active, created_at)
         VALUES ($1, $2, TRUE, $3)
         ON CONFLICT (code_hash) DO UPDATE SET is_active = TRUE",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(code_hash)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

pub(crate) async fn is_active(pool: &PgPool, code_hash: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM admin_codes WHERE code_hash = $1 AND is_active)",
    )
    .bind(code_hash)
    .fetch_one(pool)
    .await
}
