use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::identity;

/// Runs every startup step, logging failures instead of aborting.
pub(crate) async fn run(state: &AppState) {
    if let Err(err) = ensure_admin_account(state).await {
        tracing::error!(error = %err, "Failed to ensure bootstrap admin account");
    }
    if let Err(err) = ensure_admin_code(state).await {
        tracing::error!(error = %err, "Failed to ensure admin access code");
    }
}

pub(crate) async fn ensure_admin_account(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let email = identity::normalize_email(&admin.first_admin_email);
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), &email).await? {
        let password_matches =
            security::verify_password(&admin.first_admin_password, &user.hashed_password)
                .unwrap_or(false);

        let mut update = repositories::users::UpdateUser::default();
        if !password_matches {
            update.hashed_password = Some(security::hash_password(&admin.first_admin_password)?);
        }
        if user.role != UserRole::Admin {
            update.role = Some(UserRole::Admin);
        }
        if !user.is_active {
            update.is_active = Some(true);
        }

        if update.hashed_password.is_none() && update.role.is_none() && update.is_active.is_none() {
            tracing::info!(email = %email, "Bootstrap admin already up to date");
            return Ok(());
        }

        repositories::users::update(state.db(), &user.id, update, now).await?;
        tracing::info!(email = %email, "Updated bootstrap admin");
        return Ok(());
    }

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            role: UserRole::Admin,
            institutional_id: None,
            email: &email,
            hashed_password: security::hash_password(&admin.first_admin_password)?,
            first_name: "System",
            last_name: "Administrator",
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(email = %email, "Created bootstrap admin");
    Ok(())
}

pub(crate) async fn ensure_admin_code(state: &AppState) -> anyhow::Result<()> {
    let code = state.settings().admin().access_code.trim();
    if code.is_empty() {
        tracing::warn!("ADMIN_ACCESS_CODE not configured; admin code left unchanged");
        return Ok(());
    }

    repositories::admin_codes::replace_active(
        state.db(),
        &security::hash_admin_code(code),
        primitive_now_utc(),
    )
    .await?;

    tracing::info!("Admin access code is active");
    Ok(())
}
