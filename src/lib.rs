pub(crate) mod api;
pub(crate) mod client;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use clap::Parser;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};

async fn connect(settings: Settings) -> anyhow::Result<AppState> {
    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; rate limiting disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    Ok(AppState::new(settings, db_pool, redis))
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let state = connect(settings).await?;
    core::bootstrap::run(&state).await;

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Examhall API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let state = connect(settings).await?;
    let result = tasks::scheduler::run(state.clone()).await;

    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

/// Entry point of the command-line exam taker.
pub async fn take_exam_cli() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    client::cli::run(client::cli::TakeArgs::parse()).await
}
