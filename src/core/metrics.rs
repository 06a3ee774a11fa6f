use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const ATTEMPTS_STARTED: &str = "exam_attempts_started_total";
pub(crate) const RESULTS_RECORDED: &str = "exam_results_recorded_total";
pub(crate) const ATTEMPTS_EXPIRED: &str = "exam_attempts_expired_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn attempt_started() {
    metrics::counter!(ATTEMPTS_STARTED).increment(1);
}

pub(crate) fn result_recorded(score: i32) {
    let bucket = match score {
        100 => "perfect",
        50..=99 => "pass",
        _ => "fail",
    };
    metrics::counter!(RESULTS_RECORDED, "outcome" => bucket).increment(1);
}

pub(crate) fn attempts_expired(count: u64) {
    if count > 0 {
        metrics::counter!(ATTEMPTS_EXPIRED).increment(count);
    }
}
