use async_trait::async_trait;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::scheduler::Task;

pub mod health;
pub mod record;

pub use health::HealthCheckTask;
pub use record::*;

pub fn setup_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];

    let recorder_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(TASK_DURATION_METRIC.to_string()),
            EXPONENTIAL_SECONDS,
        )
        .map_err(|e| {
            anyhow::anyhow!("Failed to set buckets for metric {TASK_DURATION_METRIC}: {e}")
        })?
        .add_global_label("app", "auction-indexer")
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {e}"))?;

    Ok(recorder_handle)
}

pub struct MetricsUpkeepTask {
    recorder_handle: PrometheusHandle,
    cron_pattern: String,
}

impl MetricsUpkeepTask {
    pub fn new(recorder_handle: PrometheusHandle, cron_pattern: impl Into<String>) -> Self {
        Self {
            recorder_handle,
            cron_pattern: cron_pattern.into(),
        }
    }
}

#[async_trait]
impl Task for MetricsUpkeepTask {
    fn name(&self) -> &'static str {
        "metrics_upkeep"
    }

    fn cron_pattern(&self) -> String {
        self.cron_pattern.clone()
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.recorder_handle.run_upkeep();
        Ok(())
    }
}
