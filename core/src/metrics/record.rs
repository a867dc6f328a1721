use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::service::health::CheckStatus;

pub const TASK_DURATION_METRIC: &str = "task_execution_duration_seconds";

pub fn record_event(name: &'static str) {
    counter!("indexer_events_total", "name" => name).increment(1);
}

pub fn record_event_failure() {
    counter!("indexer_event_failures_total").increment(1);
}

/// `outcome` is `indexed` or `failed`.
pub fn record_backfill_item(outcome: &'static str) {
    counter!("indexer_backfill_items_total", "outcome" => outcome).increment(1);
}

/// `result` is `hit`, `miss` or `failure`.
pub fn record_metadata_lookup(result: &'static str) {
    counter!("metadata_cache_total", "result" => result).increment(1);
}

pub fn set_broadcast_channels(count: usize) {
    gauge!("broadcast_channels").set(count as f64);
}

pub fn record_broadcast_dropped(count: usize) {
    counter!("broadcast_dropped_total").increment(count as u64);
}

pub fn record_task_time(name: &'static str, duration: Duration) {
    counter!("task_execution_total", "name" => name).increment(1);
    histogram!(TASK_DURATION_METRIC, "name" => name).record(duration.as_secs_f64());
}

pub fn record_health_status(scope: &'static str, status: CheckStatus) {
    gauge!("health_status", "scope" => scope).set(match status {
        CheckStatus::Ok => 1.0,
        CheckStatus::Fail => 0.0,
    });
}
