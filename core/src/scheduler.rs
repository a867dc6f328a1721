pub use async_trait::async_trait;
use log::{debug, error, info};
use std::{sync::Arc, time::Instant};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::metrics::record_task_time;

#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Used in logs and as the `name` label of task metrics.
    fn name(&self) -> &'static str;

    /// Six-field cron expression (seconds first).
    fn cron_pattern(&self) -> String;

    async fn run(&self) -> anyhow::Result<()>;
}

pub struct TaskScheduler {
    scheduler: JobScheduler,
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        let mut scheduler = self.scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.shutdown().await {
                error!("Failed to shutdown task scheduler: {e}");
            }
        });
    }
}

impl TaskScheduler {
    pub async fn new() -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self { scheduler })
    }

    pub async fn add_task(&mut self, task: Arc<dyn Task>) -> anyhow::Result<()> {
        let pattern = task.cron_pattern();
        let name = task.name();
        let job = Job::new_async(pattern.clone(), move |_id, _lock| {
            let task = task.clone();
            Box::pin(async move {
                let started = Instant::now();
                match task.run().await {
                    Ok(()) => debug!("Task {} finished", task.name()),
                    Err(e) => error!("Task {} failed: {e:#}", task.name()),
                }
                record_task_time(task.name(), started.elapsed());
            })
        })?;
        self.scheduler.add(job).await?;
        info!("Scheduled task {name} ({pattern})");

        Ok(())
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        self.scheduler.start().await?;
        Ok(())
    }
}
