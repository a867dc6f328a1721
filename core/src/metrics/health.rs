use async_trait::async_trait;

use crate::{metrics::record::record_health_status, scheduler::Task, service::IndexerService};

pub struct HealthCheckTask {
    service: IndexerService,
    cron_pattern: String,
}

impl HealthCheckTask {
    pub fn new(service: IndexerService, cron_pattern: impl Into<String>) -> Self {
        Self {
            service,
            cron_pattern: cron_pattern.into(),
        }
    }
}

#[async_trait]
impl Task for HealthCheckTask {
    fn name(&self) -> &'static str {
        "health_check"
    }

    fn cron_pattern(&self) -> String {
        self.cron_pattern.clone()
    }

    async fn run(&self) -> anyhow::Result<()> {
        let report = self.service.run_health_checks().await;
        record_health_status("db", report.db);
        record_health_status("chain_rpc", report.chain_rpc);
        record_health_status("overall", report.status);

        Ok(())
    }
}
