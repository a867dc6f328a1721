use log::error;
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::service::{IndexerService, IndexerState};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Fail,
}

impl From<bool> for CheckStatus {
    fn from(value: bool) -> Self {
        if value {
            CheckStatus::Ok
        } else {
            CheckStatus::Fail
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Ok when stored data can be served; the chain being down only degrades.
    pub status: CheckStatus,
    pub db: CheckStatus,
    pub chain_rpc: CheckStatus,
    pub indexer: IndexerState,
    pub subscribers: usize,
    pub write_proxy: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, CheckStatus::Ok)
    }
}

impl IndexerService {
    pub async fn run_health_checks(&self) -> HealthReport {
        let db_status = self.check_db().await;
        let rpc_status = self.check_rpc().await;

        HealthReport {
            status: db_status,
            db: db_status,
            chain_rpc: rpc_status,
            indexer: self.state(),
            subscribers: self.hub().len(),
            write_proxy: self.write_proxy_enabled(),
        }
    }

    async fn check_db(&self) -> CheckStatus {
        let db = self.persist_ctx().db.as_ref();
        let stmt = sea_orm::Statement::from_string(db.get_database_backend(), "SELECT 1");
        match db.query_one(stmt).await {
            Ok(_) => CheckStatus::Ok,
            Err(e) => {
                error!("DB health check failed: {e}");
                CheckStatus::Fail
            }
        }
    }

    async fn check_rpc(&self) -> CheckStatus {
        let Some(chain) = self.chain() else {
            return CheckStatus::Fail;
        };
        match chain.block_number().await {
            Ok(_) => CheckStatus::Ok,
            Err(e) => {
                error!("RPC health check failed: {e}");
                CheckStatus::Fail
            }
        }
    }
}
