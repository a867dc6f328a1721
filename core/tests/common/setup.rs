use std::{sync::Arc, time::Duration};

use indexer_service::{
    broadcast::Subscription,
    config::{
        AppConfig, ContractVariant, DatabaseConfig, EthereumConfig, IndexerConfig, MetadataConfig,
        ServerConfig,
    },
    persist::PersistCtx,
    service::IndexerService,
};
use serde_json::Value;

use super::fixtures::FakeChain;

pub const CONTRACT_ADDRESS: &str = "0x00000000000000000000000000000000000a0c71";

/// Nothing listens on the discard port, so lookups fail fast.
pub const UNREACHABLE_GATEWAY: &str = "http://127.0.0.1:9/ipfs";

pub fn test_config(gateway_url: &str) -> AppConfig {
    AppConfig {
        server_config: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            log_level: log::Level::Debug,
            cors_allowed_origins: None,
        },
        ethereum_config: EthereumConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: CONTRACT_ADDRESS.into(),
            contract_variant: ContractVariant::Advanced,
            private_key: None,
        },
        database_config: DatabaseConfig {
            url: "sqlite::memory:".into(),
        },
        metadata_config: MetadataConfig {
            gateway_url: gateway_url.into(),
            timeout_ms: 500,
        },
        indexer_config: IndexerConfig {
            backfill_concurrency: 2,
            backfill_item_delay_ms: 0,
            log_range_blocks: 5,
            ..IndexerConfig::default()
        },
    }
}

pub async fn test_service() -> anyhow::Result<IndexerService> {
    test_service_with(test_config(UNREACHABLE_GATEWAY)).await
}

pub async fn test_service_with(config: AppConfig) -> anyhow::Result<IndexerService> {
    let ctx = PersistCtx::connect(&config.database_config.url).await?;
    IndexerService::new(config, ctx)
}

/// A service that has finished backfilling against `chain`, without a live
/// listener.
pub async fn backfilled_service(chain: &Arc<FakeChain>) -> anyhow::Result<IndexerService> {
    let service = test_service().await?;
    service.connect_and_backfill(chain.clone()).await?;
    Ok(service)
}

/// Next broadcast frame as JSON, failing the test after a short wait.
pub async fn next_frame(subscription: &mut Subscription) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("timed out waiting for a broadcast frame")
        .expect("subscription closed");
    serde_json::from_str(&frame).expect("frame is JSON")
}

/// Polls `check` until it holds or a few seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
