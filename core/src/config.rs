use std::str::FromStr;

use alloy::primitives::Address;
use anyhow::{Context, bail};
use envconfig::Envconfig;
use url::Url;

pub const DEFAULT_LIST_LIMIT: u64 = 50;
pub const MAX_LIST_LIMIT: u64 = 100;
pub const DEFAULT_RECENT_BIDS: u64 = 10;

#[derive(Debug, Clone, Envconfig)]
pub struct ServerConfig {
    #[envconfig(from = "SERVER_HOST", default = "127.0.0.1")]
    pub host: String,

    #[envconfig(from = "SERVER_PORT", default = "3001")]
    pub port: u16,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: log::Level,

    /// Comma separated list; any origin is allowed when unset.
    #[envconfig(from = "CORS_ALLOWED_ORIGINS")]
    pub cors_allowed_origins: Option<String>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Which contract surface (and event set) the indexer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractVariant {
    /// Single-strategy English auctions read through `getAuction(uint256)`.
    Simple,
    /// Multi-strategy manager (English, sealed-bid, Dutch, Vickrey).
    Advanced,
}

impl FromStr for ContractVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ContractVariant::Simple),
            "advanced" => Ok(ContractVariant::Advanced),
            other => bail!("unknown contract variant {other}, expected simple or advanced"),
        }
    }
}

#[derive(Debug, Clone, Envconfig)]
pub struct EthereumConfig {
    #[envconfig(from = "ETHEREUM_RPC_URL", default = "http://127.0.0.1:8545")]
    pub rpc_url: String,

    #[envconfig(from = "ETHEREUM_CONTRACT_ADDRESS")]
    pub contract_address: String,

    #[envconfig(from = "AUCTION_CONTRACT_VARIANT", default = "advanced")]
    pub contract_variant: ContractVariant,

    /// Server-held key for the write proxy. The proxy is disabled without it.
    #[envconfig(from = "ETHEREUM_PRIVATE_KEY")]
    pub private_key: Option<String>,
}

impl EthereumConfig {
    pub fn contract_address(&self) -> anyhow::Result<Address> {
        Address::from_str(self.contract_address.trim()).with_context(|| {
            format!(
                "ETHEREUM_CONTRACT_ADDRESS is not a valid address: {}",
                self.contract_address
            )
        })
    }

    /// `eth_subscribe` is only available over websocket transports.
    pub fn uses_pubsub(&self) -> bool {
        let url = self.rpc_url.trim_start();
        url.starts_with("ws://") || url.starts_with("wss://")
    }
}

#[derive(Debug, Clone, Envconfig)]
pub struct DatabaseConfig {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://auctions.db?mode=rwc")]
    pub url: String,
}

#[derive(Debug, Clone, Envconfig)]
pub struct MetadataConfig {
    #[envconfig(from = "METADATA_GATEWAY_URL", default = "https://ipfs.io/ipfs")]
    pub gateway_url: String,

    #[envconfig(from = "METADATA_TIMEOUT_MS", default = "5000")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Envconfig)]
pub struct IndexerConfig {
    #[envconfig(from = "INDEXER_BACKFILL_CONCURRENCY", default = "4")]
    pub backfill_concurrency: usize,

    #[envconfig(from = "INDEXER_BACKFILL_ITEM_DELAY_MS", default = "100")]
    pub backfill_item_delay_ms: u64,

    #[envconfig(from = "INDEXER_LOG_RANGE_BLOCKS", default = "2000")]
    pub log_range_blocks: u64,

    #[envconfig(from = "INDEXER_CATCH_UP_CRON", default = "*/30 * * * * *")]
    pub catch_up_cron: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            backfill_concurrency: 4,
            backfill_item_delay_ms: 100,
            log_range_blocks: 2000,
            catch_up_cron: "*/30 * * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_config: ServerConfig,
    pub ethereum_config: EthereumConfig,
    pub database_config: DatabaseConfig,
    pub metadata_config: MetadataConfig,
    pub indexer_config: IndexerConfig,
}

impl AppConfig {
    pub fn fetch() -> anyhow::Result<Self> {
        let server_config =
            ServerConfig::init_from_env().context("Failed to load server config")?;
        let ethereum_config =
            EthereumConfig::init_from_env().context("Failed to load ethereum config")?;
        let database_config =
            DatabaseConfig::init_from_env().context("Failed to load database config")?;
        let metadata_config =
            MetadataConfig::init_from_env().context("Failed to load metadata config")?;
        let indexer_config =
            IndexerConfig::init_from_env().context("Failed to load indexer config")?;

        let cfg = Self {
            server_config,
            ethereum_config,
            database_config,
            metadata_config,
            indexer_config,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.ethereum_config.contract_address()?;
        validate_rpc_url(&self.ethereum_config.rpc_url)?;
        validate_gateway_url(&self.metadata_config.gateway_url)?;
        if self.indexer_config.backfill_concurrency == 0 {
            bail!("INDEXER_BACKFILL_CONCURRENCY must be greater than 0");
        }
        if self.indexer_config.log_range_blocks == 0 {
            bail!("INDEXER_LOG_RANGE_BLOCKS must be greater than 0");
        }
        Ok(())
    }
}

fn validate_rpc_url(raw: &str) -> anyhow::Result<()> {
    let parsed = Url::parse(raw.trim()).context("ETHEREUM_RPC_URL is not a valid URL")?;
    match parsed.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(()),
        other => bail!("ETHEREUM_RPC_URL must use http(s) or ws(s) scheme, got {other}"),
    }
}

fn validate_gateway_url(raw: &str) -> anyhow::Result<()> {
    let parsed = Url::parse(raw.trim()).context("METADATA_GATEWAY_URL is not a valid URL")?;
    if parsed.host_str().is_none() {
        bail!("METADATA_GATEWAY_URL must include a host");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_contract_variant() {
        assert_eq!(
            "Simple".parse::<ContractVariant>().unwrap(),
            ContractVariant::Simple
        );
        assert_eq!(
            " advanced ".parse::<ContractVariant>().unwrap(),
            ContractVariant::Advanced
        );
        assert!("dutch".parse::<ContractVariant>().is_err());
    }

    #[test]
    fn rejects_unknown_rpc_scheme() {
        let err = validate_rpc_url("ftp://node.local").unwrap_err();
        assert!(err.to_string().contains("http(s) or ws(s)"));
        validate_rpc_url("wss://node.local/ws").expect("wss should pass validation");
    }

    #[test]
    fn detects_pubsub_transport() {
        let mut cfg = EthereumConfig {
            rpc_url: "ws://127.0.0.1:8545".into(),
            contract_address: "0x0000000000000000000000000000000000000001".into(),
            contract_variant: ContractVariant::Simple,
            private_key: None,
        };
        assert!(cfg.uses_pubsub());
        cfg.rpc_url = "http://127.0.0.1:8545".into();
        assert!(!cfg.uses_pubsub());
    }

    #[test]
    fn rejects_invalid_contract_address() {
        let cfg = EthereumConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: "not-an-address".into(),
            contract_variant: ContractVariant::Advanced,
            private_key: None,
        };
        let err = cfg.contract_address().unwrap_err();
        assert!(err.to_string().contains("ETHEREUM_CONTRACT_ADDRESS"));
    }

    #[test]
    fn splits_allowed_origins() {
        let cfg = ServerConfig {
            host: "127.0.0.1".into(),
            port: 3001,
            log_level: log::Level::Info,
            cors_allowed_origins: Some("http://localhost:5173, ,http://127.0.0.1:3000".into()),
        };
        assert_eq!(
            cfg.allowed_origins(),
            vec!["http://localhost:5173", "http://127.0.0.1:3000"]
        );
    }
}
