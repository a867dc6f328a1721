use crate::{
    error::{BlockchainListenerError, ServiceError, ServiceResult},
    ethereum::{
        AlloyAuctionClient, AlloyAuctionWriter, AuctionChainApi, ChainAuction, EthereumListener,
        EventScanner, ScanReport,
    },
    metadata::ItemMetadata,
    metrics::record_backfill_item,
    model::AuctionInfo,
    persist::{
        mapper,
        repo::{self, AuctionUpsert},
    },
    scheduler::{Task, async_trait},
    service::IndexerService,
    util::{address_to_string, non_zero_address, now_unix},
};
use entities::auction;
use futures_util::{StreamExt, stream};
use log::{error, info, warn};
use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::task::JoinHandle;

/// `Uninitialized → Connecting → Backfilling → Live ⇄ Degraded`, or
/// `Disabled` when the chain cannot be reached at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexerState {
    Uninitialized,
    Connecting,
    Backfilling,
    Live,
    Degraded,
    Disabled,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub total: u64,
    pub indexed: u64,
    pub failed: u64,
}

impl AuctionUpsert {
    pub fn from_chain(
        state: ChainAuction,
        ipfs_cid: Option<String>,
        metadata: Option<ItemMetadata>,
    ) -> Self {
        let (title, image) = match metadata {
            Some(m) => (Some(m.title), m.image),
            None => (None, None),
        };
        Self {
            id: state.id,
            seller: address_to_string(state.seller),
            auction_type: state.auction_type,
            start_time: state.start_time,
            bidding_end_time: state.bidding_end_time,
            reveal_end_time: state.reveal_end_time,
            reserve_price: state.reserve_price.to_string(),
            min_increment: state.min_increment.to_string(),
            buy_it_now_price: state.buy_it_now_price.to_string(),
            anti_sniping_window: state.anti_sniping_window,
            anti_sniping_extension: state.anti_sniping_extension,
            ipfs_cid,
            ended: state.ended,
            highest_bidder: non_zero_address(state.highest_bidder),
            highest_bid: state.highest_bid.to_string(),
            title,
            image,
            nft_address: non_zero_address(state.nft_address),
            token_id: state.token_id.to_string(),
            token_amount: state.token_amount.to_string(),
            is_erc1155: state.is_erc1155,
            require_verification: state.require_verification,
            dutch_price: state.dutch_price.map(|p| p.to_string()),
        }
    }
}

impl IndexerService {
    /// Connects with the configured RPC endpoint and runs the indexer in the
    /// background. The API keeps serving stored data whatever happens here.
    pub fn spawn_indexer(&self) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            service.set_state(IndexerState::Connecting);
            let eth_cfg = service.config().ethereum_config.clone();

            match AlloyAuctionWriter::from_config(&eth_cfg).await {
                Ok(Some(writer)) => service.set_tx_api(Arc::new(writer)),
                Ok(None) => info!("No server key configured, write proxy disabled"),
                Err(e) => error!("Write proxy unavailable: {e}"),
            }

            let client = match AlloyAuctionClient::connect(&eth_cfg).await {
                Ok(client) => client,
                Err(e) => {
                    error!("Chain client unavailable, serving stored data only: {e}");
                    service.set_state(IndexerState::Disabled);
                    return;
                }
            };

            if let Err(e) = service.start(Arc::new(client)).await {
                error!("Indexer failed to start: {e}");
            }
        })
    }

    /// Connect, backfill, then go live.
    pub async fn start(&self, chain: Arc<dyn AuctionChainApi>) -> ServiceResult<BackfillReport> {
        let report = self.connect_and_backfill(chain).await?;
        self.go_live()?;
        Ok(report)
    }

    pub async fn connect_and_backfill(
        &self,
        chain: Arc<dyn AuctionChainApi>,
    ) -> ServiceResult<BackfillReport> {
        self.set_state(IndexerState::Connecting);
        let head = match chain.block_number().await {
            Ok(head) => head,
            Err(e) => {
                error!("Chain probe failed: {e}");
                self.set_state(IndexerState::Disabled);
                return Err(e.into());
            }
        };
        info!("Chain reachable at block {head}");
        self.set_chain(chain.clone());

        self.set_state(IndexerState::Backfilling);
        let report = match self.backfill(&chain).await {
            Ok(report) => report,
            Err(e) => {
                error!("Backfill aborted: {e}");
                self.set_state(IndexerState::Degraded);
                return Err(e);
            }
        };

        self.scanner(chain)
            .initialize_cursor(head)
            .await
            .map_err(ServiceError::from)?;
        Ok(report)
    }

    pub fn go_live(&self) -> ServiceResult<()> {
        self.go_live_with(|listener| listener)
    }

    /// Like `go_live`, with a custom resubscription backoff.
    pub fn go_live_with_backoff(&self, initial: Duration, max: Duration) -> ServiceResult<()> {
        self.go_live_with(|listener| listener.with_backoff(initial, max))
    }

    fn go_live_with(
        &self,
        configure: impl FnOnce(EthereumListener) -> EthereumListener,
    ) -> ServiceResult<()> {
        let chain = self.require_chain()?;
        let listener = configure(EthereumListener::new(chain, Arc::new(self.clone())));
        let handle = listener.run();
        if let Some(prev) = self.inner.listener_handle.lock().replace(handle) {
            prev.abort();
        }
        Ok(())
    }

    /// Canonical read of every auction the contract knows. Never records
    /// bids or events.
    pub async fn backfill(&self, chain: &Arc<dyn AuctionChainApi>) -> ServiceResult<BackfillReport> {
        let total = chain.auction_count().await?;
        let cfg = &self.config().indexer_config;
        let concurrency = cfg.backfill_concurrency.max(1);
        let delay = Duration::from_millis(cfg.backfill_item_delay_ms);
        info!("Backfilling {total} auction(s) with concurrency {concurrency}");

        let indexed = AtomicU64::new(0);
        let failed = AtomicU64::new(0);
        let (indexed_ref, failed_ref) = (&indexed, &failed);

        stream::iter(0..total)
            .for_each_concurrent(concurrency, move |id| async move {
                match self.sync_auction(chain.as_ref(), id).await {
                    Ok(_) => {
                        indexed_ref.fetch_add(1, Ordering::Relaxed);
                        record_backfill_item("indexed");
                    }
                    Err(e) => {
                        warn!("Backfill of auction {id} failed: {e}");
                        failed_ref.fetch_add(1, Ordering::Relaxed);
                        record_backfill_item("failed");
                    }
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            })
            .await;

        let report = BackfillReport {
            total,
            indexed: indexed.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        };
        info!(
            "Backfill done: {} indexed, {} failed of {}",
            report.indexed, report.failed, report.total
        );
        Ok(report)
    }

    /// Canonical read, metadata enrichment and upsert for one auction, under
    /// that auction's lock so the newest read is always the last write.
    pub(crate) async fn sync_auction(
        &self,
        chain: &dyn AuctionChainApi,
        id: u64,
    ) -> Result<auction::Model, BlockchainListenerError> {
        let _guard = self.inner.locks.lock(id).await;

        let state = chain.auction_state(id).await?;
        let cid = Some(state.ipfs_cid.trim())
            .filter(|cid| !cid.is_empty())
            .map(str::to_owned);
        let metadata = self.metadata().resolve(cid.as_deref()).await;

        let row = repo::upsert_auction(
            self.persist_ctx(),
            AuctionUpsert::from_chain(state, cid, metadata),
        )
        .await?;
        Ok(row)
    }

    pub(crate) async fn auction_snapshot(
        &self,
        row: auction::Model,
    ) -> Result<AuctionInfo, BlockchainListenerError> {
        let id = u64::try_from(row.id).unwrap_or_default();
        let bid_count = repo::count_bids(self.persist_ctx(), id).await?;
        Ok(mapper::auction_model_to_info(row, bid_count, now_unix())?)
    }

    /// Forced canonical re-read, pushed to subscribers as `refreshed`.
    pub async fn refresh_auction(&self, id: u64) -> ServiceResult<AuctionInfo> {
        let chain = self.require_chain()?;
        let count = chain.auction_count().await?;
        if id >= count {
            return Err(ServiceError::NotFound(format!("auction {id}")));
        }

        let row = self.sync_auction(chain.as_ref(), id).await?;
        let info = self.auction_snapshot(row).await?;
        let data = serde_json::to_value(&info).map_err(|e| ServiceError::Other(e.into()))?;
        self.hub().broadcast("refreshed", Some(id), data);
        Ok(info)
    }

    fn scanner(&self, chain: Arc<dyn AuctionChainApi>) -> EventScanner {
        EventScanner::new(
            chain,
            self.persist_ctx().clone(),
            self.cursor_key(),
            self.config().ethereum_config.contract_variant,
            self.config().indexer_config.log_range_blocks,
        )
    }

    /// Replays events between the stored cursor and the chain head.
    pub async fn catch_up(&self) -> Result<ScanReport, BlockchainListenerError> {
        let Some(chain) = self.chain() else {
            return Ok(ScanReport::default());
        };
        let _scan = self.inner.scan_lock.lock().await;
        self.scanner(chain).scan(self).await
    }
}

/// Periodic catch-up scan while the indexer is running.
pub struct CatchUpTask {
    service: IndexerService,
}

impl CatchUpTask {
    pub fn new(service: IndexerService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Task for CatchUpTask {
    fn name(&self) -> &'static str {
        "catch_up"
    }

    fn cron_pattern(&self) -> String {
        self.service.config().indexer_config.catch_up_cron.clone()
    }

    async fn run(&self) -> anyhow::Result<()> {
        if !matches!(
            self.service.state(),
            IndexerState::Live | IndexerState::Degraded
        ) {
            return Ok(());
        }
        self.service
            .catch_up()
            .await
            .map_err(|e| anyhow::anyhow!("Catch-up scan failed: {e}"))?;
        Ok(())
    }
}
