use crate::{
    broadcast::BroadcastHub,
    config::AppConfig,
    error::{ServiceError, ServiceResult},
    ethereum::{AuctionChainApi, AuctionTxApi},
    metadata::MetadataFetcher,
    persist::PersistCtx,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub mod event_handler;
pub mod health;
pub mod indexer;
mod locks;
pub mod proxy;
pub mod query;

pub use indexer::{BackfillReport, CatchUpTask, IndexerState};
pub use locks::AuctionLocks;

pub struct Inner {
    config: AppConfig,
    persist_ctx: PersistCtx,
    metadata: MetadataFetcher,
    hub: BroadcastHub,
    locks: AuctionLocks,
    state: RwLock<IndexerState>,
    chain: RwLock<Option<Arc<dyn AuctionChainApi>>>,
    tx_api: RwLock<Option<Arc<dyn AuctionTxApi>>>,
    /// Only one catch-up scan advances the cursor at a time.
    scan_lock: tokio::sync::Mutex<()>,
    listener_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.listener_handle.lock().take() {
            handle.abort();
        }
    }
}

/// Owns every piece of indexer state: the store, the chain clients, the
/// metadata cache and the push hub.
#[derive(Clone)]
pub struct IndexerService {
    inner: Arc<Inner>,
}

impl IndexerService {
    pub fn new(config: AppConfig, persist_ctx: PersistCtx) -> anyhow::Result<Self> {
        let metadata = MetadataFetcher::new(&config.metadata_config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                persist_ctx,
                metadata,
                hub: BroadcastHub::new(),
                locks: AuctionLocks::default(),
                state: RwLock::new(IndexerState::Uninitialized),
                chain: RwLock::new(None),
                tx_api: RwLock::new(None),
                scan_lock: tokio::sync::Mutex::new(()),
                listener_handle: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn persist_ctx(&self) -> &PersistCtx {
        &self.inner.persist_ctx
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.inner.hub
    }

    pub fn metadata(&self) -> &MetadataFetcher {
        &self.inner.metadata
    }

    pub fn state(&self) -> IndexerState {
        *self.inner.state.read()
    }

    fn set_state(&self, state: IndexerState) {
        let prev = std::mem::replace(&mut *self.inner.state.write(), state);
        if prev != state {
            log::info!("Indexer state {prev:?} -> {state:?}");
        }
    }

    pub fn chain(&self) -> Option<Arc<dyn AuctionChainApi>> {
        self.inner.chain.read().clone()
    }

    pub fn set_chain(&self, chain: Arc<dyn AuctionChainApi>) {
        self.inner.chain.write().replace(chain);
    }

    pub fn set_tx_api(&self, api: Arc<dyn AuctionTxApi>) {
        self.inner.tx_api.write().replace(api);
    }

    pub fn write_proxy_enabled(&self) -> bool {
        self.inner.tx_api.read().is_some()
    }

    fn require_chain(&self) -> ServiceResult<Arc<dyn AuctionChainApi>> {
        self.chain()
            .ok_or_else(|| ServiceError::Unavailable("chain client unavailable".into()))
    }

    fn require_tx_api(&self) -> ServiceResult<Arc<dyn AuctionTxApi>> {
        self.inner.tx_api.read().clone().ok_or_else(|| {
            ServiceError::Unavailable("write proxy disabled: no server key configured".into())
        })
    }

    /// Cursor rows are keyed by the lowercase contract address.
    fn cursor_key(&self) -> String {
        self.inner
            .config
            .ethereum_config
            .contract_address
            .trim()
            .to_ascii_lowercase()
    }

    /// Stops the live listener, if any.
    pub fn shutdown(&self) {
        if let Some(handle) = self.inner.listener_handle.lock().take() {
            handle.abort();
        }
    }
}
