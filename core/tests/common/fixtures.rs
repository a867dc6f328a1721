use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use alloy::primitives::{Address, B256, U256};
use anyhow::anyhow;
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use indexer_service::{
    error::{BlockchainListenerError, ChainClientError},
    ethereum::{
        AuctionChainApi, AuctionEventKind, AuctionNft, AuctionTxApi, ChainAuction, ContractEvent,
        CreatedAuction, DutchPricing, EventMeta, EventStream, NewAuction, StoredEventData,
        TxOutcome,
    },
    util::address_to_string,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub type LiveSender = mpsc::UnboundedSender<Result<ContractEvent, BlockchainListenerError>>;
type LiveReceiver = mpsc::UnboundedReceiver<Result<ContractEvent, BlockchainListenerError>>;

/// Short addresses such as `0xabc`, left padded to 20 bytes.
pub fn short_address(value: u64) -> Address {
    Address::left_padding_from(&value.to_be_bytes())
}

pub fn chain_auction(id: u64) -> ChainAuction {
    ChainAuction {
        id,
        auction_type: 0,
        seller: short_address(0x5e11),
        start_time: 1_000,
        bidding_end_time: 4_000_000_000,
        reveal_end_time: 4_000_000_000,
        reserve_price: U256::from(100u64),
        min_increment: U256::from(10u64),
        buy_it_now_price: U256::ZERO,
        anti_sniping_window: 300,
        anti_sniping_extension: 120,
        ended: false,
        ipfs_cid: String::new(),
        highest_bidder: Address::ZERO,
        highest_bid: U256::ZERO,
        nft_address: Address::ZERO,
        token_id: U256::ZERO,
        token_amount: U256::ZERO,
        is_erc1155: false,
        require_verification: false,
        dutch_price: None,
    }
}

pub fn event_meta(block_number: u64, log_index: u64) -> EventMeta {
    EventMeta {
        block_number,
        tx_hash: format!("0x{block_number:060x}{log_index:04x}"),
        log_index,
    }
}

pub fn bid_placed(
    auction_id: u64,
    bidder: Address,
    amount: u64,
    block_number: u64,
    log_index: u64,
) -> ContractEvent {
    ContractEvent {
        kind: AuctionEventKind::BidPlaced,
        auction_id,
        data: StoredEventData::BidPlaced {
            bidder: address_to_string(bidder),
            amount: amount.to_string(),
        },
        meta: event_meta(block_number, log_index),
    }
}

pub fn auction_extended(
    auction_id: u64,
    new_end_time: u64,
    block_number: u64,
    log_index: u64,
) -> ContractEvent {
    ContractEvent {
        kind: AuctionEventKind::AuctionExtended,
        auction_id,
        data: StoredEventData::AuctionExtended { new_end_time },
        meta: event_meta(block_number, log_index),
    }
}

pub fn auction_ended(
    auction_id: u64,
    winner: Address,
    amount: u64,
    block_number: u64,
    log_index: u64,
) -> ContractEvent {
    ContractEvent {
        kind: AuctionEventKind::AuctionEnded,
        auction_id,
        data: StoredEventData::AuctionEnded {
            winner: address_to_string(winner),
            amount: amount.to_string(),
        },
        meta: event_meta(block_number, log_index),
    }
}

/// In-process stand-in for the auction contract.
#[derive(Default)]
pub struct FakeChain {
    head: AtomicU64,
    auctions: Mutex<Vec<ChainAuction>>,
    failing_reads: Mutex<HashSet<u64>>,
    logs: Mutex<Vec<ContractEvent>>,
    /// `(kind, block)` pairs whose log queries fail for any range covering them.
    failing_logs: Mutex<Vec<(AuctionEventKind, u64)>>,
    live: Mutex<Vec<LiveReceiver>>,
    chain_down: AtomicBool,
    /// Every log query fails, as under provider rate limiting.
    logs_down: AtomicBool,
    pub state_reads: AtomicUsize,
    pub log_queries: AtomicUsize,
    pub subscriptions: AtomicUsize,
}

impl FakeChain {
    pub fn with_auctions(auctions: Vec<ChainAuction>) -> Self {
        let chain = Self::default();
        *chain.auctions.lock() = auctions;
        chain
    }

    pub fn set_head(&self, block: u64) {
        self.head.store(block, Ordering::SeqCst);
    }

    pub fn push_auction(&self, auction: ChainAuction) {
        self.auctions.lock().push(auction);
    }

    pub fn update_auction(&self, id: u64, f: impl FnOnce(&mut ChainAuction)) {
        let mut auctions = self.auctions.lock();
        if let Some(auction) = auctions.iter_mut().find(|a| a.id == id) {
            f(auction);
        }
    }

    pub fn fail_reads_of(&self, id: u64) {
        self.failing_reads.lock().insert(id);
    }

    pub fn heal_reads_of(&self, id: u64) {
        self.failing_reads.lock().remove(&id);
    }

    pub fn set_logs_down(&self, down: bool) {
        self.logs_down.store(down, Ordering::SeqCst);
    }

    pub fn set_down(&self, down: bool) {
        self.chain_down.store(down, Ordering::SeqCst);
    }

    pub fn push_log(&self, event: ContractEvent) {
        self.logs.lock().push(event);
    }

    pub fn fail_logs_at(&self, kind: AuctionEventKind, block: u64) {
        self.failing_logs.lock().push((kind, block));
    }

    /// Queues a live subscription; the next `subscribe_events` call takes it.
    pub fn open_live_channel(&self) -> LiveSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.live.lock().push(rx);
        tx
    }

    fn ensure_up(&self) -> Result<(), ChainClientError> {
        if self.chain_down.load(Ordering::SeqCst) {
            return Err(ChainClientError::Other(anyhow!("connection refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl AuctionChainApi for FakeChain {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        self.ensure_up()?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn auction_count(&self) -> Result<u64, ChainClientError> {
        self.ensure_up()?;
        Ok(self.auctions.lock().len() as u64)
    }

    async fn auction_state(&self, id: u64) -> Result<ChainAuction, ChainClientError> {
        self.ensure_up()?;
        self.state_reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().contains(&id) {
            return Err(ChainClientError::ContractCall(format!(
                "execution reverted reading auction {id}"
            )));
        }
        self.auctions
            .lock()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ChainClientError::ContractCall(format!("no auction {id}")))
    }

    async fn historical_events(
        &self,
        kind: AuctionEventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContractEvent>, ChainClientError> {
        self.ensure_up()?;
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        if self.logs_down.load(Ordering::SeqCst) {
            return Err(ChainClientError::Other(anyhow!("429 Too Many Requests")));
        }
        let failing = self
            .failing_logs
            .lock()
            .iter()
            .any(|&(k, block)| k == kind && (from_block..=to_block).contains(&block));
        if failing {
            return Err(ChainClientError::Other(anyhow!(
                "query returned more than 10000 results"
            )));
        }
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| (from_block..=to_block).contains(&e.meta.block_number))
            .cloned()
            .collect())
    }

    async fn subscribe_events(&self) -> Result<EventStream, ChainClientError> {
        self.ensure_up()?;
        let mut live = self.live.lock();
        if live.is_empty() {
            return Err(ChainClientError::Other(anyhow!("subscription refused")));
        }
        let rx = live.remove(0);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(events.boxed())
    }
}

/// Records every write-proxy call instead of sending transactions.
#[derive(Default)]
pub struct FakeTx {
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<NewAuction>>,
    /// Id reported by the next `createAuction` receipt; `None` mimics a
    /// receipt without the event.
    pub next_auction_id: Mutex<Option<u64>>,
    /// Operation name that reverts.
    pub reverting: Mutex<Option<&'static str>>,
}

impl FakeTx {
    pub fn issuing(auction_id: u64) -> Self {
        let tx = Self::default();
        *tx.next_auction_id.lock() = Some(auction_id);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, op: &'static str, detail: String) -> Result<TxOutcome, ChainClientError> {
        self.calls.lock().push(format!("{op} {detail}"));
        if *self.reverting.lock() == Some(op) {
            return Err(ChainClientError::PendingTxFailure(format!(
                "{op} reverted: execution reverted"
            )));
        }
        let n = self.calls.lock().len() as u64;
        Ok(TxOutcome {
            tx_hash: format!("{:#x}", B256::left_padding_from(&n.to_be_bytes())),
            block_number: Some(100 + n),
        })
    }
}

#[async_trait]
impl AuctionTxApi for FakeTx {
    async fn place_bid(&self, id: u64, value: U256) -> Result<TxOutcome, ChainClientError> {
        self.record("bid", format!("{id} {value}"))
    }

    async fn commit_bid(&self, id: u64, commitment: B256) -> Result<TxOutcome, ChainClientError> {
        self.record("commitBid", format!("{id} {commitment}"))
    }

    async fn reveal_bid(
        &self,
        id: u64,
        amount: U256,
        secret: B256,
    ) -> Result<TxOutcome, ChainClientError> {
        self.record("revealBid", format!("{id} {amount} {secret}"))
    }

    async fn end_auction(&self, id: u64) -> Result<TxOutcome, ChainClientError> {
        self.record("endAuction", id.to_string())
    }

    async fn accept_dutch(&self, id: u64) -> Result<TxOutcome, ChainClientError> {
        self.record("acceptDutch", id.to_string())
    }

    async fn withdraw(&self, id: u64) -> Result<TxOutcome, ChainClientError> {
        self.record("withdraw", id.to_string())
    }

    async fn create_auction(&self, auction: NewAuction) -> Result<CreatedAuction, ChainClientError> {
        let outcome = self.record("createAuction", auction.auction_type.to_string())?;
        self.created.lock().push(auction);
        Ok(CreatedAuction {
            tx_hash: outcome.tx_hash,
            block_number: outcome.block_number,
            auction_id: *self.next_auction_id.lock(),
        })
    }

    async fn set_auction_nft(&self, id: u64, nft: AuctionNft) -> Result<TxOutcome, ChainClientError> {
        self.record(
            "setAuctionNFT",
            format!(
                "{id} {} {} {} {}",
                address_to_string(nft.nft_address),
                nft.token_id,
                nft.token_amount,
                nft.is_erc1155
            ),
        )
    }

    async fn set_auction_metadata(
        &self,
        id: u64,
        ipfs_cid: String,
        require_verification: bool,
    ) -> Result<TxOutcome, ChainClientError> {
        self.record(
            "setAuctionMetadata",
            format!("{id} {ipfs_cid} {require_verification}"),
        )
    }

    async fn set_dutch_pricing(
        &self,
        id: u64,
        pricing: DutchPricing,
    ) -> Result<TxOutcome, ChainClientError> {
        self.record(
            "setDutchPricing",
            format!(
                "{id} {} {} {}",
                pricing.start_price, pricing.end_price, pricing.decrement_per_second
            ),
        )
    }

    async fn verify_identity(&self, v: u8, r: B256, s: B256) -> Result<TxOutcome, ChainClientError> {
        self.record("verifyIdentity", format!("{v} {r} {s}"))
    }
}
