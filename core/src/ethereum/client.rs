use alloy::{
    eips::BlockId,
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
};
use async_trait::async_trait;
use futures_util::{StreamExt, future, stream::BoxStream};
use log::{info, warn};

use crate::{
    config::{ContractVariant, EthereumConfig},
    error::{BlockchainListenerError, ChainClientError},
    ethereum::{
        contract::{AuctionManager, SimpleAuctionHouse},
        event_data::{AuctionEventKind, ContractEvent, decode_log, event_signatures},
    },
    util::{u256_to_u64, u256_to_u64_saturating},
};

pub type EventStream = BoxStream<'static, Result<ContractEvent, BlockchainListenerError>>;

/// One canonical read of an auction: configuration plus current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainAuction {
    pub id: u64,
    pub auction_type: u8,
    pub seller: Address,
    pub start_time: u64,
    pub bidding_end_time: u64,
    /// Zero for strategies without a reveal phase.
    pub reveal_end_time: u64,
    pub reserve_price: U256,
    pub min_increment: U256,
    pub buy_it_now_price: U256,
    pub anti_sniping_window: u64,
    pub anti_sniping_extension: u64,
    pub ended: bool,
    pub ipfs_cid: String,
    pub highest_bidder: Address,
    pub highest_bid: U256,
    /// Escrowed token, zero when none is attached.
    pub nft_address: Address,
    pub token_id: U256,
    pub token_amount: U256,
    pub is_erc1155: bool,
    pub require_verification: bool,
    /// Dutch auctions only: the price at the block the state was read at.
    pub dutch_price: Option<U256>,
}

/// Read side of the auction contract.
#[async_trait]
pub trait AuctionChainApi: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainClientError>;

    async fn auction_count(&self) -> Result<u64, ChainClientError>;

    async fn auction_state(&self, id: u64) -> Result<ChainAuction, ChainClientError>;

    async fn historical_events(
        &self,
        kind: AuctionEventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContractEvent>, ChainClientError>;

    async fn subscribe_events(&self) -> Result<EventStream, ChainClientError>;
}

pub struct AlloyAuctionClient {
    provider: DynProvider,
    address: Address,
    variant: ContractVariant,
    pubsub: bool,
}

impl AlloyAuctionClient {
    pub async fn connect(config: &EthereumConfig) -> Result<Self, ChainClientError> {
        let address = config
            .contract_address()
            .map_err(|e| ChainClientError::InvalidAddress(e.to_string()))?;
        let provider = ProviderBuilder::new()
            .connect(config.rpc_url.trim())
            .await?
            .erased();

        info!(
            "Connected to {} ({:?} contract at {address:#x})",
            config.rpc_url, config.contract_variant
        );

        Ok(Self {
            provider,
            address,
            variant: config.contract_variant,
            pubsub: config.uses_pubsub(),
        })
    }

    pub fn variant(&self) -> ContractVariant {
        self.variant
    }

    fn base_filter(&self) -> Filter {
        Filter::new()
            .address(self.address)
            .event_signature(event_signatures(self.variant))
    }

    async fn simple_state(&self, id: u64) -> Result<ChainAuction, ChainClientError> {
        let contract = SimpleAuctionHouse::new(self.address, self.provider.clone());
        let r = contract.getAuction(U256::from(id)).call().await?;
        let end_time = u256_to_u64_saturating(r.endTime);

        Ok(ChainAuction {
            id,
            auction_type: 0,
            seller: r.seller,
            start_time: u256_to_u64_saturating(r.startTime),
            bidding_end_time: end_time,
            reveal_end_time: 0,
            reserve_price: r.reservePrice,
            min_increment: r.minIncrement,
            buy_it_now_price: r.buyItNowPrice,
            anti_sniping_window: u256_to_u64_saturating(r.antiSnipingWindow),
            anti_sniping_extension: u256_to_u64_saturating(r.antiSnipingExtension),
            ended: r.ended,
            ipfs_cid: r.ipfsCid,
            highest_bidder: r.highestBidder,
            highest_bid: r.highestBid,
            nft_address: Address::ZERO,
            token_id: U256::ZERO,
            token_amount: U256::ZERO,
            is_erc1155: false,
            require_verification: false,
            dutch_price: None,
        })
    }

    /// Configuration and bid state come from separate calls, so both are
    /// read at the same block.
    async fn advanced_state(&self, id: u64) -> Result<ChainAuction, ChainClientError> {
        let contract = AuctionManager::new(self.address, self.provider.clone());
        let at = BlockId::number(self.provider.get_block_number().await?);
        let auction_id = U256::from(id);

        let cfg = contract.auctions(auction_id).block(at).call().await?;
        let (highest_bidder, highest_bid) = if cfg.auctionType == 0 {
            let state = contract.getEnglishState(auction_id).block(at).call().await?;
            (state.highestBidder, state.highestBid)
        } else {
            let state = contract.getSealedHighest(auction_id).block(at).call().await?;
            (state.highestBidder, state.highestBid)
        };
        let dutch_price = if cfg.auctionType == 2 {
            Some(contract.getCurrentDutchPrice(auction_id).block(at).call().await?)
        } else {
            None
        };

        Ok(ChainAuction {
            id,
            auction_type: cfg.auctionType,
            seller: cfg.seller,
            start_time: u256_to_u64_saturating(cfg.startTime),
            bidding_end_time: u256_to_u64_saturating(cfg.biddingEndTime),
            reveal_end_time: u256_to_u64_saturating(cfg.revealEndTime),
            reserve_price: cfg.reservePrice,
            min_increment: cfg.minIncrement,
            buy_it_now_price: cfg.buyItNowPrice,
            anti_sniping_window: u256_to_u64_saturating(cfg.antiSnipingWindow),
            anti_sniping_extension: u256_to_u64_saturating(cfg.antiSnipingExtension),
            ended: cfg.ended,
            ipfs_cid: cfg.ipfsCid,
            highest_bidder,
            highest_bid,
            nft_address: cfg.nftAddress,
            token_id: cfg.tokenId,
            token_amount: cfg.tokenAmount,
            is_erc1155: cfg.isERC1155,
            require_verification: cfg.requireVerification,
            dutch_price,
        })
    }
}

fn decode_live(
    variant: ContractVariant,
    log: Log,
) -> future::Ready<Option<Result<ContractEvent, BlockchainListenerError>>> {
    future::ready(decode_log(variant, &log).transpose())
}

#[async_trait]
impl AuctionChainApi for AlloyAuctionClient {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn auction_count(&self) -> Result<u64, ChainClientError> {
        let count = match self.variant {
            ContractVariant::Simple => {
                SimpleAuctionHouse::new(self.address, self.provider.clone())
                    .auctionsCount()
                    .call()
                    .await?
            }
            ContractVariant::Advanced => {
                AuctionManager::new(self.address, self.provider.clone())
                    .auctionsCount()
                    .call()
                    .await?
            }
        };
        u256_to_u64(count)
            .ok_or_else(|| ChainClientError::OutOfRange(format!("auction count {count}")))
    }

    async fn auction_state(&self, id: u64) -> Result<ChainAuction, ChainClientError> {
        match self.variant {
            ContractVariant::Simple => self.simple_state(id).await,
            ContractVariant::Advanced => self.advanced_state(id).await,
        }
    }

    async fn historical_events(
        &self,
        kind: AuctionEventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ContractEvent>, ChainClientError> {
        let Some(signature) = kind.signature_hash(self.variant) else {
            return Ok(Vec::new());
        };
        let filter = Filter::new()
            .address(self.address)
            .event_signature(signature)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self.provider.get_logs(&filter).await?;
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match decode_log(self.variant, &log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => warn!("Skipping undecodable {kind} log: {e}"),
            }
        }
        Ok(events)
    }

    async fn subscribe_events(&self) -> Result<EventStream, ChainClientError> {
        let filter = self.base_filter();
        let variant = self.variant;

        if self.pubsub {
            let sub = self.provider.subscribe_logs(&filter).await?;
            info!("Subscribed to logs from {:#x}", self.address);
            Ok(sub
                .into_stream()
                .filter_map(move |log| decode_live(variant, log))
                .boxed())
        } else {
            let poller = self.provider.watch_logs(&filter).await?;
            info!("Polling logs from {:#x}", self.address);
            Ok(poller
                .into_stream()
                .flat_map(futures_util::stream::iter)
                .filter_map(move |log| decode_live(variant, log))
                .boxed())
        }
    }
}
