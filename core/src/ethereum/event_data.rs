use std::fmt;

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};

use crate::config::ContractVariant;
use crate::error::BlockchainListenerError;
use crate::ethereum::contract::{AuctionManager, SimpleAuctionHouse};
use crate::util::{address_to_string, u256_to_u64, u256_to_u64_saturating};

/// Every event name either contract surface can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionEventKind {
    AuctionCreated,
    BidCommitted,
    BidPlaced,
    AuctionExtended,
    BuyItNowTriggered,
    AuctionEnded,
    Withdrawn,
}

const SIMPLE_KINDS: &[AuctionEventKind] = &[
    AuctionEventKind::AuctionCreated,
    AuctionEventKind::BidPlaced,
    AuctionEventKind::AuctionExtended,
    AuctionEventKind::BuyItNowTriggered,
    AuctionEventKind::AuctionEnded,
    AuctionEventKind::Withdrawn,
];

const ADVANCED_KINDS: &[AuctionEventKind] = &[
    AuctionEventKind::AuctionCreated,
    AuctionEventKind::BidCommitted,
    AuctionEventKind::BidPlaced,
    AuctionEventKind::AuctionExtended,
    AuctionEventKind::BuyItNowTriggered,
    AuctionEventKind::AuctionEnded,
];

impl AuctionEventKind {
    pub fn name(self) -> &'static str {
        match self {
            AuctionEventKind::AuctionCreated => "AuctionCreated",
            AuctionEventKind::BidCommitted => "BidCommitted",
            AuctionEventKind::BidPlaced => "BidPlaced",
            AuctionEventKind::AuctionExtended => "AuctionExtended",
            AuctionEventKind::BuyItNowTriggered => "BuyItNowTriggered",
            AuctionEventKind::AuctionEnded => "AuctionEnded",
            AuctionEventKind::Withdrawn => "Withdrawn",
        }
    }

    pub fn for_variant(variant: ContractVariant) -> &'static [AuctionEventKind] {
        match variant {
            ContractVariant::Simple => SIMPLE_KINDS,
            ContractVariant::Advanced => ADVANCED_KINDS,
        }
    }

    /// topic0 of this event on the given contract surface, `None` when the
    /// surface does not emit it.
    pub fn signature_hash(self, variant: ContractVariant) -> Option<B256> {
        use AuctionEventKind::*;
        match variant {
            ContractVariant::Simple => match self {
                AuctionCreated => Some(SimpleAuctionHouse::AuctionCreated::SIGNATURE_HASH),
                BidPlaced => Some(SimpleAuctionHouse::BidPlaced::SIGNATURE_HASH),
                AuctionExtended => Some(SimpleAuctionHouse::AuctionExtended::SIGNATURE_HASH),
                BuyItNowTriggered => Some(SimpleAuctionHouse::BuyItNowTriggered::SIGNATURE_HASH),
                AuctionEnded => Some(SimpleAuctionHouse::AuctionEnded::SIGNATURE_HASH),
                Withdrawn => Some(SimpleAuctionHouse::Withdrawn::SIGNATURE_HASH),
                BidCommitted => None,
            },
            ContractVariant::Advanced => match self {
                AuctionCreated => Some(AuctionManager::AuctionCreated::SIGNATURE_HASH),
                BidCommitted => Some(AuctionManager::BidCommitted::SIGNATURE_HASH),
                BidPlaced => Some(AuctionManager::BidPlaced::SIGNATURE_HASH),
                AuctionExtended => Some(AuctionManager::AuctionExtended::SIGNATURE_HASH),
                BuyItNowTriggered => Some(AuctionManager::BuyItNowTriggered::SIGNATURE_HASH),
                AuctionEnded => Some(AuctionManager::AuctionEnded::SIGNATURE_HASH),
                Withdrawn => None,
            },
        }
    }

    pub fn from_topic(variant: ContractVariant, topic: &B256) -> Option<AuctionEventKind> {
        Self::for_variant(variant)
            .iter()
            .copied()
            .find(|kind| kind.signature_hash(variant).as_ref() == Some(topic))
    }
}

impl fmt::Display for AuctionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every topic0 the live filter should match for a variant.
pub fn event_signatures(variant: ContractVariant) -> Vec<B256> {
    AuctionEventKind::for_variant(variant)
        .iter()
        .filter_map(|kind| kind.signature_hash(variant))
        .collect()
}

/// Decoded payload, persisted as JSON on the event record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoredEventData {
    AuctionCreated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seller: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auction_type: Option<u8>,
        start_time: u64,
        end_time: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reveal_end_time: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reserve_price: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_increment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buy_it_now_price: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ipfs_cid: Option<String>,
    },
    BidCommitted {
        bidder: String,
        commitment: String,
    },
    BidPlaced {
        bidder: String,
        amount: String,
    },
    AuctionExtended {
        new_end_time: u64,
    },
    BuyItNowTriggered {
        buyer: String,
        amount: String,
    },
    AuctionEnded {
        winner: String,
        amount: String,
    },
    Withdrawn {
        bidder: String,
        amount: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventMeta {
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
}

impl EventMeta {
    pub fn from_log(log: &Log) -> Result<Self, BlockchainListenerError> {
        let block_number = log
            .block_number
            .ok_or(BlockchainListenerError::IncompleteLog("block number"))?;
        let tx_hash = log
            .transaction_hash
            .ok_or(BlockchainListenerError::IncompleteLog("transaction hash"))?;
        let log_index = log
            .log_index
            .ok_or(BlockchainListenerError::IncompleteLog("log index"))?;
        Ok(Self {
            block_number,
            tx_hash: format!("{tx_hash:#x}"),
            log_index,
        })
    }
}

/// A bid that an event implies, recorded alongside the event itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImpliedBid {
    pub bidder: String,
    pub amount: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractEvent {
    pub kind: AuctionEventKind,
    pub auction_id: u64,
    pub data: StoredEventData,
    pub meta: EventMeta,
}

impl ContractEvent {
    pub fn implied_bid(&self) -> Option<ImpliedBid> {
        match &self.data {
            StoredEventData::BidPlaced { bidder, amount } => Some(ImpliedBid {
                bidder: bidder.clone(),
                amount: amount.clone(),
            }),
            StoredEventData::BuyItNowTriggered { buyer, amount } => Some(ImpliedBid {
                bidder: buyer.clone(),
                amount: amount.clone(),
            }),
            _ => None,
        }
    }
}

fn auction_id_of(raw: U256) -> Result<u64, BlockchainListenerError> {
    u256_to_u64(raw).ok_or_else(|| {
        BlockchainListenerError::EventHandlerError(format!("auction id {raw} exceeds u64"))
    })
}

fn addr(value: Address) -> String {
    address_to_string(value)
}

/// Decode a raw log for the given surface. `Ok(None)` means the log is not
/// one of the indexed events.
pub fn decode_log(
    variant: ContractVariant,
    log: &Log,
) -> Result<Option<ContractEvent>, BlockchainListenerError> {
    let Some(topic) = log.topic0() else {
        return Ok(None);
    };
    let Some(kind) = AuctionEventKind::from_topic(variant, topic) else {
        return Ok(None);
    };
    let meta = EventMeta::from_log(log)?;

    let (auction_id, data) = match variant {
        ContractVariant::Simple => decode_simple(kind, log)?,
        ContractVariant::Advanced => decode_advanced(kind, log)?,
    };

    Ok(Some(ContractEvent {
        kind,
        auction_id,
        data,
        meta,
    }))
}

fn decode_simple(
    kind: AuctionEventKind,
    log: &Log,
) -> Result<(u64, StoredEventData), BlockchainListenerError> {
    use SimpleAuctionHouse as C;

    let decoded = match kind {
        AuctionEventKind::AuctionCreated => {
            let ev = log.log_decode::<C::AuctionCreated>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::AuctionCreated {
                    seller: Some(addr(ev.seller)),
                    auction_type: None,
                    start_time: u256_to_u64_saturating(ev.startTime),
                    end_time: u256_to_u64_saturating(ev.endTime),
                    reveal_end_time: None,
                    reserve_price: None,
                    min_increment: None,
                    buy_it_now_price: None,
                    ipfs_cid: Some(ev.ipfsCid).filter(|cid| !cid.is_empty()),
                },
            )
        }
        AuctionEventKind::BidPlaced => {
            let ev = log.log_decode::<C::BidPlaced>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::BidPlaced {
                    bidder: addr(ev.bidder),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::AuctionExtended => {
            let ev = log.log_decode::<C::AuctionExtended>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::AuctionExtended {
                    new_end_time: u256_to_u64_saturating(ev.newEndTime),
                },
            )
        }
        AuctionEventKind::BuyItNowTriggered => {
            let ev = log.log_decode::<C::BuyItNowTriggered>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::BuyItNowTriggered {
                    buyer: addr(ev.buyer),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::AuctionEnded => {
            let ev = log.log_decode::<C::AuctionEnded>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::AuctionEnded {
                    winner: addr(ev.winner),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::Withdrawn => {
            let ev = log.log_decode::<C::Withdrawn>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::Withdrawn {
                    bidder: addr(ev.bidder),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::BidCommitted => {
            return Err(BlockchainListenerError::EventHandlerError(
                "BidCommitted is not emitted by the simple auction house".to_string(),
            ));
        }
    };
    Ok(decoded)
}

fn decode_advanced(
    kind: AuctionEventKind,
    log: &Log,
) -> Result<(u64, StoredEventData), BlockchainListenerError> {
    use AuctionManager as C;

    let decoded = match kind {
        AuctionEventKind::AuctionCreated => {
            let ev = log.log_decode::<C::AuctionCreated>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::AuctionCreated {
                    seller: None,
                    auction_type: Some(ev.auctionType),
                    start_time: u256_to_u64_saturating(ev.startTime),
                    end_time: u256_to_u64_saturating(ev.biddingEndTime),
                    reveal_end_time: Some(u256_to_u64_saturating(ev.revealEndTime)),
                    reserve_price: Some(ev.reservePrice.to_string()),
                    min_increment: Some(ev.minIncrement.to_string()),
                    buy_it_now_price: Some(ev.buyItNowPrice.to_string()),
                    ipfs_cid: None,
                },
            )
        }
        AuctionEventKind::BidCommitted => {
            let ev = log.log_decode::<C::BidCommitted>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::BidCommitted {
                    bidder: addr(ev.bidder),
                    commitment: format!("{:#x}", ev.commitment),
                },
            )
        }
        AuctionEventKind::BidPlaced => {
            let ev = log.log_decode::<C::BidPlaced>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::BidPlaced {
                    bidder: addr(ev.bidder),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::AuctionExtended => {
            let ev = log.log_decode::<C::AuctionExtended>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::AuctionExtended {
                    new_end_time: u256_to_u64_saturating(ev.newEndTime),
                },
            )
        }
        AuctionEventKind::BuyItNowTriggered => {
            let ev = log.log_decode::<C::BuyItNowTriggered>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::BuyItNowTriggered {
                    buyer: addr(ev.buyer),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::AuctionEnded => {
            let ev = log.log_decode::<C::AuctionEnded>()?.inner.data;
            (
                auction_id_of(ev.auctionId)?,
                StoredEventData::AuctionEnded {
                    winner: addr(ev.winner),
                    amount: ev.amount.to_string(),
                },
            )
        }
        AuctionEventKind::Withdrawn => {
            return Err(BlockchainListenerError::EventHandlerError(
                "Withdrawn is not emitted by the auction manager".to_string(),
            ));
        }
    };
    Ok(decoded)
}
