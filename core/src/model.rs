//! JSON shapes served by the API and pushed to live subscribers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an auction stands relative to wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionPhase {
    Upcoming,
    Active,
    /// Sealed-bid strategies only: bidding closed, reveals still accepted.
    Revealing,
    /// Every deadline has passed but nobody has ended the auction on chain yet.
    Closed,
    Ended,
}

impl AuctionPhase {
    pub fn derive(
        ended: bool,
        start_time: u64,
        bidding_end_time: u64,
        reveal_end_time: u64,
        now: u64,
    ) -> Self {
        if ended {
            AuctionPhase::Ended
        } else if now < start_time {
            AuctionPhase::Upcoming
        } else if now < bidding_end_time {
            AuctionPhase::Active
        } else if reveal_end_time > bidding_end_time && now < reveal_end_time {
            AuctionPhase::Revealing
        } else {
            AuctionPhase::Closed
        }
    }

    pub fn is_active(self) -> bool {
        self == AuctionPhase::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionInfo {
    pub id: u64,
    pub auction_type: u8,
    pub seller: String,
    pub start_time: u64,
    pub bidding_end_time: u64,
    pub reveal_end_time: u64,
    pub reserve_price: String,
    pub min_increment: String,
    pub buy_it_now_price: String,
    pub anti_sniping_window: u64,
    pub anti_sniping_extension: u64,
    pub ipfs_cid: Option<String>,
    pub ended: bool,
    pub highest_bidder: Option<String>,
    pub highest_bid: String,
    pub title: Option<String>,
    pub image: Option<String>,
    pub nft_address: Option<String>,
    pub token_id: String,
    pub token_amount: String,
    #[serde(rename = "isERC1155")]
    pub is_erc1155: bool,
    pub require_verification: bool,
    /// Dutch auctions only, as of the last canonical read.
    pub dutch_price: Option<String>,
    pub bid_count: u64,
    pub phase: AuctionPhase,
    pub active: bool,
    /// Unix milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidInfo {
    pub id: i64,
    pub auction_id: u64,
    pub bidder: String,
    pub amount: String,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionDetail {
    pub auction: AuctionInfo,
    pub bids: Vec<BidInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub id: i64,
    pub name: String,
    pub auction_id: Option<u64>,
    pub payload: serde_json::Value,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsInfo {
    pub total_auctions: u64,
    pub total_bids: u64,
    pub event_counts: BTreeMap<String, u64>,
    /// Averaged over every stored auction, including those without bids.
    pub average_bids_per_auction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        // start 100, bidding ends 200, reveal ends 300
        let phase = |now| AuctionPhase::derive(false, 100, 200, 300, now);
        assert_eq!(phase(99), AuctionPhase::Upcoming);
        assert_eq!(phase(100), AuctionPhase::Active);
        assert_eq!(phase(199), AuctionPhase::Active);
        assert_eq!(phase(200), AuctionPhase::Revealing);
        assert_eq!(phase(300), AuctionPhase::Closed);
    }

    #[test]
    fn english_auction_has_no_reveal_phase() {
        assert_eq!(
            AuctionPhase::derive(false, 0, 200, 200, 250),
            AuctionPhase::Closed
        );
    }

    #[test]
    fn ended_wins_over_time() {
        let phase = AuctionPhase::derive(true, 100, 200, 300, 150);
        assert_eq!(phase, AuctionPhase::Ended);
        assert!(!phase.is_active());
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AuctionPhase::Revealing).unwrap(),
            "\"revealing\""
        );
    }
}
