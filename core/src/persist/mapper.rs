use crate::{
    error::PersistDbError,
    model::{AuctionInfo, AuctionPhase, BidInfo, EventInfo},
    persist::repo::common::to_u64,
};
use entities::{auction, auction_event, bid};

pub fn auction_model_to_info(
    row: auction::Model,
    bid_count: u64,
    now: u64,
) -> Result<AuctionInfo, PersistDbError> {
    let start_time = to_u64(row.start_time, "start_time")?;
    let bidding_end_time = to_u64(row.bidding_end_time, "bidding_end_time")?;
    let reveal_end_time = to_u64(row.reveal_end_time, "reveal_end_time")?;
    let phase = AuctionPhase::derive(
        row.ended,
        start_time,
        bidding_end_time,
        reveal_end_time,
        now,
    );
    let auction_type = u8::try_from(row.auction_type).map_err(|_| PersistDbError::OutOfRange {
        column: "auction_type",
        value: row.auction_type.to_string(),
    })?;

    Ok(AuctionInfo {
        id: to_u64(row.id, "id")?,
        auction_type,
        seller: row.seller,
        start_time,
        bidding_end_time,
        reveal_end_time,
        reserve_price: row.reserve_price,
        min_increment: row.min_increment,
        buy_it_now_price: row.buy_it_now_price,
        anti_sniping_window: to_u64(row.anti_sniping_window, "anti_sniping_window")?,
        anti_sniping_extension: to_u64(row.anti_sniping_extension, "anti_sniping_extension")?,
        ipfs_cid: row.ipfs_cid,
        ended: row.ended,
        highest_bidder: row.highest_bidder,
        highest_bid: row.highest_bid,
        title: row.title,
        image: row.image,
        nft_address: row.nft_address,
        token_id: row.token_id,
        token_amount: row.token_amount,
        is_erc1155: row.is_erc1155,
        require_verification: row.require_verification,
        dutch_price: row.dutch_price,
        bid_count,
        phase,
        active: phase.is_active(),
        created_at: row.created_at.and_utc().timestamp_millis(),
        updated_at: row.updated_at.and_utc().timestamp_millis(),
    })
}

pub fn bid_model_to_info(row: bid::Model) -> Result<BidInfo, PersistDbError> {
    Ok(BidInfo {
        id: row.id,
        auction_id: to_u64(row.auction_id, "auction_id")?,
        bidder: row.bidder,
        amount: row.amount,
        block_number: to_u64(row.block_number, "block_number")?,
        tx_hash: row.tx_hash,
        log_index: to_u64(row.log_index, "log_index")?,
        created_at: row.created_at.and_utc().timestamp_millis(),
    })
}

pub fn event_model_to_info(row: auction_event::Model) -> Result<EventInfo, PersistDbError> {
    let payload = serde_json::from_str(&row.payload)?;
    Ok(EventInfo {
        id: row.id,
        name: row.name,
        auction_id: row.auction_id.map(|id| to_u64(id, "auction_id")).transpose()?,
        payload,
        block_number: to_u64(row.block_number, "block_number")?,
        tx_hash: row.tx_hash,
        log_index: to_u64(row.log_index, "log_index")?,
        created_at: row.created_at.and_utc().timestamp_millis(),
    })
}
