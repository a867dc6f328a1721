use crate::error::PersistDbError;
use crate::persist::PersistCtx;
use entities::{auction, bid};
use log::debug;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::HashMap;

use super::common::{now, to_i64};

/// Full replacement row for one auction, built from a canonical chain read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionUpsert {
    pub id: u64,
    pub seller: String,
    pub auction_type: u8,
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
    pub is_erc1155: bool,
    pub require_verification: bool,
    pub dutch_price: Option<String>,
}

/// Idempotent full replace keyed by auction id.
///
/// Keeps `created_at`, never moves `ended` back to false, and keeps the
/// stored title/image when metadata could not be resolved for an unchanged
/// content identifier. Once a row is ended, a stale read that still reports
/// a running auction cannot overwrite the final highest bid either.
pub async fn upsert_auction(
    ctx: &PersistCtx,
    data: AuctionUpsert,
) -> Result<auction::Model, PersistDbError> {
    let id = to_i64(data.id, "id")?;
    let start_time = to_i64(data.start_time, "start_time")?;
    let bidding_end_time = to_i64(data.bidding_end_time, "bidding_end_time")?;
    let reveal_end_time = to_i64(data.reveal_end_time, "reveal_end_time")?;
    let anti_sniping_window = to_i64(data.anti_sniping_window, "anti_sniping_window")?;
    let anti_sniping_extension = to_i64(data.anti_sniping_extension, "anti_sniping_extension")?;

    let row = ctx
        .db
        .transaction(|txn| {
            let data = data.clone();
            Box::pin(async move {
                let existing = auction::Entity::find_by_id(id).one(txn).await?;
                let now = now();

                let mut model = auction::ActiveModel {
                    id: Set(id),
                    seller: Set(data.seller),
                    auction_type: Set(i16::from(data.auction_type)),
                    start_time: Set(start_time),
                    bidding_end_time: Set(bidding_end_time),
                    reveal_end_time: Set(reveal_end_time),
                    reserve_price: Set(data.reserve_price),
                    min_increment: Set(data.min_increment),
                    buy_it_now_price: Set(data.buy_it_now_price),
                    anti_sniping_window: Set(anti_sniping_window),
                    anti_sniping_extension: Set(anti_sniping_extension),
                    ipfs_cid: Set(data.ipfs_cid.clone()),
                    ended: Set(data.ended),
                    highest_bidder: Set(data.highest_bidder),
                    highest_bid: Set(data.highest_bid),
                    title: Set(data.title.clone()),
                    image: Set(data.image.clone()),
                    nft_address: Set(data.nft_address),
                    token_id: Set(data.token_id),
                    token_amount: Set(data.token_amount),
                    is_erc1155: Set(data.is_erc1155),
                    require_verification: Set(data.require_verification),
                    dutch_price: Set(data.dutch_price),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let Some(prev) = existing else {
                    return Ok::<_, PersistDbError>(model.insert(txn).await?);
                };

                model.created_at = Set(prev.created_at);
                model.updated_at = Set(now.max(prev.updated_at));

                if prev.ended && !data.ended {
                    debug!("auction {id}: stale read reports a running auction, keeping final state");
                    model.ended = Set(true);
                    model.highest_bidder = Set(prev.highest_bidder.clone());
                    model.highest_bid = Set(prev.highest_bid.clone());
                    model.dutch_price = Set(prev.dutch_price.clone());
                }

                if data.title.is_none() && data.image.is_none() && prev.ipfs_cid == data.ipfs_cid {
                    model.title = Set(prev.title.clone());
                    model.image = Set(prev.image.clone());
                }

                Ok(model.update(txn).await?)
            })
        })
        .await?;

    Ok(row)
}

pub async fn get_auction(
    ctx: &PersistCtx,
    id: u64,
) -> Result<Option<auction::Model>, PersistDbError> {
    let row = auction::Entity::find_by_id(to_i64(id, "id")?)
        .one(ctx.db.as_ref())
        .await?;
    Ok(row)
}

pub async fn count_auctions(ctx: &PersistCtx) -> Result<u64, PersistDbError> {
    Ok(auction::Entity::find().count(ctx.db.as_ref()).await?)
}

#[derive(Debug, FromQueryResult)]
struct BidCountRow {
    auction_id: i64,
    bid_count: i64,
}

async fn bid_counts_for(
    ctx: &PersistCtx,
    ids: Vec<i64>,
) -> Result<HashMap<i64, u64>, PersistDbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = bid::Entity::find()
        .select_only()
        .column(bid::Column::AuctionId)
        .column_as(bid::Column::Id.count(), "bid_count")
        .filter(bid::Column::AuctionId.is_in(ids))
        .group_by(bid::Column::AuctionId)
        .into_model::<BidCountRow>()
        .all(ctx.db.as_ref())
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.auction_id, u64::try_from(r.bid_count).unwrap_or_default()))
        .collect())
}

/// Newest auctions first, each with its recorded bid count.
pub async fn list_auctions(
    ctx: &PersistCtx,
    limit: u64,
    offset: u64,
) -> Result<Vec<(auction::Model, u64)>, PersistDbError> {
    let rows = auction::Entity::find()
        .order_by_desc(auction::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(ctx.db.as_ref())
        .await?;

    let counts = bid_counts_for(ctx, rows.iter().map(|r| r.id).collect()).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let count = counts.get(&row.id).copied().unwrap_or_default();
            (row, count)
        })
        .collect())
}

/// Auction plus its `bid_limit` most recent bids in chain order.
pub async fn get_auction_with_bids(
    ctx: &PersistCtx,
    id: u64,
    bid_limit: u64,
) -> Result<Option<(auction::Model, Vec<bid::Model>)>, PersistDbError> {
    let Some(row) = get_auction(ctx, id).await? else {
        return Ok(None);
    };

    let bids = bid::Entity::find()
        .filter(bid::Column::AuctionId.eq(row.id))
        .order_by_desc(bid::Column::BlockNumber)
        .order_by_desc(bid::Column::LogIndex)
        .order_by_desc(bid::Column::Id)
        .limit(bid_limit)
        .all(ctx.db.as_ref())
        .await?;

    Ok(Some((row, bids)))
}
