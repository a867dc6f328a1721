use crate::error::PersistDbError;
use crate::persist::PersistCtx;
use entities::bid;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use super::common::{now, to_i64};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBid {
    pub auction_id: u64,
    pub bidder: String,
    pub amount: String,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
}

/// Returns false when the same `(tx_hash, log_index)` was already recorded.
pub async fn insert_bid(ctx: &PersistCtx, new_bid: NewBid) -> Result<bool, PersistDbError> {
    let row = bid::ActiveModel {
        id: NotSet,
        auction_id: Set(to_i64(new_bid.auction_id, "auction_id")?),
        bidder: Set(new_bid.bidder),
        amount: Set(new_bid.amount),
        block_number: Set(to_i64(new_bid.block_number, "block_number")?),
        tx_hash: Set(new_bid.tx_hash),
        log_index: Set(to_i64(new_bid.log_index, "log_index")?),
        created_at: Set(now()),
    };

    let affected = bid::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([bid::Column::TxHash, bid::Column::LogIndex])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(ctx.db.as_ref())
        .await?;

    Ok(affected == 1)
}

pub async fn count_bids(ctx: &PersistCtx, auction_id: u64) -> Result<u64, PersistDbError> {
    let count = bid::Entity::find()
        .filter(bid::Column::AuctionId.eq(to_i64(auction_id, "auction_id")?))
        .count(ctx.db.as_ref())
        .await?;
    Ok(count)
}
