use crate::error::PersistDbError;
use crate::persist::PersistCtx;
use entities::{auction_event, bid};
use sea_orm::{ColumnTrait, EntityTrait, FromQueryResult, QueryOrder, QuerySelect};

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct EventCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct AuctionBidCount {
    pub auction_id: i64,
    pub count: i64,
}

pub async fn event_counts_by_name(ctx: &PersistCtx) -> Result<Vec<EventCount>, PersistDbError> {
    let rows = auction_event::Entity::find()
        .select_only()
        .column(auction_event::Column::Name)
        .column_as(auction_event::Column::Id.count(), "count")
        .group_by(auction_event::Column::Name)
        .order_by_asc(auction_event::Column::Name)
        .into_model::<EventCount>()
        .all(ctx.db.as_ref())
        .await?;
    Ok(rows)
}

/// Only auctions with at least one recorded bid appear.
pub async fn bid_counts_per_auction(
    ctx: &PersistCtx,
) -> Result<Vec<AuctionBidCount>, PersistDbError> {
    let rows = bid::Entity::find()
        .select_only()
        .column(bid::Column::AuctionId)
        .column_as(bid::Column::Id.count(), "count")
        .group_by(bid::Column::AuctionId)
        .order_by_asc(bid::Column::AuctionId)
        .into_model::<AuctionBidCount>()
        .all(ctx.db.as_ref())
        .await?;
    Ok(rows)
}
