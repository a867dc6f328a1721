use crate::error::PersistDbError;
use crate::ethereum::ContractEvent;
use crate::persist::PersistCtx;
use entities::auction_event;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use super::common::{now, to_i64};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub auction_id: Option<u64>,
    pub payload: String,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
}

impl TryFrom<&ContractEvent> for NewEvent {
    type Error = PersistDbError;

    fn try_from(event: &ContractEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            name: event.kind.name().to_string(),
            auction_id: Some(event.auction_id),
            payload: serde_json::to_string(&event.data)?,
            block_number: event.meta.block_number,
            tx_hash: event.meta.tx_hash.clone(),
            log_index: event.meta.log_index,
        })
    }
}

/// Returns false when the same `(tx_hash, log_index)` was already recorded.
pub async fn insert_event(ctx: &PersistCtx, event: NewEvent) -> Result<bool, PersistDbError> {
    let auction_id = event
        .auction_id
        .map(|id| to_i64(id, "auction_id"))
        .transpose()?;
    let row = auction_event::ActiveModel {
        id: NotSet,
        name: Set(event.name),
        auction_id: Set(auction_id),
        payload: Set(event.payload),
        block_number: Set(to_i64(event.block_number, "block_number")?),
        tx_hash: Set(event.tx_hash),
        log_index: Set(to_i64(event.log_index, "log_index")?),
        created_at: Set(now()),
    };

    let affected = auction_event::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                auction_event::Column::TxHash,
                auction_event::Column::LogIndex,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(ctx.db.as_ref())
        .await?;

    Ok(affected == 1)
}

/// Most recent first, in chain order.
pub async fn list_events(
    ctx: &PersistCtx,
    limit: u64,
    offset: u64,
    auction_id: Option<u64>,
) -> Result<Vec<auction_event::Model>, PersistDbError> {
    let mut query = auction_event::Entity::find();
    if let Some(id) = auction_id {
        query = query.filter(auction_event::Column::AuctionId.eq(to_i64(id, "auction_id")?));
    }

    let rows = query
        .order_by_desc(auction_event::Column::BlockNumber)
        .order_by_desc(auction_event::Column::LogIndex)
        .order_by_desc(auction_event::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(ctx.db.as_ref())
        .await?;
    Ok(rows)
}

pub async fn count_events(ctx: &PersistCtx, auction_id: Option<u64>) -> Result<u64, PersistDbError> {
    let mut query = auction_event::Entity::find();
    if let Some(id) = auction_id {
        query = query.filter(auction_event::Column::AuctionId.eq(to_i64(id, "auction_id")?));
    }
    Ok(query.count(ctx.db.as_ref()).await?)
}
