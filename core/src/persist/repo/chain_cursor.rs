use crate::error::PersistDbError;
use crate::persist::PersistCtx;
use entities::chain_cursor;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};

use super::common::{now, to_i64};

pub async fn get_chain_cursor(
    ctx: &PersistCtx,
    contract_address: &str,
) -> Result<Option<chain_cursor::Model>, PersistDbError> {
    let row = chain_cursor::Entity::find_by_id(contract_address.to_owned())
        .one(ctx.db.as_ref())
        .await?;
    Ok(row)
}

pub async fn upsert_chain_cursor(
    ctx: &PersistCtx,
    contract_address: &str,
    last_block_number: u64,
) -> Result<(), PersistDbError> {
    let now = now();
    let row = chain_cursor::ActiveModel {
        contract_address: Set(contract_address.to_owned()),
        last_block_number: Set(to_i64(last_block_number, "last_block_number")?),
        created_at: Set(now),
        updated_at: Set(now),
    };

    chain_cursor::Entity::insert(row)
        .on_conflict(
            OnConflict::column(chain_cursor::Column::ContractAddress)
                .update_columns([
                    chain_cursor::Column::LastBlockNumber,
                    chain_cursor::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(ctx.db.as_ref())
        .await?;

    Ok(())
}
