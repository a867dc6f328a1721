use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "AuctionEvent")]
pub struct Model {
    #[sea_orm(primary_key, column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "BigInteger", nullable)]
    pub auction_id: Option<i64>,
    /// JSON encoded `StoredEventData`.
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    #[sea_orm(column_type = "BigInteger")]
    pub block_number: i64,
    #[sea_orm(column_type = "Text")]
    pub tx_hash: String,
    #[sea_orm(column_type = "BigInteger")]
    pub log_index: i64,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::auction::Entity",
        from = "Column::AuctionId",
        to = "super::auction::Column::Id"
    )]
    Auction,
}

impl Related<super::auction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Auction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
