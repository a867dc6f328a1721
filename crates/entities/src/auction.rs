//! `SeaORM` Entity for the mirrored on-chain auction state.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "Auction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "Text")]
    pub seller: String,
    #[sea_orm(column_type = "SmallInteger")]
    pub auction_type: i16,
    #[sea_orm(column_type = "BigInteger")]
    pub start_time: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub bidding_end_time: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub reveal_end_time: i64,
    #[sea_orm(column_type = "Text")]
    pub reserve_price: String,
    #[sea_orm(column_type = "Text")]
    pub min_increment: String,
    #[sea_orm(column_type = "Text")]
    pub buy_it_now_price: String,
    #[sea_orm(column_type = "BigInteger")]
    pub anti_sniping_window: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub anti_sniping_extension: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub ipfs_cid: Option<String>,
    pub ended: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub highest_bidder: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub highest_bid: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub image: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub nft_address: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub token_id: String,
    #[sea_orm(column_type = "Text")]
    pub token_amount: String,
    pub is_erc1155: bool,
    pub require_verification: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub dutch_price: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bid::Entity")]
    Bid,
    #[sea_orm(has_many = "super::auction_event::Entity")]
    AuctionEvent,
}

impl Related<super::bid::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bid.def()
    }
}

impl Related<super::auction_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
