use sea_orm::entity::prelude::DeriveIden;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Auction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Auction::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Auction::Seller).text().not_null())
                    .col(
                        ColumnDef::new(Auction::AuctionType)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Auction::StartTime).big_integer().not_null())
                    .col(
                        ColumnDef::new(Auction::BiddingEndTime)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Auction::RevealEndTime)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Auction::ReservePrice).text().not_null())
                    .col(ColumnDef::new(Auction::MinIncrement).text().not_null())
                    .col(ColumnDef::new(Auction::BuyItNowPrice).text().not_null())
                    .col(
                        ColumnDef::new(Auction::AntiSnipingWindow)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Auction::AntiSnipingExtension)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Auction::IpfsCid).text().null())
                    .col(
                        ColumnDef::new(Auction::Ended)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Auction::HighestBidder).text().null())
                    .col(ColumnDef::new(Auction::HighestBid).text().not_null())
                    .col(ColumnDef::new(Auction::Title).text().null())
                    .col(ColumnDef::new(Auction::Image).text().null())
                    .col(ColumnDef::new(Auction::NftAddress).text().null())
                    .col(
                        ColumnDef::new(Auction::TokenId)
                            .text()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(Auction::TokenAmount)
                            .text()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(Auction::IsErc1155)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Auction::RequireVerification)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Auction::DutchPrice).text().null())
                    .col(ColumnDef::new(Auction::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Auction::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Bid and AuctionEvent rows may be recorded before the auction row
        // exists (out-of-order delivery), so auction_id is not a hard FK.
        manager
            .create_table(
                Table::create()
                    .table(Bid::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bid::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bid::AuctionId).big_integer().not_null())
                    .col(ColumnDef::new(Bid::Bidder).text().not_null())
                    .col(ColumnDef::new(Bid::Amount).text().not_null())
                    .col(ColumnDef::new(Bid::BlockNumber).big_integer().not_null())
                    .col(ColumnDef::new(Bid::TxHash).text().not_null())
                    .col(ColumnDef::new(Bid::LogIndex).big_integer().not_null())
                    .col(ColumnDef::new(Bid::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_bid_tx_log")
                    .table(Bid::Table)
                    .col(Bid::TxHash)
                    .col(Bid::LogIndex)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bid_auction_chain_order")
                    .table(Bid::Table)
                    .col(Bid::AuctionId)
                    .col(Bid::BlockNumber)
                    .col(Bid::LogIndex)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuctionEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuctionEvent::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuctionEvent::Name).text().not_null())
                    .col(ColumnDef::new(AuctionEvent::AuctionId).big_integer().null())
                    .col(ColumnDef::new(AuctionEvent::Payload).text().not_null())
                    .col(
                        ColumnDef::new(AuctionEvent::BlockNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuctionEvent::TxHash).text().not_null())
                    .col(
                        ColumnDef::new(AuctionEvent::LogIndex)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuctionEvent::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_auction_event_tx_log")
                    .table(AuctionEvent::Table)
                    .col(AuctionEvent::TxHash)
                    .col(AuctionEvent::LogIndex)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auction_event_auction_id")
                    .table(AuctionEvent::Table)
                    .col(AuctionEvent::AuctionId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuctionEvent::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bid::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Auction::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Auction {
    #[sea_orm(iden = "Auction")]
    Table,
    Id,
    Seller,
    AuctionType,
    StartTime,
    BiddingEndTime,
    RevealEndTime,
    ReservePrice,
    MinIncrement,
    BuyItNowPrice,
    AntiSnipingWindow,
    AntiSnipingExtension,
    IpfsCid,
    Ended,
    HighestBidder,
    HighestBid,
    Title,
    Image,
    NftAddress,
    TokenId,
    TokenAmount,
    IsErc1155,
    RequireVerification,
    DutchPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Bid {
    #[sea_orm(iden = "Bid")]
    Table,
    Id,
    AuctionId,
    Bidder,
    Amount,
    BlockNumber,
    TxHash,
    LogIndex,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuctionEvent {
    #[sea_orm(iden = "AuctionEvent")]
    Table,
    Id,
    Name,
    AuctionId,
    Payload,
    BlockNumber,
    TxHash,
    LogIndex,
    CreatedAt,
}
