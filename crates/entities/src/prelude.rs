pub use super::auction::Entity as Auction;
pub use super::auction_event::Entity as AuctionEvent;
pub use super::bid::Entity as Bid;
pub use super::chain_cursor::Entity as ChainCursor;
