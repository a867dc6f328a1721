pub mod prelude;

pub mod auction;
pub mod auction_event;
pub mod bid;
pub mod chain_cursor;
