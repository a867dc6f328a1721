pub mod analytics;
pub mod auctions;
pub mod bids;
pub mod chain_cursor;
pub mod common;
pub mod events;

pub use analytics::*;
pub use auctions::*;
pub use bids::*;
pub use chain_cursor::*;
pub use events::*;
