pub mod client;
pub mod contract;
pub mod event_data;
pub mod event_handler;
pub mod listener;
pub mod scanner;
pub mod writer;

pub use client::{AlloyAuctionClient, AuctionChainApi, ChainAuction, EventStream};
pub use event_data::{AuctionEventKind, ContractEvent, EventMeta, ImpliedBid, StoredEventData};
pub use event_handler::{EthereumEventHandler, StreamState};
pub use listener::EthereumListener;
pub use scanner::{EventScanner, ScanReport};
pub use writer::{
    AlloyAuctionWriter, AuctionNft, AuctionTxApi, CreatedAuction, DutchPricing, NewAuction,
    TxOutcome,
};
