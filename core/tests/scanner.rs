use std::sync::{Arc, atomic::Ordering};

use async_trait::async_trait;
use indexer_service::{
    config::ContractVariant,
    error::BlockchainListenerError,
    ethereum::{AuctionEventKind, ContractEvent, EthereumEventHandler, EventScanner},
    persist::{PersistCtx, repo},
};
use parking_lot::Mutex;
use test_log::test;

mod common;

use common::{
    fixtures::{FakeChain, auction_extended, bid_placed, chain_auction, short_address},
    setup::{CONTRACT_ADDRESS, backfilled_service},
};

const CURSOR_KEY: &str = "scanner-test";

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<(u64, u64)>>,
    fail_auction: Mutex<Option<u64>>,
}

#[async_trait]
impl EthereumEventHandler for RecordingHandler {
    async fn handle_event(&self, event: ContractEvent) -> Result<(), BlockchainListenerError> {
        if *self.fail_auction.lock() == Some(event.auction_id) {
            return Err(BlockchainListenerError::EventHandlerError("rejected".into()));
        }
        self.seen
            .lock()
            .push((event.meta.block_number, event.meta.log_index));
        Ok(())
    }
}

async fn scanner_at(
    chain: &Arc<FakeChain>,
    cursor: u64,
) -> anyhow::Result<(EventScanner, PersistCtx)> {
    let ctx = PersistCtx::connect("sqlite::memory:").await?;
    repo::upsert_chain_cursor(&ctx, CURSOR_KEY, cursor).await?;
    let scanner = EventScanner::new(
        chain.clone(),
        ctx.clone(),
        CURSOR_KEY,
        ContractVariant::Advanced,
        4,
    );
    Ok((scanner, ctx))
}

#[test(tokio::test)]
async fn replays_in_chain_order_and_advances_cursor() -> anyhow::Result<()> {
    let chain = Arc::new(FakeChain::default());
    chain.set_head(20);
    chain.push_log(bid_placed(0, short_address(0xa), 150, 14, 2));
    chain.push_log(auction_extended(0, 5_000, 14, 1));
    chain.push_log(bid_placed(0, short_address(0xb), 170, 11, 0));
    chain.push_log(bid_placed(0, short_address(0xc), 190, 3, 0)); // before the cursor
    let (scanner, ctx) = scanner_at(&chain, 10).await?;
    let handler = RecordingHandler::default();

    let report = scanner.scan(&handler).await?;

    assert_eq!((report.from_block, report.to_block), (11, 20));
    assert_eq!(report.events, 3);
    assert_eq!(*handler.seen.lock(), vec![(11, 0), (14, 1), (14, 2)]);
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 20);

    // Nothing new: a second scan is a no-op.
    let report = scanner.scan(&handler).await?;
    assert_eq!(report.events, 0);
    assert_eq!(handler.seen.lock().len(), 3);
    Ok(())
}

#[test(tokio::test)]
async fn failing_event_type_skips_only_that_block() -> anyhow::Result<()> {
    let chain = Arc::new(FakeChain::default());
    chain.set_head(18);
    chain.push_log(bid_placed(0, short_address(0xa), 150, 12, 0));
    chain.push_log(bid_placed(0, short_address(0xb), 170, 13, 0));
    chain.push_log(auction_extended(0, 5_000, 13, 1));
    chain.fail_logs_at(AuctionEventKind::BidPlaced, 13);
    let (scanner, ctx) = scanner_at(&chain, 10).await?;
    let handler = RecordingHandler::default();

    let report = scanner.scan(&handler).await?;

    // BidPlaced at block 13 is lost; other types in that block and other
    // blocks for the same type still arrive.
    assert_eq!(report.skipped_blocks, 1);
    assert_eq!(*handler.seen.lock(), vec![(12, 0), (13, 1)]);
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 18);
    let kinds = AuctionEventKind::for_variant(ContractVariant::Advanced).len();
    assert!(chain.log_queries.load(Ordering::SeqCst) > 2 * kinds);
    Ok(())
}

#[test(tokio::test)]
async fn handler_failure_holds_the_cursor() -> anyhow::Result<()> {
    let chain = Arc::new(FakeChain::default());
    chain.set_head(12);
    chain.push_log(bid_placed(7, short_address(0xa), 150, 11, 0));
    chain.push_log(bid_placed(0, short_address(0xb), 170, 12, 0));
    let (scanner, ctx) = scanner_at(&chain, 10).await?;
    let handler = RecordingHandler {
        fail_auction: Mutex::new(Some(7)),
        ..Default::default()
    };

    let report = scanner.scan(&handler).await?;

    // The rest of the range is still handled, but the cursor stays before
    // the failed event.
    assert_eq!(report.events, 1);
    assert_eq!(report.failed_events, 1);
    assert_eq!(report.stopped_at, Some(11));
    assert_eq!(*handler.seen.lock(), vec![(12, 0)]);
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 10);

    handler.fail_auction.lock().take();
    let report = scanner.scan(&handler).await?;
    assert_eq!(report.failed_events, 0);
    assert_eq!(*handler.seen.lock(), vec![(12, 0), (11, 0), (12, 0)]);
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 12);
    Ok(())
}

#[test(tokio::test)]
async fn provider_outage_leaves_the_cursor_in_place() -> anyhow::Result<()> {
    let chain = Arc::new(FakeChain::default());
    chain.set_head(200);
    chain.push_log(bid_placed(0, short_address(0xa), 150, 50, 0));
    chain.set_logs_down(true);
    let ctx = PersistCtx::connect("sqlite::memory:").await?;
    repo::upsert_chain_cursor(&ctx, CURSOR_KEY, 10).await?;
    let scanner = EventScanner::new(
        chain.clone(),
        ctx.clone(),
        CURSOR_KEY,
        ContractVariant::Advanced,
        2_000,
    );
    let handler = RecordingHandler::default();

    let report = scanner.scan(&handler).await?;

    // Gives up after a handful of queries instead of splitting down to
    // every single block.
    assert_eq!(report.stopped_at, Some(11));
    assert_eq!(report.skipped_blocks, 0);
    assert!(chain.log_queries.load(Ordering::SeqCst) <= 8);
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 10);

    chain.set_logs_down(false);
    let report = scanner.scan(&handler).await?;
    assert_eq!(report.stopped_at, None);
    assert_eq!(*handler.seen.lock(), vec![(50, 0)]);
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 200);
    Ok(())
}

#[test(tokio::test)]
async fn missing_cursor_starts_at_head() -> anyhow::Result<()> {
    let chain = Arc::new(FakeChain::default());
    chain.set_head(40);
    chain.push_log(bid_placed(0, short_address(0xa), 150, 12, 0));
    let ctx = PersistCtx::connect("sqlite::memory:").await?;
    let scanner = EventScanner::new(
        chain.clone(),
        ctx.clone(),
        CURSOR_KEY,
        ContractVariant::Simple,
        100,
    );
    let handler = RecordingHandler::default();

    let report = scanner.scan(&handler).await?;

    assert_eq!(report.events, 0);
    assert!(handler.seen.lock().is_empty());
    let cursor = repo::get_chain_cursor(&ctx, CURSOR_KEY).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 40);
    assert!(!scanner.initialize_cursor(99).await?);
    Ok(())
}

#[test(tokio::test)]
async fn catch_up_through_service_records_events() -> anyhow::Result<()> {
    let chain = Arc::new(FakeChain::with_auctions(vec![chain_auction(0)]));
    chain.set_head(30);
    let service = backfilled_service(&chain).await?;

    chain.push_log(bid_placed(0, short_address(0xdef), 700, 33, 0));
    chain.set_head(35);
    let report = service.catch_up().await?;

    assert_eq!(report.events, 1);
    assert_eq!(repo::count_bids(service.persist_ctx(), 0).await?, 1);
    assert_eq!(repo::count_events(service.persist_ctx(), Some(0)).await?, 1);

    // Replaying the same range again records nothing new.
    repo::upsert_chain_cursor(service.persist_ctx(), CONTRACT_ADDRESS, 30).await?;
    service.catch_up().await?;
    assert_eq!(repo::count_bids(service.persist_ctx(), 0).await?, 1);
    Ok(())
}
