use indexer_service::{
    ethereum::ContractEvent,
    metadata::ItemMetadata,
    persist::{
        PersistCtx,
        repo::{self, AuctionUpsert, NewBid, NewEvent},
    },
};
use test_log::test;

mod common;

use common::{
    fixtures::{bid_placed, chain_auction, short_address},
    setup::test_service,
};

async fn ctx() -> anyhow::Result<PersistCtx> {
    PersistCtx::connect("sqlite::memory:").await
}

fn upsert_for(id: u64) -> AuctionUpsert {
    AuctionUpsert::from_chain(chain_auction(id), Some("bafy-item".into()), None)
}

fn new_bid(event: &ContractEvent) -> NewBid {
    let bid = event.implied_bid().expect("bid event");
    NewBid {
        auction_id: event.auction_id,
        bidder: bid.bidder,
        amount: bid.amount,
        block_number: event.meta.block_number,
        tx_hash: event.meta.tx_hash.clone(),
        log_index: event.meta.log_index,
    }
}

#[test(tokio::test)]
async fn upsert_is_idempotent() -> anyhow::Result<()> {
    let ctx = ctx().await?;

    let first = repo::upsert_auction(&ctx, upsert_for(3)).await?;
    let second = repo::upsert_auction(&ctx, upsert_for(3)).await?;

    assert_eq!(repo::count_auctions(&ctx).await?, 1);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(first.seller, second.seller);
    assert_eq!(second.highest_bid, "0");
    assert_eq!(second.highest_bidder, None);
    Ok(())
}

#[test(tokio::test)]
async fn upsert_replaces_mutable_fields() -> anyhow::Result<()> {
    let ctx = ctx().await?;
    repo::upsert_auction(&ctx, upsert_for(0)).await?;

    let mut update = upsert_for(0);
    update.highest_bidder = Some("0x0000000000000000000000000000000000000def".into());
    update.highest_bid = "700".into();
    update.bidding_end_time += 120;
    let row = repo::upsert_auction(&ctx, update.clone()).await?;

    assert_eq!(row.highest_bidder, update.highest_bidder);
    assert_eq!(row.highest_bid, "700");
    assert_eq!(row.bidding_end_time, update.bidding_end_time as i64);
    Ok(())
}

#[test(tokio::test)]
async fn ended_never_reverts() -> anyhow::Result<()> {
    let ctx = ctx().await?;

    let mut ended = upsert_for(1);
    ended.ended = true;
    ended.highest_bidder = Some("0x0000000000000000000000000000000000000abc".into());
    ended.highest_bid = "500".into();
    repo::upsert_auction(&ctx, ended).await?;

    // A read served by a lagging node still reports the auction as running.
    let mut stale = upsert_for(1);
    stale.highest_bid = "400".into();
    let row = repo::upsert_auction(&ctx, stale).await?;

    assert!(row.ended);
    assert_eq!(row.highest_bid, "500");
    assert_eq!(
        row.highest_bidder.as_deref(),
        Some("0x0000000000000000000000000000000000000abc")
    );
    Ok(())
}

#[test(tokio::test)]
async fn metadata_is_kept_when_lookup_fails() -> anyhow::Result<()> {
    let ctx = ctx().await?;
    let metadata = ItemMetadata {
        title: "Vintage Lamp".into(),
        image: Some("ipfs://lamp.png".into()),
    };
    repo::upsert_auction(
        &ctx,
        AuctionUpsert::from_chain(chain_auction(2), Some("bafy-lamp".into()), Some(metadata)),
    )
    .await?;

    let row = repo::upsert_auction(
        &ctx,
        AuctionUpsert::from_chain(chain_auction(2), Some("bafy-lamp".into()), None),
    )
    .await?;
    assert_eq!(row.title.as_deref(), Some("Vintage Lamp"));
    assert_eq!(row.image.as_deref(), Some("ipfs://lamp.png"));

    // A different identifier invalidates what was stored for the old one.
    let row = repo::upsert_auction(
        &ctx,
        AuctionUpsert::from_chain(chain_auction(2), Some("bafy-other".into()), None),
    )
    .await?;
    assert_eq!(row.title, None);
    Ok(())
}

#[test(tokio::test)]
async fn duplicate_events_and_bids_are_ignored() -> anyhow::Result<()> {
    let ctx = ctx().await?;
    repo::upsert_auction(&ctx, upsert_for(0)).await?;
    let event = bid_placed(0, short_address(0xdef), 700, 12, 3);

    assert!(repo::insert_event(&ctx, NewEvent::try_from(&event)?).await?);
    assert!(!repo::insert_event(&ctx, NewEvent::try_from(&event)?).await?);
    assert!(repo::insert_bid(&ctx, new_bid(&event)).await?);
    assert!(!repo::insert_bid(&ctx, new_bid(&event)).await?);

    assert_eq!(repo::count_events(&ctx, None).await?, 1);
    assert_eq!(repo::count_bids(&ctx, 0).await?, 1);
    Ok(())
}

#[test(tokio::test)]
async fn lists_newest_first_with_bid_counts() -> anyhow::Result<()> {
    let ctx = ctx().await?;
    for id in 0..4 {
        repo::upsert_auction(&ctx, upsert_for(id)).await?;
    }
    for (i, amount) in [150u64, 170, 190].into_iter().enumerate() {
        let event = bid_placed(2, short_address(0xb0 + i as u64), amount, 20 + i as u64, 0);
        repo::insert_bid(&ctx, new_bid(&event)).await?;
    }

    let page = repo::list_auctions(&ctx, 2, 1).await?;
    let ids: Vec<i64> = page.iter().map(|(row, _)| row.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(page[0].1, 3);
    assert_eq!(page[1].1, 0);

    let (_, bids) = repo::get_auction_with_bids(&ctx, 2, 2)
        .await?
        .expect("auction 2 exists");
    let amounts: Vec<&str> = bids.iter().map(|b| b.amount.as_str()).collect();
    assert_eq!(amounts, vec!["190", "170"]);
    Ok(())
}

#[test(tokio::test)]
async fn chain_cursor_round_trip() -> anyhow::Result<()> {
    let ctx = ctx().await?;
    let key = "0x00000000000000000000000000000000000a0c71";

    assert!(repo::get_chain_cursor(&ctx, key).await?.is_none());
    repo::upsert_chain_cursor(&ctx, key, 10).await?;
    repo::upsert_chain_cursor(&ctx, key, 42).await?;

    let cursor = repo::get_chain_cursor(&ctx, key).await?.expect("cursor");
    assert_eq!(cursor.last_block_number, 42);
    Ok(())
}

#[test(tokio::test)]
async fn analytics_counts_events_and_bids() -> anyhow::Result<()> {
    let service = test_service().await?;
    let ctx = service.persist_ctx();
    for id in 0..2 {
        repo::upsert_auction(ctx, upsert_for(id)).await?;
    }
    for (i, event) in [
        bid_placed(0, short_address(0xa1), 150, 5, 0),
        bid_placed(0, short_address(0xa2), 170, 6, 0),
        bid_placed(1, short_address(0xa3), 200, 7, 0),
    ]
    .iter()
    .enumerate()
    {
        assert!(repo::insert_event(ctx, NewEvent::try_from(event)?).await?, "event {i}");
        repo::insert_bid(ctx, new_bid(event)).await?;
    }

    let analytics = service.analytics().await?;
    assert_eq!(analytics.total_auctions, 2);
    assert_eq!(analytics.total_bids, 3);
    assert_eq!(analytics.event_counts.get("BidPlaced"), Some(&3));
    assert!((analytics.average_bids_per_auction - 1.5).abs() < f64::EPSILON);
    Ok(())
}
