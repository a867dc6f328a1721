use crate::{
    config::ContractVariant,
    error::{BlockchainListenerError, ChainClientError},
    ethereum::{
        client::AuctionChainApi,
        event_data::{AuctionEventKind, ContractEvent},
        event_handler::EthereumEventHandler,
    },
    persist::{PersistCtx, repo},
};
use log::{error, info, warn};
use std::{collections::VecDeque, sync::Arc};

/// Log queries failing back to back before a range is treated as a provider
/// outage rather than a bad block.
const MAX_CONSECUTIVE_LOG_FAILURES: usize = 8;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub from_block: u64,
    pub to_block: u64,
    pub events: usize,
    pub failed_events: usize,
    /// Single blocks whose logs could not be fetched for some event type.
    pub skipped_blocks: usize,
    /// Set when the pass ended early; the next scan starts at this block.
    pub stopped_at: Option<u64>,
}

/// Replays logs between the persisted cursor and the chain head through an
/// event handler, one bounded block range at a time.
pub struct EventScanner {
    chain: Arc<dyn AuctionChainApi>,
    persist_ctx: PersistCtx,
    cursor_key: String,
    variant: ContractVariant,
    range_blocks: u64,
}

impl EventScanner {
    pub fn new(
        chain: Arc<dyn AuctionChainApi>,
        persist_ctx: PersistCtx,
        cursor_key: impl Into<String>,
        variant: ContractVariant,
        range_blocks: u64,
    ) -> Self {
        Self {
            chain,
            persist_ctx,
            cursor_key: cursor_key.into(),
            variant,
            range_blocks: range_blocks.max(1),
        }
    }

    /// Sets the cursor only when none exists yet.
    pub async fn initialize_cursor(&self, block_number: u64) -> Result<bool, BlockchainListenerError> {
        if repo::get_chain_cursor(&self.persist_ctx, &self.cursor_key)
            .await?
            .is_some()
        {
            return Ok(false);
        }
        repo::upsert_chain_cursor(&self.persist_ctx, &self.cursor_key, block_number).await?;
        info!("Initialised chain cursor at block {block_number}");
        Ok(true)
    }

    pub async fn scan(
        &self,
        handler: &dyn EthereumEventHandler,
    ) -> Result<ScanReport, BlockchainListenerError> {
        let head = self.chain.block_number().await?;

        let Some(cursor) = repo::get_chain_cursor(&self.persist_ctx, &self.cursor_key).await? else {
            self.initialize_cursor(head).await?;
            return Ok(ScanReport {
                from_block: head,
                to_block: head,
                ..Default::default()
            });
        };

        let start = u64::try_from(cursor.last_block_number)
            .unwrap_or_default()
            .saturating_add(1);
        let mut report = ScanReport {
            from_block: start,
            to_block: head,
            ..Default::default()
        };
        if start > head {
            return Ok(report);
        }

        info!("Catching up auction events from block {start} to {head}");
        let mut from = start;
        'ranges: while from <= head {
            let to = from.saturating_add(self.range_blocks - 1).min(head);

            let mut events = Vec::new();
            let mut range_skipped = 0;
            for &kind in AuctionEventKind::for_variant(self.variant) {
                match self.fetch_kind(kind, from, to).await {
                    Ok((fetched, skipped)) => {
                        events.extend(fetched);
                        range_skipped += skipped;
                    }
                    Err(e) => {
                        warn!("{kind} logs {from}..={to} keep failing ({e}); retrying next scan");
                        report.stopped_at = Some(from);
                        break 'ranges;
                    }
                }
            }
            report.skipped_blocks += range_skipped;
            events.sort_by_key(|e| (e.meta.block_number, e.meta.log_index));

            let mut first_failed = None;
            for event in events {
                let kind = event.kind;
                let auction_id = event.auction_id;
                let block = event.meta.block_number;
                match handler.handle_event(event).await {
                    Ok(()) => report.events += 1,
                    Err(e) => {
                        error!("Replay of {kind} for auction {auction_id} failed: {e}");
                        crate::metrics::record_event_failure();
                        report.failed_events += 1;
                        first_failed.get_or_insert(block);
                    }
                }
            }

            // The cursor never moves past a failed event, so it is replayed
            // on the next scan.
            if let Some(block) = first_failed {
                let held = block.saturating_sub(1);
                repo::upsert_chain_cursor(&self.persist_ctx, &self.cursor_key, held).await?;
                report.stopped_at = Some(block);
                break;
            }

            repo::upsert_chain_cursor(&self.persist_ctx, &self.cursor_key, to).await?;
            from = to + 1;
        }

        if report.events > 0 || report.skipped_blocks > 0 || report.stopped_at.is_some() {
            info!(
                "Catch-up done: {} event(s) replayed, {} failed, {} block(s) skipped, stopped at {:?}",
                report.events, report.failed_events, report.skipped_blocks, report.stopped_at
            );
        }
        Ok(report)
    }

    /// Fetches one event type over a range. A failing range is halved,
    /// breadth first, until a single block still fails, which is then
    /// skipped. When no query succeeds at all, or too many fail back to back,
    /// the range is given up on as a whole and nothing is skipped.
    async fn fetch_kind(
        &self,
        kind: AuctionEventKind,
        from: u64,
        to: u64,
    ) -> Result<(Vec<ContractEvent>, usize), ChainClientError> {
        let mut pending = VecDeque::from([(from, to)]);
        let mut out = Vec::new();
        let mut skipped = 0;
        let mut succeeded = false;
        let mut consecutive_failures = 0;
        let mut last_error = None;

        while let Some((lo, hi)) = pending.pop_front() {
            match self.chain.historical_events(kind, lo, hi).await {
                Ok(events) => {
                    out.extend(events);
                    succeeded = true;
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= MAX_CONSECUTIVE_LOG_FAILURES {
                        return Err(e);
                    }
                    if hi > lo {
                        let mid = lo + (hi - lo) / 2;
                        warn!("{kind} logs {lo}..={hi} failed ({e}); splitting range");
                        pending.push_back((lo, mid));
                        pending.push_back((mid + 1, hi));
                    } else {
                        warn!("Skipping {kind} logs at block {lo}: {e}");
                        skipped += 1;
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !succeeded => Err(e),
            _ => Ok((out, skipped)),
        }
    }
}
