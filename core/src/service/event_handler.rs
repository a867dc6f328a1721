use crate::{
    error::{BlockchainListenerError, PersistDbError},
    ethereum::{ContractEvent, EthereumEventHandler, StreamState},
    metrics::record_event,
    persist::repo::{self, NewBid, NewEvent},
    service::{IndexerService, IndexerState},
};
use async_trait::async_trait;
use entities::auction;
use log::{debug, info};

/// True when a sync produced a row that differs from `prev` in anything but
/// `updated_at`.
fn row_changed(prev: Option<&auction::Model>, row: &auction::Model) -> bool {
    match prev {
        None => true,
        Some(prev) => {
            let mut prev = prev.clone();
            prev.updated_at = row.updated_at;
            prev != *row
        }
    }
}

#[async_trait]
impl EthereumEventHandler for IndexerService {
    /// Record the event (and the bid it implies), then re-read the auction
    /// from chain and push the fresh snapshot. The payload is never used to
    /// patch auction state directly.
    ///
    /// A redelivered event still triggers the re-read, so a delivery whose
    /// read failed is repaired by the next one. It is only broadcast again
    /// when that read changed the stored row.
    async fn handle_event(&self, event: ContractEvent) -> Result<(), BlockchainListenerError> {
        let name = event.kind.name();
        let auction_id = event.auction_id;
        info!(
            "{name} for auction {auction_id} (block {}, tx {}, log {})",
            event.meta.block_number, event.meta.tx_hash, event.meta.log_index
        );

        let recorded = repo::insert_event(self.persist_ctx(), NewEvent::try_from(&event)?).await?;
        let prev = if recorded {
            record_event(name);
            None
        } else {
            debug!(
                "{name} at {}:{} already recorded, re-reading auction {auction_id}",
                event.meta.tx_hash, event.meta.log_index
            );
            repo::get_auction(self.persist_ctx(), auction_id).await?
        };

        if let Some(bid) = event.implied_bid() {
            repo::insert_bid(
                self.persist_ctx(),
                NewBid {
                    auction_id,
                    bidder: bid.bidder,
                    amount: bid.amount,
                    block_number: event.meta.block_number,
                    tx_hash: event.meta.tx_hash.clone(),
                    log_index: event.meta.log_index,
                },
            )
            .await?;
        }

        let chain = self.chain().ok_or_else(|| {
            BlockchainListenerError::EventHandlerError("chain client not attached".to_string())
        })?;
        let row = self.sync_auction(chain.as_ref(), auction_id).await?;
        if !recorded && !row_changed(prev.as_ref(), &row) {
            return Ok(());
        }

        let snapshot = self.auction_snapshot(row).await?;
        let data = serde_json::to_value(&snapshot).map_err(PersistDbError::from)?;
        self.hub().broadcast(name, Some(auction_id), data);

        Ok(())
    }

    async fn catch_up(&self) -> Result<(), BlockchainListenerError> {
        IndexerService::catch_up(self).await.map(|_| ())
    }

    async fn stream_state_changed(&self, state: StreamState) {
        match state {
            StreamState::Subscribed => self.set_state(IndexerState::Live),
            StreamState::Lost => self.set_state(IndexerState::Degraded),
        }
    }
}
