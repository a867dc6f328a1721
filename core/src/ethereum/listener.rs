use crate::{
    ethereum::{
        client::{AuctionChainApi, EventStream},
        event_handler::{EthereumEventHandler, StreamState},
    },
};
use futures_util::StreamExt;
use log::{error, info, warn};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

pub struct EthereumListener {
    chain: Arc<dyn AuctionChainApi>,
    handler: Arc<dyn EthereumEventHandler>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl EthereumListener {
    pub fn new(chain: Arc<dyn AuctionChainApi>, handler: Arc<dyn EthereumEventHandler>) -> Self {
        Self {
            chain,
            handler,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Runs forever in a spawned task, resubscribing with exponential backoff.
    pub fn run(self) -> JoinHandle<()> {
        tokio::spawn(self.listen_loop())
    }

    async fn listen_loop(self) {
        let mut delay = self.initial_backoff;

        loop {
            if let Err(e) = self.handler.catch_up().await {
                warn!("Catch-up scan before subscribing failed: {e}");
            }

            match self.chain.subscribe_events().await {
                Ok(stream) => {
                    info!("Listening for auction events");
                    self.handler
                        .stream_state_changed(StreamState::Subscribed)
                        .await;
                    delay = self.initial_backoff;

                    let processed = Self::process_events(&self.handler, stream).await;
                    warn!("Event stream ended after {processed} event(s)");
                }
                Err(err) => {
                    error!("Failed to subscribe to auction events: {err}");
                }
            }

            self.handler.stream_state_changed(StreamState::Lost).await;
            warn!("Restarting listener in {delay:?}...");
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.max_backoff);
        }
    }

    /// Drains a stream until it ends. Bad items and handler failures are
    /// logged and skipped.
    pub async fn process_events(
        handler: &Arc<dyn EthereumEventHandler>,
        mut stream: EventStream,
    ) -> usize {
        let mut processed = 0;
        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    warn!("Dropping undecodable log: {e}");
                    crate::metrics::record_event_failure();
                    continue;
                }
            };

            let kind = event.kind;
            let auction_id = event.auction_id;
            if let Err(e) = handler.handle_event(event).await {
                error!("Event handler error for {kind} on auction {auction_id}: {e}");
                crate::metrics::record_event_failure();
                continue;
            }
            processed += 1;
        }
        processed
    }
}
