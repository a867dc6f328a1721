use async_trait::async_trait;

use crate::error::BlockchainListenerError;
use crate::ethereum::event_data::ContractEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Subscribed,
    Lost,
}

#[async_trait]
pub trait EthereumEventHandler: Send + Sync {
    async fn handle_event(&self, event: ContractEvent) -> Result<(), BlockchainListenerError>;

    /// Replays anything missed since the last scanned block. Called before
    /// every (re)subscription.
    async fn catch_up(&self) -> Result<(), BlockchainListenerError> {
        Ok(())
    }

    async fn stream_state_changed(&self, _state: StreamState) {}
}
