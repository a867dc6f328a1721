use alloy::signers::local::LocalSignerError;
use anyhow::anyhow;
use sea_orm::TransactionError as SeaTransactionError;
use thiserror::Error;

// ---------- SeaORM transaction error conversions ----------

impl From<SeaTransactionError<PersistDbError>> for PersistDbError {
    fn from(err: SeaTransactionError<PersistDbError>) -> Self {
        match err {
            SeaTransactionError::Connection(db_err) => PersistDbError::DatabaseFailure(db_err),
            SeaTransactionError::Transaction(inner) => inner,
        }
    }
}

// ---------- Domain/Layer error types ----------

#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("RPC transport failure: {0}")]
    TransportFailure(#[from] alloy::transports::TransportError),

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Failed to decode ABI response: {0}")]
    AbiError(#[from] alloy::sol_types::Error),

    #[error("Private key error: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("Pending transaction failed: {0}")]
    PendingTxFailure(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Unexpected chain client error: {0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum BlockchainListenerError {
    #[error("Failed to decode blockchain logs: {0}")]
    DecodingFailure(#[from] alloy::sol_types::Error),

    #[error("Log is missing {0}")]
    IncompleteLog(&'static str),

    #[error(transparent)]
    Db(#[from] PersistDbError),

    #[error(transparent)]
    Chain(#[from] ChainClientError),

    #[error("Event handler error: {0}")]
    EventHandlerError(String),

    #[error("Unexpected error: {0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PersistDbError {
    #[error("Database operation failed: {0}")]
    DatabaseFailure(#[from] sea_orm::DbErr),

    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Value out of range for column {column}: {value}")]
    OutOfRange { column: &'static str, value: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("chain read failed: {0}")]
    Chain(ChainClientError),

    #[error("database error: {0}")]
    Db(PersistDbError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<PersistDbError> for ServiceError {
    fn from(e: PersistDbError) -> Self {
        match e {
            PersistDbError::InvariantViolation(msg) => ServiceError::Other(anyhow!(msg)),
            other => ServiceError::Db(other),
        }
    }
}

impl From<ChainClientError> for ServiceError {
    fn from(e: ChainClientError) -> Self {
        ServiceError::Chain(e)
    }
}

impl From<BlockchainListenerError> for ServiceError {
    fn from(e: BlockchainListenerError) -> Self {
        match e {
            BlockchainListenerError::Db(db) => db.into(),
            BlockchainListenerError::Chain(chain) => ServiceError::Chain(chain),
            other => ServiceError::Other(anyhow!(other)),
        }
    }
}

// ---------- `From` conversions for alloy signer and contract calls ----------

impl From<LocalSignerError> for ChainClientError {
    fn from(e: LocalSignerError) -> Self {
        ChainClientError::InvalidPrivateKey(e.to_string())
    }
}

impl From<alloy::contract::Error> for ChainClientError {
    fn from(e: alloy::contract::Error) -> Self {
        ChainClientError::ContractCall(e.to_string())
    }
}

impl From<alloy::providers::PendingTransactionError> for ChainClientError {
    fn from(e: alloy::providers::PendingTransactionError) -> Self {
        ChainClientError::PendingTxFailure(e.to_string())
    }
}
