use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use log::info;
use serde::Serialize;

use crate::{
    config::{ContractVariant, EthereumConfig},
    error::ChainClientError,
    ethereum::contract::{AuctionManager, SimpleAuctionHouse},
    util::u256_to_u64,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

impl From<&TransactionReceipt> for TxOutcome {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: format!("{:#x}", receipt.transaction_hash),
            block_number: receipt.block_number,
        }
    }
}

/// Arguments of `createAuction`. Times are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuction {
    pub auction_type: u8,
    pub start_time: u64,
    pub bidding_end_time: u64,
    pub reveal_end_time: u64,
    pub reserve_price: U256,
    pub min_increment: U256,
    pub buy_it_now_price: U256,
    pub anti_sniping_window: u64,
    pub anti_sniping_extension: u64,
}

/// Token escrowed by an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionNft {
    pub nft_address: Address,
    pub token_id: U256,
    pub token_amount: U256,
    pub is_erc1155: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutchPricing {
    pub start_price: U256,
    pub end_price: U256,
    pub decrement_per_second: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAuction {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    /// Taken from the receipt's `AuctionCreated` log.
    pub auction_id: Option<u64>,
}

/// Write side of the auction contract, signed with the server-held key.
/// Every call waits for the receipt and is never retried.
#[async_trait]
pub trait AuctionTxApi: Send + Sync {
    async fn place_bid(&self, id: u64, value: U256) -> Result<TxOutcome, ChainClientError>;

    async fn commit_bid(&self, id: u64, commitment: B256) -> Result<TxOutcome, ChainClientError>;

    async fn reveal_bid(
        &self,
        id: u64,
        amount: U256,
        secret: B256,
    ) -> Result<TxOutcome, ChainClientError>;

    async fn end_auction(&self, id: u64) -> Result<TxOutcome, ChainClientError>;

    async fn accept_dutch(&self, id: u64) -> Result<TxOutcome, ChainClientError>;

    async fn withdraw(&self, id: u64) -> Result<TxOutcome, ChainClientError>;

    async fn create_auction(&self, auction: NewAuction) -> Result<CreatedAuction, ChainClientError>;

    async fn set_auction_nft(&self, id: u64, nft: AuctionNft) -> Result<TxOutcome, ChainClientError>;

    async fn set_auction_metadata(
        &self,
        id: u64,
        ipfs_cid: String,
        require_verification: bool,
    ) -> Result<TxOutcome, ChainClientError>;

    async fn set_dutch_pricing(
        &self,
        id: u64,
        pricing: DutchPricing,
    ) -> Result<TxOutcome, ChainClientError>;

    async fn verify_identity(&self, v: u8, r: B256, s: B256) -> Result<TxOutcome, ChainClientError>;
}

pub struct AlloyAuctionWriter {
    provider: DynProvider,
    address: Address,
    variant: ContractVariant,
}

impl AlloyAuctionWriter {
    /// `Ok(None)` when no private key is configured.
    pub async fn from_config(config: &EthereumConfig) -> Result<Option<Self>, ChainClientError> {
        let Some(key) = config
            .private_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        else {
            return Ok(None);
        };

        let signer: PrivateKeySigner = key.parse()?;
        let signer_address = signer.address();
        let address = config
            .contract_address()
            .map_err(|e| ChainClientError::InvalidAddress(e.to_string()))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect(config.rpc_url.trim())
            .await?
            .erased();

        info!("Write proxy enabled, signing as {signer_address:#x}");
        Ok(Some(Self {
            provider,
            address,
            variant: config.contract_variant,
        }))
    }

    fn simple(&self) -> SimpleAuctionHouse::SimpleAuctionHouseInstance<DynProvider> {
        SimpleAuctionHouse::new(self.address, self.provider.clone())
    }

    fn manager(&self) -> AuctionManager::AuctionManagerInstance<DynProvider> {
        AuctionManager::new(self.address, self.provider.clone())
    }

    fn require_advanced(&self, op: &'static str) -> Result<(), ChainClientError> {
        match self.variant {
            ContractVariant::Advanced => Ok(()),
            ContractVariant::Simple => Err(ChainClientError::ContractCall(format!(
                "{op} is not supported by the simple auction contract"
            ))),
        }
    }
}

fn confirmed(op: &str, receipt: TransactionReceipt) -> Result<TxOutcome, ChainClientError> {
    if !receipt.status() {
        return Err(ChainClientError::PendingTxFailure(format!(
            "{op} reverted in tx {:#x}",
            receipt.transaction_hash
        )));
    }
    info!("{op} confirmed in tx {:#x}", receipt.transaction_hash);
    Ok(TxOutcome::from(&receipt))
}

fn created_auction_id(contract: Address, receipt: &TransactionReceipt) -> Option<u64> {
    receipt
        .inner
        .logs()
        .iter()
        .filter(|log| log.address() == contract)
        .find_map(|log| log.log_decode::<AuctionManager::AuctionCreated>().ok())
        .and_then(|log| u256_to_u64(log.data().auctionId))
}

#[async_trait]
impl AuctionTxApi for AlloyAuctionWriter {
    async fn place_bid(&self, id: u64, value: U256) -> Result<TxOutcome, ChainClientError> {
        let auction_id = U256::from(id);
        let receipt = match self.variant {
            ContractVariant::Simple => {
                self.simple()
                    .bid(auction_id)
                    .value(value)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
            ContractVariant::Advanced => {
                self.manager()
                    .bid(auction_id)
                    .value(value)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
        };
        confirmed("bid", receipt)
    }

    async fn commit_bid(&self, id: u64, commitment: B256) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("commitBid")?;
        let receipt = self
            .manager()
            .commitBid(U256::from(id), commitment)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("commitBid", receipt)
    }

    async fn reveal_bid(
        &self,
        id: u64,
        amount: U256,
        secret: B256,
    ) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("revealBid")?;
        let receipt = self
            .manager()
            .revealBid(U256::from(id), amount, secret)
            .value(amount)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("revealBid", receipt)
    }

    async fn end_auction(&self, id: u64) -> Result<TxOutcome, ChainClientError> {
        let auction_id = U256::from(id);
        let receipt = match self.variant {
            ContractVariant::Simple => {
                self.simple()
                    .endAuction(auction_id)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
            ContractVariant::Advanced => {
                self.manager()
                    .endAuction(auction_id)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
        };
        confirmed("endAuction", receipt)
    }

    async fn accept_dutch(&self, id: u64) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("acceptDutch")?;
        let contract = self.manager();
        let auction_id = U256::from(id);
        let price = contract.getCurrentDutchPrice(auction_id).call().await?;
        let receipt = contract
            .acceptDutch(auction_id)
            .value(price)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("acceptDutch", receipt)
    }

    async fn withdraw(&self, id: u64) -> Result<TxOutcome, ChainClientError> {
        let auction_id = U256::from(id);
        let receipt = match self.variant {
            ContractVariant::Simple => {
                self.simple()
                    .withdraw(auction_id)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
            ContractVariant::Advanced => {
                self.manager()
                    .withdraw(auction_id)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
        };
        confirmed("withdraw", receipt)
    }

    async fn create_auction(&self, auction: NewAuction) -> Result<CreatedAuction, ChainClientError> {
        self.require_advanced("createAuction")?;
        let receipt = self
            .manager()
            .createAuction(
                auction.auction_type,
                U256::from(auction.start_time),
                U256::from(auction.bidding_end_time),
                U256::from(auction.reveal_end_time),
                auction.reserve_price,
                auction.min_increment,
                auction.buy_it_now_price,
                U256::from(auction.anti_sniping_window),
                U256::from(auction.anti_sniping_extension),
            )
            .send()
            .await?
            .get_receipt()
            .await?;
        let auction_id = created_auction_id(self.address, &receipt);
        let outcome = confirmed("createAuction", receipt)?;
        Ok(CreatedAuction {
            tx_hash: outcome.tx_hash,
            block_number: outcome.block_number,
            auction_id,
        })
    }

    async fn set_auction_nft(&self, id: u64, nft: AuctionNft) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("setAuctionNFT")?;
        let receipt = self
            .manager()
            .setAuctionNFT(
                U256::from(id),
                nft.nft_address,
                nft.token_id,
                nft.token_amount,
                nft.is_erc1155,
            )
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("setAuctionNFT", receipt)
    }

    async fn set_auction_metadata(
        &self,
        id: u64,
        ipfs_cid: String,
        require_verification: bool,
    ) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("setAuctionMetadata")?;
        let receipt = self
            .manager()
            .setAuctionMetadata(U256::from(id), ipfs_cid, require_verification)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("setAuctionMetadata", receipt)
    }

    async fn set_dutch_pricing(
        &self,
        id: u64,
        pricing: DutchPricing,
    ) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("setDutchPricing")?;
        let receipt = self
            .manager()
            .setDutchPricing(
                U256::from(id),
                pricing.start_price,
                pricing.end_price,
                pricing.decrement_per_second,
            )
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("setDutchPricing", receipt)
    }

    async fn verify_identity(&self, v: u8, r: B256, s: B256) -> Result<TxOutcome, ChainClientError> {
        self.require_advanced("verifyIdentity")?;
        let receipt = self
            .manager()
            .verifyIdentity(v, r, s)
            .send()
            .await?
            .get_receipt()
            .await?;
        confirmed("verifyIdentity", receipt)
    }
}
