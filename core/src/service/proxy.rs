use crate::{
    error::{ServiceError, ServiceResult},
    ethereum::{AuctionNft, CreatedAuction, DutchPricing, NewAuction, TxOutcome},
    service::IndexerService,
    util::now_unix,
};
use alloy::primitives::{Address, B256, U256, utils::parse_ether};
use log::{error, info};
use std::str::FromStr;

/// Seconds between the request and the auction's start.
const START_DELAY_SECS: u64 = 5;
const DEFAULT_REVEAL_SECS: u64 = 60;

/// Raw create-auction fields. Empty strings mean "not given".
#[derive(Debug, Default, Clone)]
pub struct CreateAuctionInput {
    pub auction_type: String,
    pub duration_sec: String,
    pub reserve_price_wei: String,
    pub min_increment_wei: String,
    pub buy_it_now_wei: String,
    pub anti_sniping_window_sec: String,
    pub anti_sniping_extension_sec: String,
    pub reveal_duration_sec: String,
    pub nft: NftInput,
    pub ipfs_cid: String,
    pub require_verification: bool,
    pub dutch_start_price_wei: String,
    pub dutch_end_price_wei: String,
    pub dutch_decrement_per_sec_wei: String,
}

#[derive(Debug, Default, Clone)]
pub struct NftInput {
    pub nft_address: String,
    pub token_id: String,
    pub token_amount: String,
    pub is_erc1155: bool,
}

fn parse_eth(raw: &str, field: &str) -> ServiceResult<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::InvalidParams(format!("{field} is required")));
    }
    parse_ether(raw)
        .map_err(|e| ServiceError::InvalidParams(format!("{field} is not a valid ether amount: {e}")))
}

fn parse_bytes32(raw: &str, field: &str) -> ServiceResult<B256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::InvalidParams(format!("{field} is required")));
    }
    B256::from_str(raw)
        .map_err(|e| ServiceError::InvalidParams(format!("{field} must be 32 hex bytes: {e}")))
}

/// Wei amounts as decimal or `0x` hex; empty means `default`.
fn parse_wei(raw: &str, field: &str, default: Option<U256>) -> ServiceResult<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return default.ok_or_else(|| ServiceError::InvalidParams(format!("{field} is required")));
    }
    U256::from_str(raw)
        .map_err(|e| ServiceError::InvalidParams(format!("{field} is not a valid wei amount: {e}")))
}

fn parse_u64(raw: &str, field: &str, default: Option<u64>) -> ServiceResult<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return default.ok_or_else(|| ServiceError::InvalidParams(format!("{field} is required")));
    }
    raw.parse()
        .map_err(|_| ServiceError::InvalidParams(format!("{field} must be a non-negative integer")))
}

fn parse_address(raw: &str, field: &str) -> ServiceResult<Address> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::InvalidParams(format!("{field} is required")));
    }
    Address::from_str(raw)
        .map_err(|e| ServiceError::InvalidParams(format!("{field} is not a valid address: {e}")))
}

impl NftInput {
    fn is_empty(&self) -> bool {
        self.nft_address.trim().is_empty() && self.token_id.trim().is_empty()
    }

    fn parse(&self) -> ServiceResult<AuctionNft> {
        Ok(AuctionNft {
            nft_address: parse_address(&self.nft_address, "nftAddress")?,
            token_id: parse_wei(&self.token_id, "tokenId", None)?,
            token_amount: parse_wei(&self.token_amount, "tokenAmount", Some(U256::ZERO))?,
            is_erc1155: self.is_erc1155,
        })
    }
}

/// Follow-up calls requested alongside `createAuction`.
#[derive(Debug)]
struct CreatePlan {
    auction: NewAuction,
    nft: Option<AuctionNft>,
    metadata: Option<(String, bool)>,
    dutch: Option<DutchPricing>,
}

impl CreateAuctionInput {
    fn plan(&self, now: u64) -> ServiceResult<CreatePlan> {
        let auction_type = match self.auction_type.trim().parse::<u8>() {
            Ok(t @ 0..=3) => t,
            _ => {
                return Err(ServiceError::InvalidParams(
                    "auctionType must be 0..3".into(),
                ));
            }
        };
        let duration = parse_u64(&self.duration_sec, "durationSec", None)?;
        if duration == 0 {
            return Err(ServiceError::InvalidParams("durationSec must be positive".into()));
        }

        let start_time = now + START_DELAY_SECS;
        let bidding_end_time = start_time.saturating_add(duration);
        let reveal_end_time = if matches!(auction_type, 1 | 3) {
            let reveal = parse_u64(&self.reveal_duration_sec, "revealDurationSec", Some(0))?;
            let reveal = if reveal == 0 { DEFAULT_REVEAL_SECS } else { reveal };
            bidding_end_time.saturating_add(reveal)
        } else {
            0
        };

        let auction = NewAuction {
            auction_type,
            start_time,
            bidding_end_time,
            reveal_end_time,
            reserve_price: parse_wei(&self.reserve_price_wei, "reservePriceWei", Some(U256::ZERO))?,
            min_increment: parse_wei(&self.min_increment_wei, "minIncrementWei", Some(U256::ZERO))?,
            buy_it_now_price: parse_wei(&self.buy_it_now_wei, "buyItNowWei", Some(U256::ZERO))?,
            anti_sniping_window: parse_u64(
                &self.anti_sniping_window_sec,
                "antiSnipingWindowSec",
                Some(0),
            )?,
            anti_sniping_extension: parse_u64(
                &self.anti_sniping_extension_sec,
                "antiSnipingExtensionSec",
                Some(0),
            )?,
        };

        let nft = if self.nft.is_empty() {
            None
        } else {
            Some(self.nft.parse()?)
        };

        let cid = self.ipfs_cid.trim();
        let metadata = (!cid.is_empty() || self.require_verification)
            .then(|| (cid.to_string(), self.require_verification));

        let dutch_fields = [
            self.dutch_start_price_wei.trim(),
            self.dutch_end_price_wei.trim(),
            self.dutch_decrement_per_sec_wei.trim(),
        ];
        let dutch = if auction_type == 2 && dutch_fields.iter().all(|f| !f.is_empty()) {
            Some(DutchPricing {
                start_price: parse_wei(dutch_fields[0], "dutchStartPriceWei", None)?,
                end_price: parse_wei(dutch_fields[1], "dutchEndPriceWei", None)?,
                decrement_per_second: parse_wei(dutch_fields[2], "dutchDecrementPerSecWei", None)?,
            })
        } else {
            None
        };

        Ok(CreatePlan {
            auction,
            nft,
            metadata,
            dutch,
        })
    }
}

fn tx_failed(op: &str, id: u64, e: impl std::fmt::Display) -> ServiceError {
    error!("{op} on auction {id} failed: {e}");
    ServiceError::TransactionFailed(e.to_string())
}

fn tx_failed_op(op: &str, e: impl std::fmt::Display) -> ServiceError {
    error!("{op} failed: {e}");
    ServiceError::TransactionFailed(e.to_string())
}

/// Server-signed transactions. Each waits for its receipt; nothing is retried.
impl IndexerService {
    pub async fn place_bid(&self, id: u64, bid_eth: &str) -> ServiceResult<TxOutcome> {
        let value = parse_eth(bid_eth, "bidEth")?;
        let api = self.require_tx_api()?;
        info!("Proxying bid of {value} wei on auction {id}");
        api.place_bid(id, value)
            .await
            .map_err(|e| tx_failed("bid", id, e))
    }

    pub async fn commit_bid(&self, id: u64, commitment: &str) -> ServiceResult<TxOutcome> {
        let commitment = parse_bytes32(commitment, "commitment")?;
        let api = self.require_tx_api()?;
        api.commit_bid(id, commitment)
            .await
            .map_err(|e| tx_failed("commitBid", id, e))
    }

    pub async fn reveal_bid(
        &self,
        id: u64,
        amount_eth: &str,
        secret_hex: &str,
    ) -> ServiceResult<TxOutcome> {
        let amount = parse_eth(amount_eth, "amountEth")?;
        let secret = parse_bytes32(secret_hex, "secretHex")?;
        let api = self.require_tx_api()?;
        api.reveal_bid(id, amount, secret)
            .await
            .map_err(|e| tx_failed("revealBid", id, e))
    }

    pub async fn end_auction(&self, id: u64) -> ServiceResult<TxOutcome> {
        let api = self.require_tx_api()?;
        api.end_auction(id)
            .await
            .map_err(|e| tx_failed("endAuction", id, e))
    }

    pub async fn accept_dutch(&self, id: u64) -> ServiceResult<TxOutcome> {
        let api = self.require_tx_api()?;
        api.accept_dutch(id)
            .await
            .map_err(|e| tx_failed("acceptDutch", id, e))
    }

    pub async fn withdraw(&self, id: u64) -> ServiceResult<TxOutcome> {
        let api = self.require_tx_api()?;
        api.withdraw(id)
            .await
            .map_err(|e| tx_failed("withdraw", id, e))
    }

    /// Creates an auction, then attaches the token, metadata and Dutch
    /// pricing when given. Each step waits for its receipt; a failed step
    /// leaves the earlier ones in place.
    pub async fn create_auction(&self, input: &CreateAuctionInput) -> ServiceResult<CreatedAuction> {
        let plan = input.plan(now_unix())?;
        let api = self.require_tx_api()?;
        info!(
            "Proxying createAuction of type {} ending at {}",
            plan.auction.auction_type, plan.auction.bidding_end_time
        );
        let created = api
            .create_auction(plan.auction)
            .await
            .map_err(|e| tx_failed_op("createAuction", e))?;

        let follow_ups = plan.nft.is_some() || plan.metadata.is_some() || plan.dutch.is_some();
        if !follow_ups {
            return Ok(created);
        }
        let Some(id) = created.auction_id else {
            error!("createAuction tx {} carried no AuctionCreated log", created.tx_hash);
            return Err(ServiceError::TransactionFailed(format!(
                "auction created in tx {} but its id could not be read from the receipt",
                created.tx_hash
            )));
        };

        if let Some(nft) = plan.nft {
            api.set_auction_nft(id, nft)
                .await
                .map_err(|e| tx_failed("setAuctionNFT", id, e))?;
        }
        if let Some((cid, require_verification)) = plan.metadata {
            api.set_auction_metadata(id, cid, require_verification)
                .await
                .map_err(|e| tx_failed("setAuctionMetadata", id, e))?;
        }
        if let Some(pricing) = plan.dutch {
            api.set_dutch_pricing(id, pricing)
                .await
                .map_err(|e| tx_failed("setDutchPricing", id, e))?;
        }
        Ok(created)
    }

    pub async fn set_auction_nft(&self, id: u64, nft: &NftInput) -> ServiceResult<TxOutcome> {
        let nft = nft.parse()?;
        let api = self.require_tx_api()?;
        api.set_auction_nft(id, nft)
            .await
            .map_err(|e| tx_failed("setAuctionNFT", id, e))
    }

    pub async fn set_auction_metadata(
        &self,
        id: u64,
        ipfs_cid: &str,
        require_verification: bool,
    ) -> ServiceResult<TxOutcome> {
        let api = self.require_tx_api()?;
        api.set_auction_metadata(id, ipfs_cid.trim().to_string(), require_verification)
            .await
            .map_err(|e| tx_failed("setAuctionMetadata", id, e))
    }

    /// Submits an off-chain signature `(v, r, s)` marking the signer as
    /// verified on chain.
    pub async fn verify_identity(&self, v: &str, r: &str, s: &str) -> ServiceResult<TxOutcome> {
        let v = v
            .trim()
            .parse::<u8>()
            .map_err(|_| ServiceError::InvalidParams("v, r and s are required".into()))?;
        let r = parse_bytes32(r, "r")?;
        let s = parse_bytes32(s, "s")?;
        let api = self.require_tx_api()?;
        api.verify_identity(v, r, s)
            .await
            .map_err(|e| tx_failed_op("verifyIdentity", e))
    }
}
