use crate::{
    config::{DEFAULT_LIST_LIMIT, DEFAULT_RECENT_BIDS, MAX_LIST_LIMIT},
    error::{ServiceError, ServiceResult},
    model::{AnalyticsInfo, AuctionDetail, AuctionInfo, EventInfo, Page},
    persist::{mapper, repo},
    service::IndexerService,
    util::now_unix,
};

/// Absent means the default page size; anything above the maximum is capped.
pub fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

impl IndexerService {
    pub async fn list_auctions(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> ServiceResult<Page<AuctionInfo>> {
        let limit = clamp_limit(limit);
        let offset = offset.unwrap_or_default();
        let now = now_unix();

        let rows = repo::list_auctions(self.persist_ctx(), limit, offset).await?;
        let total = repo::count_auctions(self.persist_ctx()).await?;
        let items = rows
            .into_iter()
            .map(|(row, bid_count)| mapper::auction_model_to_info(row, bid_count, now))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            limit,
            offset,
            total,
        })
    }

    pub async fn get_auction(&self, id: u64) -> ServiceResult<AuctionDetail> {
        let Some((row, bids)) =
            repo::get_auction_with_bids(self.persist_ctx(), id, DEFAULT_RECENT_BIDS).await?
        else {
            return Err(ServiceError::NotFound(format!("auction {id}")));
        };

        let bid_count = repo::count_bids(self.persist_ctx(), id).await?;
        let auction = mapper::auction_model_to_info(row, bid_count, now_unix())?;
        let bids = bids
            .into_iter()
            .map(mapper::bid_model_to_info)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AuctionDetail { auction, bids })
    }

    pub async fn list_events(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        auction_id: Option<u64>,
    ) -> ServiceResult<Page<EventInfo>> {
        let limit = clamp_limit(limit);
        let offset = offset.unwrap_or_default();

        let rows = repo::list_events(self.persist_ctx(), limit, offset, auction_id).await?;
        let total = repo::count_events(self.persist_ctx(), auction_id).await?;
        let items = rows
            .into_iter()
            .map(mapper::event_model_to_info)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            limit,
            offset,
            total,
        })
    }

    pub async fn analytics(&self) -> ServiceResult<AnalyticsInfo> {
        let ctx = self.persist_ctx();
        let total_auctions = repo::count_auctions(ctx).await?;
        let event_counts = repo::event_counts_by_name(ctx)
            .await?
            .into_iter()
            .map(|c| (c.name, u64::try_from(c.count).unwrap_or_default()))
            .collect();
        let total_bids: u64 = repo::bid_counts_per_auction(ctx)
            .await?
            .iter()
            .map(|c| u64::try_from(c.count).unwrap_or_default())
            .sum();

        let average_bids_per_auction = if total_auctions == 0 {
            0.0
        } else {
            total_bids as f64 / total_auctions as f64
        };

        Ok(AnalyticsInfo {
            total_auctions,
            total_bids,
            event_counts,
            average_bids_per_auction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::clamp_limit;

    #[test]
    fn clamps_page_size() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(10_000)), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
    }
}
