use crate::{
    broadcast::connected_frame,
    error::ServiceError,
    ethereum::{CreatedAuction, TxOutcome},
    model::{AnalyticsInfo, AuctionDetail, AuctionInfo, EventInfo, Page},
    service::{
        IndexerService,
        health::HealthReport,
        proxy::{CreateAuctionInput, NftInput},
    },
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_util::{Stream, StreamExt, future, stream};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, de::DeserializeOwned};
use std::convert::Infallible;

pub fn router(service: IndexerService, metrics: Option<PrometheusHandle>) -> Router {
    let api = Router::new()
        .route("/health", get(get_health))
        .route("/auctions", get(list_auctions))
        .route("/auctions/{id}", get(get_auction))
        .route("/auctions/{id}/refresh", post(refresh_auction))
        .route("/auctions/{id}/events", get(list_auction_events))
        .route("/events", get(list_events))
        .route("/analytics", get(get_analytics))
        .route("/sse", get(sse))
        .route("/bid/{id}", post(post_bid))
        .route("/commit/{id}", post(post_commit))
        .route("/reveal/{id}", post(post_reveal))
        .route("/end/{id}", post(post_end))
        .route("/accept-dutch/{id}", post(post_accept_dutch))
        .route("/withdraw/{id}", post(post_withdraw))
        .route("/create-auction", post(post_create_auction))
        .route("/set-nft/{id}", post(post_set_nft))
        .route("/set-meta/{id}", post(post_set_meta))
        .route("/verify", post(post_verify));

    let mut app = Router::new().nest("/api", api);
    if let Some(handle) = metrics {
        app = app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }
    app.with_state(service)
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidParams(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            ServiceError::NotFound(msg) => ApiError::new(StatusCode::NOT_FOUND, msg),
            ServiceError::Unavailable(msg) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, msg),
            ServiceError::TransactionFailed(msg) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ServiceError::Chain(e) => {
                log::warn!("chain read failed: {e}");
                ApiError::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
            ServiceError::Db(e) => {
                log::error!("database error: {e}");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            ServiceError::Other(e) => {
                log::error!("internal error: {e:#}");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

fn parse_id(value: &str) -> Result<u64, ApiError> {
    value.trim().parse::<u64>().map_err(|_| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("invalid auction id {value}"),
        )
    })
}

/// An empty body is treated as `{}` so that missing fields are reported by
/// name instead of as a content-type rejection.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}")))
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    limit: Option<u64>,
    offset: Option<u64>,
}

/// Amounts and hex strings may arrive as JSON strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

fn text(value: Option<Scalar>) -> String {
    value.map(Scalar::into_text).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BidRequest {
    bid_eth: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
struct CommitRequest {
    commitment: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevealRequest {
    amount_eth: Option<Scalar>,
    secret_hex: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftRequest {
    nft_address: Option<Scalar>,
    token_id: Option<Scalar>,
    token_amount: Option<Scalar>,
    #[serde(rename = "isERC1155")]
    is_erc1155: Option<bool>,
}

impl NftRequest {
    fn into_input(self) -> NftInput {
        NftInput {
            nft_address: text(self.nft_address),
            token_id: text(self.token_id),
            token_amount: text(self.token_amount),
            is_erc1155: self.is_erc1155.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuctionRequest {
    auction_type: Option<Scalar>,
    duration_sec: Option<Scalar>,
    reserve_price_wei: Option<Scalar>,
    min_increment_wei: Option<Scalar>,
    buy_it_now_wei: Option<Scalar>,
    anti_sniping_window_sec: Option<Scalar>,
    anti_sniping_extension_sec: Option<Scalar>,
    reveal_duration_sec: Option<Scalar>,
    #[serde(flatten)]
    nft: NftRequest,
    ipfs_cid: Option<Scalar>,
    require_verification: Option<bool>,
    dutch_start_price_wei: Option<Scalar>,
    dutch_end_price_wei: Option<Scalar>,
    dutch_decrement_per_sec_wei: Option<Scalar>,
}

impl CreateAuctionRequest {
    fn into_input(self) -> CreateAuctionInput {
        CreateAuctionInput {
            auction_type: text(self.auction_type),
            duration_sec: text(self.duration_sec),
            reserve_price_wei: text(self.reserve_price_wei),
            min_increment_wei: text(self.min_increment_wei),
            buy_it_now_wei: text(self.buy_it_now_wei),
            anti_sniping_window_sec: text(self.anti_sniping_window_sec),
            anti_sniping_extension_sec: text(self.anti_sniping_extension_sec),
            reveal_duration_sec: text(self.reveal_duration_sec),
            nft: self.nft.into_input(),
            ipfs_cid: text(self.ipfs_cid),
            require_verification: self.require_verification.unwrap_or_default(),
            dutch_start_price_wei: text(self.dutch_start_price_wei),
            dutch_end_price_wei: text(self.dutch_end_price_wei),
            dutch_decrement_per_sec_wei: text(self.dutch_decrement_per_sec_wei),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataRequest {
    ipfs_cid: Option<Scalar>,
    require_verification: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyRequest {
    v: Option<Scalar>,
    r: Option<Scalar>,
    s: Option<Scalar>,
}

async fn get_health(State(service): State<IndexerService>) -> (StatusCode, Json<HealthReport>) {
    let report = service.run_health_checks().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn list_auctions(
    State(service): State<IndexerService>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<AuctionInfo>>, ApiError> {
    let page = service.list_auctions(params.limit, params.offset).await?;
    Ok(Json(page))
}

async fn get_auction(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
) -> Result<Json<AuctionDetail>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get_auction(id).await?))
}

async fn refresh_auction(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
) -> Result<Json<AuctionInfo>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(service.refresh_auction(id).await?))
}

async fn list_auction_events(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<EventInfo>>, ApiError> {
    let id = parse_id(&id)?;
    let page = service
        .list_events(params.limit, params.offset, Some(id))
        .await?;
    Ok(Json(page))
}

async fn list_events(
    State(service): State<IndexerService>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<EventInfo>>, ApiError> {
    let page = service.list_events(params.limit, params.offset, None).await?;
    Ok(Json(page))
}

async fn get_analytics(
    State(service): State<IndexerService>,
) -> Result<Json<AnalyticsInfo>, ApiError> {
    Ok(Json(service.analytics().await?))
}

/// The subscription is registered before the `connected` frame goes out and
/// unregistered when the client goes away and the stream is dropped.
async fn sse(
    State(service): State<IndexerService>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = service.hub().subscribe();
    let frames = stream::once(future::ready(connected_frame())).chain(subscription.into_stream());
    Sse::new(frames.map(|frame| Ok(Event::default().data(frame.as_ref()))))
        .keep_alive(KeepAlive::default())
}

async fn post_bid(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let req: BidRequest = parse_body(&body)?;
    Ok(Json(service.place_bid(id, &text(req.bid_eth)).await?))
}

async fn post_commit(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let req: CommitRequest = parse_body(&body)?;
    Ok(Json(service.commit_bid(id, &text(req.commitment)).await?))
}

async fn post_reveal(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let req: RevealRequest = parse_body(&body)?;
    let outcome = service
        .reveal_bid(id, &text(req.amount_eth), &text(req.secret_hex))
        .await?;
    Ok(Json(outcome))
}

async fn post_end(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(service.end_auction(id).await?))
}

async fn post_accept_dutch(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(service.accept_dutch(id).await?))
}

async fn post_withdraw(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(service.withdraw(id).await?))
}

async fn post_create_auction(
    State(service): State<IndexerService>,
    body: Bytes,
) -> Result<Json<CreatedAuction>, ApiError> {
    let req: CreateAuctionRequest = parse_body(&body)?;
    Ok(Json(service.create_auction(&req.into_input()).await?))
}

async fn post_set_nft(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let req: NftRequest = parse_body(&body)?;
    Ok(Json(service.set_auction_nft(id, &req.into_input()).await?))
}

async fn post_set_meta(
    State(service): State<IndexerService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TxOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let req: MetadataRequest = parse_body(&body)?;
    let outcome = service
        .set_auction_metadata(
            id,
            &text(req.ipfs_cid),
            req.require_verification.unwrap_or_default(),
        )
        .await?;
    Ok(Json(outcome))
}

async fn post_verify(
    State(service): State<IndexerService>,
    body: Bytes,
) -> Result<Json<TxOutcome>, ApiError> {
    let req: VerifyRequest = parse_body(&body)?;
    let outcome = service
        .verify_identity(&text(req.v), &text(req.r), &text(req.s))
        .await?;
    Ok(Json(outcome))
}
