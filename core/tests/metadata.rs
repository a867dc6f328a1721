use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use indexer_service::{config::MetadataConfig, metadata::MetadataFetcher};
use serde_json::json;
use test_log::test;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Gateway {
    hits: Arc<AtomicUsize>,
}

async fn serve_document(State(gateway): State<Gateway>, Path(cid): Path<String>) -> Response {
    gateway.hits.fetch_add(1, Ordering::SeqCst);
    match cid.as_str() {
        "bafy-lamp" => Json(json!({ "name": "Vintage Lamp", "image": "ipfs://lamp.png" }))
            .into_response(),
        "bafy-titled" => Json(json!({ "title": "Old Map", "image_url": "https://x/map.png" }))
            .into_response(),
        "bafy-vase" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Json(json!({ "name": "Blue Vase" })).into_response()
        }
        "bafy-garbage" => (StatusCode::OK, "not json at all").into_response(),
        "bafy-slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "name": "Too Late" })).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_gateway() -> anyhow::Result<(Gateway, String)> {
    let gateway = Gateway::default();
    let app = Router::new()
        .route("/ipfs/{cid}", get(serve_document))
        .with_state(gateway.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((gateway, format!("http://{addr}/ipfs/")))
}

fn fetcher(gateway_url: &str) -> anyhow::Result<MetadataFetcher> {
    MetadataFetcher::new(&MetadataConfig {
        gateway_url: gateway_url.into(),
        timeout_ms: 300,
    })
}

#[test(tokio::test)]
async fn concurrent_lookups_share_one_request() -> anyhow::Result<()> {
    let (gateway, url) = spawn_gateway().await?;
    let fetcher = fetcher(&url)?;

    let (a, b, c) = tokio::join!(
        fetcher.resolve(Some("bafy-vase")),
        fetcher.resolve(Some("bafy-vase")),
        fetcher.resolve(Some("bafy-vase")),
    );

    assert_eq!(a.expect("metadata").title, "Blue Vase");
    assert_eq!(b, c);
    assert!(b.is_some());
    assert_eq!(gateway.hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test(tokio::test)]
async fn resolves_and_caches_documents() -> anyhow::Result<()> {
    let (gateway, url) = spawn_gateway().await?;
    let fetcher = fetcher(&url)?;

    let first = fetcher.resolve(Some("bafy-lamp")).await.expect("metadata");
    assert_eq!(first.title, "Vintage Lamp");
    assert_eq!(first.image.as_deref(), Some("ipfs://lamp.png"));

    let second = fetcher.resolve(Some(" bafy-lamp ")).await.expect("metadata");
    assert_eq!(second, first);
    assert_eq!(gateway.hits.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.cache_len(), 1);

    let titled = fetcher.resolve(Some("bafy-titled")).await.expect("metadata");
    assert_eq!(titled.title, "Old Map");
    assert_eq!(titled.image.as_deref(), Some("https://x/map.png"));
    Ok(())
}

#[test(tokio::test)]
async fn failures_yield_none_and_are_not_cached() -> anyhow::Result<()> {
    let (gateway, url) = spawn_gateway().await?;
    let fetcher = fetcher(&url)?;

    assert!(fetcher.resolve(Some("bafy-missing")).await.is_none());
    assert!(fetcher.resolve(Some("bafy-missing")).await.is_none());
    assert_eq!(gateway.hits.load(Ordering::SeqCst), 2);

    assert!(fetcher.resolve(Some("bafy-garbage")).await.is_none());
    assert!(fetcher.resolve(None).await.is_none());
    assert!(fetcher.resolve(Some("   ")).await.is_none());
    assert_eq!(fetcher.cache_len(), 0);
    Ok(())
}

#[test(tokio::test)]
async fn slow_gateway_times_out() -> anyhow::Result<()> {
    let (_gateway, url) = spawn_gateway().await?;
    let fetcher = fetcher(&url)?;

    let started = std::time::Instant::now();
    assert!(fetcher.resolve(Some("bafy-slow")).await.is_none());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(fetcher.cached("bafy-slow").is_none());
    Ok(())
}
