use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Context;
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MetadataConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: String,
    pub image: Option<String>,
}

impl ItemMetadata {
    /// `name`, then `title`, then "Untitled"; `image`, then `image_url`.
    pub fn from_document(doc: &Value) -> Self {
        let text = |key: &str| {
            doc.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        Self {
            title: text("name")
                .or_else(|| text("title"))
                .unwrap_or_else(|| "Untitled".to_string()),
            image: text("image").or_else(|| text("image_url")),
        }
    }
}

/// Resolves content identifiers through an HTTP gateway. Content is
/// immutable per identifier, so successful lookups are cached for the life
/// of the fetcher. Concurrent lookups of one identifier share a single
/// request.
pub struct MetadataFetcher {
    client: reqwest::Client,
    gateway_url: String,
    cache: RwLock<HashMap<String, ItemMetadata>>,
    inflight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MetadataFetcher {
    pub fn new(config: &MetadataConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build metadata HTTP client")?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.trim().trim_end_matches('/').to_string(),
            cache: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        })
    }

    pub fn cached(&self, identifier: &str) -> Option<ItemMetadata> {
        self.cache.read().get(identifier).cloned()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Never fails: any problem fetching or parsing yields `None`, and
    /// failures are not cached so the next call retries.
    pub async fn resolve(&self, identifier: Option<&str>) -> Option<ItemMetadata> {
        let identifier = identifier.map(str::trim).filter(|id| !id.is_empty())?;

        if let Some(hit) = self.cached(identifier) {
            crate::metrics::record_metadata_lookup("hit");
            return Some(hit);
        }

        let turn = self
            .inflight
            .lock()
            .entry(identifier.to_string())
            .or_default()
            .clone();
        let _turn = turn.lock().await;

        // filled by a lookup we waited on
        if let Some(hit) = self.cached(identifier) {
            crate::metrics::record_metadata_lookup("hit");
            return Some(hit);
        }
        crate::metrics::record_metadata_lookup("miss");

        let resolved = match self.fetch(identifier).await {
            Ok(metadata) => {
                info!("Fetched metadata for {identifier}: {}", metadata.title);
                self.cache
                    .write()
                    .insert(identifier.to_string(), metadata.clone());
                Some(metadata)
            }
            Err(e) => {
                warn!("Failed to fetch metadata for {identifier}: {e:#}");
                crate::metrics::record_metadata_lookup("failure");
                None
            }
        };
        self.inflight.lock().remove(identifier);
        resolved
    }

    async fn fetch(&self, identifier: &str) -> anyhow::Result<ItemMetadata> {
        let url = format!("{}/{identifier}", self.gateway_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("gateway returned {status}");
        }

        let doc: Value = response.json().await.context("invalid JSON document")?;
        Ok(ItemMetadata::from_document(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_and_image_fallbacks() {
        let full = ItemMetadata::from_document(&json!({"name": "Vase", "image": "ipfs://img"}));
        assert_eq!(full.title, "Vase");
        assert_eq!(full.image.as_deref(), Some("ipfs://img"));

        let alt = ItemMetadata::from_document(&json!({"title": "Lamp", "image_url": "https://x/y.png"}));
        assert_eq!(alt.title, "Lamp");
        assert_eq!(alt.image.as_deref(), Some("https://x/y.png"));

        let bare = ItemMetadata::from_document(&json!({"name": "", "image": 5}));
        assert_eq!(bare.title, "Untitled");
        assert_eq!(bare.image, None);
    }

    #[tokio::test]
    async fn empty_identifier_skips_io() {
        let fetcher = MetadataFetcher::new(&MetadataConfig {
            // nothing listens here; any request would fail
            gateway_url: "http://127.0.0.1:9".into(),
            timeout_ms: 50,
        })
        .unwrap();

        assert_eq!(fetcher.resolve(None).await, None);
        assert_eq!(fetcher.resolve(Some("  ")).await, None);
        assert_eq!(fetcher.cache_len(), 0);
    }
}
