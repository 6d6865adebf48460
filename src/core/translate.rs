//! Canonical job output.
//!
//! Vendor result items are mapped one-to-one into [`ImageData`], in order.
//! When embedded encoding is requested each remote asset is fetched and
//! base64-encoded; an item whose fetch fails is logged and dropped instead of
//! failing the whole response.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;

use super::http::get_bytes;
use super::models::{ImageData, ImageResponse, ResponseFormat};
use crate::error::Result;

/// One vendor output item before translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputItem {
    /// Remote reference.
    pub url: String,
    /// Embedded encoding the vendor already supplied, if any.
    pub embedded: Option<String>,
}

/// Materializes a remote asset as base64.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch_base64(&self, url: &str) -> Result<String>;
}

/// Fetches assets over the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch_base64(&self, url: &str) -> Result<String> {
        let bytes = get_bytes(&self.client, url, None).await?;
        Ok(STANDARD.encode(bytes))
    }
}

/// Build the canonical response from vendor items.
pub async fn translate_items(
    items: &[OutputItem],
    format: ResponseFormat,
    created: i64,
    fetcher: &dyn AssetFetcher,
) -> ImageResponse {
    let data = match format {
        ResponseFormat::Url => items
            .iter()
            .map(|item| ImageData {
                url: item.url.clone(),
                b64_json: item.embedded.clone().unwrap_or_default(),
                revised_prompt: String::new(),
            })
            .collect(),
        ResponseFormat::B64Json => {
            let fetches = items.iter().map(|item| fetcher.fetch_base64(&item.url));
            let fetched = futures::future::join_all(fetches).await;

            items
                .iter()
                .zip(fetched)
                .filter_map(|(item, result)| match result {
                    Ok(b64) => Some(ImageData {
                        url: item.url.clone(),
                        b64_json: b64,
                        revised_prompt: String::new(),
                    }),
                    Err(e) => {
                        tracing::error!(url = %item.url, error = %e, "get_image_data_failed");
                        None
                    }
                })
                .collect()
        }
    };

    ImageResponse { created, data }
}
