//! Network collaborators: fetching query font bytes and listing the families
//! the offline catalog builder processes.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use font_core::{BuilderConfig, FontCategory, FontError, FontResult};

const USER_AGENT: &str = concat!("font-alternatives/", env!("CARGO_PKG_VERSION"));

/// Supplies raw font bytes for a URL.
#[async_trait]
pub trait FontFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FontResult<Vec<u8>>;
}

/// One family offered by a [`CatalogSource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub family: String,
    pub category: FontCategory,
    /// Representative font file (regular style when available)
    pub file_url: String,
}

/// A listing of free families plus a way to download their files.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &str;
    async fn list_families(&self) -> FontResult<Vec<CatalogEntry>>;
    async fn download(&self, url: &str) -> FontResult<Vec<u8>>;
}

fn build_client(timeout: Duration) -> FontResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| FontError::Network(format!("failed to build HTTP client: {}", e)))
}

async fn get_bytes(client: &Client, url: &str) -> FontResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| FontError::Network(format!("GET {}: {}", url, e)))?;
    let body = response
        .bytes()
        .await
        .map_err(|e| FontError::Network(format!("reading {}: {}", url, e)))?;
    debug!(url, bytes = body.len(), "downloaded");
    Ok(body.to_vec())
}

/// Plain HTTP(S) byte fetcher
pub struct HttpFontFetcher {
    client: Client,
}

impl HttpFontFetcher {
    pub fn new(timeout: Duration) -> FontResult<Self> {
        Ok(Self { client: build_client(timeout)? })
    }
}

#[async_trait]
impl FontFetcher for HttpFontFetcher {
    async fn fetch(&self, url: &str) -> FontResult<Vec<u8>> {
        get_bytes(&self.client, url).await
    }
}

/// Google Fonts developer API listing
pub struct GoogleFontsProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GoogleFontsProvider {
    pub fn new(config: &BuilderConfig) -> FontResult<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(config.request_timeout_secs))?,
            endpoint: config.listing_endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn listing_url(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}?key={}&sort=popularity", self.endpoint, key),
            None => format!("{}?sort=popularity", self.endpoint),
        }
    }

    /// Turn the API's `items` array into catalog entries.
    ///
    /// Items without a family or any file are dropped; unknown categories
    /// are treated as sans-serif.
    pub fn parse_listing(json: &Value) -> FontResult<Vec<CatalogEntry>> {
        let items = json["items"]
            .as_array()
            .ok_or_else(|| FontError::Parse("No items in Google Fonts response".to_string()))?;

        Ok(items.iter().filter_map(Self::parse_item).collect())
    }

    fn parse_item(item: &Value) -> Option<CatalogEntry> {
        let family = item["family"].as_str()?.trim();
        if family.is_empty() {
            return None;
        }
        let category = item["category"]
            .as_str()
            .and_then(FontCategory::parse)
            .unwrap_or(FontCategory::SansSerif);

        let files = item["files"].as_object()?;
        let file_url = files
            .get("regular")
            .or_else(|| files.values().next())?
            .as_str()?;

        Some(CatalogEntry {
            family: family.to_string(),
            category,
            file_url: file_url.replacen("http://", "https://", 1),
        })
    }
}

#[async_trait]
impl CatalogSource for GoogleFontsProvider {
    fn name(&self) -> &str {
        "Google Fonts"
    }

    async fn list_families(&self) -> FontResult<Vec<CatalogEntry>> {
        let response = self
            .client
            .get(self.listing_url())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FontError::Network(format!("Google Fonts API error: {}", e)))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| FontError::Parse(format!("JSON parse error: {}", e)))?;

        Self::parse_listing(&json)
    }

    async fn download(&self, url: &str) -> FontResult<Vec<u8>> {
        get_bytes(&self.client, url).await
    }
}
