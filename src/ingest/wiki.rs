// =============================================================================
// Wiki "latest prices" client
// =============================================================================
//
// GET <price_api_url> returns
//   { "data": { "<item id>": { "high": 190, "highTime": ..., "low": 185, "lowTime": ... } } }
//
// The API asks every client for a descriptive User-Agent; requests without
// one may be blocked.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{FetchError, LatestPrice, PriceSource};
use crate::types::ItemId;

#[derive(Deserialize)]
struct LatestResponse {
    #[serde(default)]
    data: HashMap<String, LatestPrice>,
}

/// Decode a "latest" payload, dropping entries whose key is not a numeric
/// item id.
pub fn parse_latest(body: &str) -> Result<HashMap<ItemId, LatestPrice>, FetchError> {
    let response: LatestResponse = serde_json::from_str(body)?;
    let mut prices = HashMap::with_capacity(response.data.len());
    for (key, price) in response.data {
        match key.parse::<ItemId>() {
            Ok(id) => {
                prices.insert(id, price);
            }
            Err(e) => warn!(key = %key, error = %e, "skipping price entry with non-numeric id"),
        }
    }
    Ok(prices)
}

#[derive(Clone)]
pub struct WikiPriceClient {
    url: String,
    client: reqwest::Client,
}

impl WikiPriceClient {
    pub fn new(url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).context("invalid user agent")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build price feed HTTP client")?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for WikiPriceClient {
    #[instrument(skip(self), name = "wiki::fetch_latest")]
    async fn fetch_latest(&self) -> Result<HashMap<ItemId, LatestPrice>, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let prices = parse_latest(&body)?;
        debug!(items = prices.len(), "latest prices fetched");
        Ok(prices)
    }
}
