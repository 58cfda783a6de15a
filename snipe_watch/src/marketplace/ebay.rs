//! eBay Browse API client
//!
//! Client-credentials OAuth for an application token, then item summary
//! search restricted to fixed-price CCG singles.

use super::{Marketplace, TokenCache};
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::models::Listing;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

/// Production eBay API
pub const EBAY_API_URL: &str = "https://api.ebay.com";

/// Browse API page size ceiling we allow callers to request
pub const MAX_SEARCH_LIMIT: usize = 50;

const OAUTH_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Collectible Card Games > CCG Individual Cards
const CCG_SINGLES_CATEGORY: &str = "183454";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct EbayConfig {
    pub client_id: String,
    pub client_secret: String,
    /// e.g. `EBAY_US`
    pub marketplace_id: String,
    pub base_url: String,
}

impl EbayConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            marketplace_id: "EBAY_US".to_string(),
            base_url: EBAY_API_URL.to_string(),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

pub struct EbayClient {
    client: reqwest::Client,
    config: EbayConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    item_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    price: Option<Amount>,
    #[serde(default)]
    item_web_url: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    image: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    value: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    image_url: Option<String>,
}

impl ItemSummary {
    /// Listings without a usable price or link are dropped
    fn into_listing(self) -> Option<Listing> {
        let amount = self.price?;
        let price = amount.value.parse::<f64>().ok().filter(|p| p.is_finite() && *p > 0.0)?;
        let url = self.item_web_url?;
        Some(Listing {
            external_id: self.item_id,
            title: self.title,
            price,
            currency: amount.currency,
            url,
            condition: self.condition,
            image_url: self.image.and_then(|i| i.image_url),
        })
    }
}

impl EbayClient {
    pub fn new(config: EbayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client,
            config: EbayConfig { base_url, ..config },
        }
    }

    async fn exchange_token(&self) -> MarketplaceResult<TokenResponse> {
        if !self.config.has_credentials() {
            return Err(MarketplaceError::Auth(
                "eBay client credentials are not configured".to_string(),
            ));
        }

        let url = format!("{}/identity/v1/oauth2/token", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", OAUTH_SCOPE)])
            .send()
            .await
            .map_err(|e| MarketplaceError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::Auth(format!(
                "token exchange returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| MarketplaceError::Auth(format!("malformed token response: {}", e)))
    }
}

#[async_trait]
impl Marketplace for EbayClient {
    async fn authenticate(&self, cache: &mut TokenCache) -> MarketplaceResult<String> {
        let now = Utc::now();
        if let Some(token) = cache.valid_token(now) {
            return Ok(token.to_string());
        }

        match self.exchange_token().await {
            Ok(token) => {
                log::info!("Obtained eBay access token (expires in {}s)", token.expires_in);
                Ok(cache.store(token.access_token, token.expires_in, now).to_string())
            }
            Err(e) => {
                cache.clear();
                Err(e)
            }
        }
    }

    async fn search(&self, token: &str, query: &str, limit: usize) -> MarketplaceResult<Vec<Listing>> {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT).to_string();
        let url = format!("{}/buy/browse/v1/item_summary/search", self.config.base_url);

        log::debug!("Searching eBay for {:?} (limit {})", query, limit);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.config.marketplace_id)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("sort", "price"),
                ("filter", "buyingOptions:{FIXED_PRICE}"),
                ("category_ids", CCG_SINGLES_CATEGORY),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketplaceError::Auth("access token rejected".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::HttpStatus { status, body });
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;

        let mut listings: Vec<Listing> = parsed
            .item_summaries
            .into_iter()
            .filter_map(ItemSummary::into_listing)
            .collect();
        // Stable sort keeps eBay's order among equal prices
        listings.sort_by(|a, b| a.price.total_cmp(&b.price));

        log::debug!("eBay returned {} usable listings for {:?}", listings.len(), query);
        Ok(listings)
    }
}

#[cfg(test)]
#[path = "ebay_tests.rs"]
mod tests;
