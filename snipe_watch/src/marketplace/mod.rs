//! Marketplace clients for live fixed-price listings

mod ebay;
mod token;

pub use ebay::{EbayClient, EbayConfig, EBAY_API_URL, MAX_SEARCH_LIMIT};
pub use token::{CachedToken, TokenCache, EXPIRY_MARGIN_SECS};

use crate::error::MarketplaceResult;
use crate::models::Listing;
use async_trait::async_trait;

/// A listing source the reconciliation pass can query
#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Return a usable bearer token, exchanging credentials when the cache is stale.
    /// Clears the cache when the exchange fails.
    async fn authenticate(&self, cache: &mut TokenCache) -> MarketplaceResult<String>;

    /// Up to `limit` fixed-price listings for `query`, cheapest first
    async fn search(&self, token: &str, query: &str, limit: usize) -> MarketplaceResult<Vec<Listing>>;
}
