//! Scryfall API client for card identity, printings and reference prices
//!
//! Uses async reqwest. Every endpoint is resolved against a base URL so the
//! client can be pointed at a mock server in tests.

use crate::error::{CatalogError, CatalogResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Production Scryfall API
pub const SCRYFALL_API_URL: &str = "https://api.scryfall.com";

const USER_AGENT: &str = "SnipeWatch/1.0";

/// Scryfall card response
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScryfallCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub released_at: Option<String>,
    #[serde(default)]
    pub prices: ScryfallPrices,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub scryfall_uri: Option<String>,
}

/// Scryfall prices are decimal strings, `null` when unknown
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScryfallPrices {
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
    pub usd_etched: Option<String>,
    pub eur: Option<String>,
    pub eur_foil: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl ScryfallCard {
    /// Get the primary image URL (normal size)
    pub fn image_url(&self) -> Option<&str> {
        if let Some(ref uris) = self.image_uris {
            return uris.normal.as_deref();
        }
        // For double-faced cards, get front face image
        self.card_faces
            .as_ref()
            .and_then(|faces| faces.first())
            .and_then(|face| face.image_uris.as_ref())
            .and_then(|uris| uris.normal.as_deref())
    }

    /// Reference market price in USD, falling back to the foil price
    pub fn reference_price(&self) -> Option<f64> {
        [&self.prices.usd, &self.prices.usd_foil]
            .into_iter()
            .flatten()
            .filter_map(|price| price.parse::<f64>().ok())
            .find(|price| *price > 0.0)
    }
}

/// Scryfall API error response
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ScryfallError {
    status: u16,
    code: String,
    details: String,
}

/// Paginated card list (`object: "list"`)
#[derive(Debug, Deserialize)]
struct CardList {
    #[serde(default)]
    data: Vec<ScryfallCard>,
}

/// Plain string catalog (`object: "catalog"`)
#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    data: Vec<String>,
}

/// Async Scryfall client
#[derive(Debug, Clone)]
pub struct ScryfallClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ScryfallClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScryfallClient {
    /// Client for the public Scryfall API
    pub fn new() -> Self {
        Self::with_base_url(SCRYFALL_API_URL)
    }

    /// Client for an alternative base URL (mock servers in tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Full-text card search. No matches yields an empty list, not an error.
    pub async fn search(&self, query: &str) -> CatalogResult<Vec<ScryfallCard>> {
        let url = format!(
            "{}/cards/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        self.fetch_list(&url).await
    }

    /// Fetch a card by name (fuzzy match)
    pub async fn named(&self, name: &str) -> CatalogResult<ScryfallCard> {
        let url = format!(
            "{}/cards/named?fuzzy={}",
            self.base_url,
            urlencoding::encode(name)
        );
        self.get_json(&url).await
    }

    /// Fetch one exact printing by set code and collector number
    pub async fn card(&self, set_code: &str, collector_number: &str) -> CatalogResult<ScryfallCard> {
        let url = format!(
            "{}/cards/{}/{}",
            self.base_url,
            set_code.to_lowercase(),
            urlencoding::encode(collector_number)
        );
        self.get_json(&url).await
    }

    /// All printings of a card, oldest first
    pub async fn printings(&self, name: &str) -> CatalogResult<Vec<ScryfallCard>> {
        let exact = format!("!\"{}\"", name.trim());
        let url = format!(
            "{}/cards/search?q={}&unique=prints&order=released&dir=asc",
            self.base_url,
            urlencoding::encode(&exact)
        );
        self.fetch_list(&url).await
    }

    /// Card name suggestions for a search box
    pub async fn autocomplete(&self, prefix: &str) -> CatalogResult<Vec<String>> {
        // Scryfall answers an empty catalog below two characters anyway
        if prefix.trim().chars().count() < 2 {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/cards/autocomplete?q={}",
            self.base_url,
            urlencoding::encode(prefix.trim())
        );
        let catalog: Catalog = self.get_json(&url).await?;
        Ok(catalog.data)
    }

    async fn fetch_list(&self, url: &str) -> CatalogResult<Vec<ScryfallCard>> {
        match self.get_json::<CardList>(url).await {
            Ok(list) => Ok(list.data),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CatalogResult<T> {
        log::debug!("Fetching from Scryfall: {}", url);

        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        match serde_json::from_str::<ScryfallError>(&body) {
            Ok(error) => Err(CatalogError::Api {
                code: error.code,
                details: error.details,
            }),
            Err(_) => Err(CatalogError::HttpStatus(status)),
        }
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
