//! Domain types: watch items, listings, notification history, subscriptions

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a watch matches one printing or any printing of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "specific", alias = "specific print", alias = "specific_print")]
    SpecificPrint,
    #[default]
    #[serde(rename = "any", alias = "any print", alias = "any_print")]
    AnyPrint,
}

/// A user's request to be alerted about a card at or below a target price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchItem {
    pub id: String,
    pub card_name: String,
    pub target_price: f64,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WatchItem {
    /// Marketplace query: the card name, narrowed by set and number for a specific print
    pub fn search_query(&self) -> String {
        let mut parts = vec![self.card_name.as_str()];
        if self.scope == Scope::SpecificPrint {
            parts.extend(self.set_name.as_deref());
            parts.extend(self.collector_number.as_deref());
        }
        parts.join(" ")
    }
}

/// Watch item creation request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchItem {
    pub card_name: String,
    pub target_price: f64,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
}

impl NewWatchItem {
    /// Check the watch item invariants without consuming the request
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.card_name.trim().is_empty() {
            return Err(ValidationError::EmptyCardName);
        }
        if !self.target_price.is_finite() || self.target_price <= 0.0 {
            return Err(ValidationError::InvalidTargetPrice(self.target_price));
        }
        if self.scope == Scope::SpecificPrint
            && (non_blank(&self.set_name).is_none() || non_blank(&self.collector_number).is_none())
        {
            return Err(ValidationError::MissingPrintDetails);
        }
        Ok(())
    }

    /// Validate and turn the request into a stored watch item with a fresh id
    pub fn into_watch_item(self, now: DateTime<Utc>) -> Result<WatchItem, ValidationError> {
        self.validate()?;
        let (set_name, collector_number) = match self.scope {
            Scope::SpecificPrint => (non_blank(&self.set_name), non_blank(&self.collector_number)),
            Scope::AnyPrint => (None, None),
        };
        Ok(WatchItem {
            id: uuid::Uuid::new_v4().to_string(),
            card_name: self.card_name.trim().to_string(),
            target_price: self.target_price,
            scope: self.scope,
            set_name,
            collector_number,
            created_at: now,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A fixed-price marketplace listing; fetched per pass, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub external_id: String,
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Last listing a watch item notified about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub watch_item_id: String,
    pub last_notified_listing_id: String,
    pub last_notified_at: DateTime<Utc>,
}

/// Notification records keyed by watch item id
pub type NotificationHistory = BTreeMap<String, NotificationRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A registered push destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    pub created_at: DateTime<Utc>,
}

/// Browser `PushSubscription.toJSON()` shape
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl SubscriptionRequest {
    pub fn into_subscription(self, now: DateTime<Utc>) -> Result<Subscription, ValidationError> {
        let endpoint = self.endpoint.trim().to_string();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ValidationError::InvalidEndpoint(endpoint));
        }
        if self.keys.p256dh.trim().is_empty() || self.keys.auth.trim().is_empty() {
            return Err(ValidationError::MissingSubscriptionKeys);
        }
        Ok(Subscription {
            endpoint,
            keys: self.keys,
            created_at: now,
        })
    }
}

/// Message shown by the service worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl PushPayload {
    /// Alert for a listing that met a watch item's target
    pub fn for_match(item: &WatchItem, listing: &Listing) -> Self {
        Self {
            title: format!(
                "{} for {}",
                item.card_name,
                format_price(listing.price, &listing.currency)
            ),
            body: format!(
                "{} (target {})",
                listing.title,
                format_price(item.target_price, &listing.currency)
            ),
            url: listing.url.clone(),
        }
    }
}

/// "$4.50" for USD, "4.50 EUR" otherwise
pub fn format_price(price: f64, currency: &str) -> String {
    match currency {
        "" | "USD" => format!("${:.2}", price),
        other => format!("{:.2} {}", price, other),
    }
}

/// Result of one reconciliation pass, returned to the trigger caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub checked: usize,
    pub notified: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}
