//! Watchlist and subscription management on top of a [`StateStore`]

use crate::error::{Result, StoreResult};
use crate::models::{NewWatchItem, Subscription, SubscriptionRequest, WatchItem};
use crate::store::StateStore;
use chrono::{DateTime, Utc};

/// Validate and persist a new watch item
pub fn add_watch_item(store: &dyn StateStore, request: NewWatchItem, now: DateTime<Utc>) -> Result<WatchItem> {
    let item = request.into_watch_item(now)?;
    let mut items = store.load_watchlist()?;
    items.push(item.clone());
    store.save_watchlist(&items)?;
    log::info!(
        "Watching {} at {:.2} ({:?}, id {})",
        item.card_name,
        item.target_price,
        item.scope,
        item.id
    );
    Ok(item)
}

/// All watch items, newest first
pub fn list_watch_items(store: &dyn StateStore) -> StoreResult<Vec<WatchItem>> {
    let mut items = store.load_watchlist()?;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

/// Remove a watch item and its notification record. Returns false for unknown ids.
pub fn remove_watch_item(store: &dyn StateStore, id: &str) -> StoreResult<bool> {
    let mut items = store.load_watchlist()?;
    let before = items.len();
    items.retain(|item| item.id != id);
    if items.len() == before {
        return Ok(false);
    }
    store.save_watchlist(&items)?;

    let mut history = store.load_history()?;
    if history.remove(id).is_some() {
        store.save_history(&history)?;
    }
    log::info!("Removed watch item {}", id);
    Ok(true)
}

/// Register a push destination, replacing any previous record for the same endpoint
pub fn upsert_subscription(
    store: &dyn StateStore,
    request: SubscriptionRequest,
    now: DateTime<Utc>,
) -> Result<Subscription> {
    let subscription = request.into_subscription(now)?;
    let mut subscriptions = store.load_subscriptions()?;
    match subscriptions
        .iter_mut()
        .find(|existing| existing.endpoint == subscription.endpoint)
    {
        Some(existing) => *existing = subscription.clone(),
        None => subscriptions.push(subscription.clone()),
    }
    store.save_subscriptions(&subscriptions)?;
    log::info!("Registered push subscription ({} total)", subscriptions.len());
    Ok(subscription)
}

/// Unregister an endpoint. Returns false when it was not registered.
pub fn remove_subscription(store: &dyn StateStore, endpoint: &str) -> StoreResult<bool> {
    Ok(prune_subscriptions(store, &[endpoint.to_string()])? > 0)
}

/// Drop every subscription whose endpoint is listed; returns how many were removed
pub fn prune_subscriptions(store: &dyn StateStore, endpoints: &[String]) -> StoreResult<usize> {
    if endpoints.is_empty() {
        return Ok(0);
    }
    let mut subscriptions = store.load_subscriptions()?;
    let before = subscriptions.len();
    subscriptions.retain(|s| !endpoints.contains(&s.endpoint));
    let removed = before - subscriptions.len();
    if removed > 0 {
        store.save_subscriptions(&subscriptions)?;
        log::info!("Removed {} push subscription(s)", removed);
    }
    Ok(removed)
}
