//! Reconciliation pass
//!
//! Checks every watch item against current marketplace listings and notifies
//! once per distinct qualifying listing. All mutable state (token cache,
//! notification history) is passed in by the caller and handed back; the pass
//! itself never touches the store.
//!
//! Failure handling:
//! - no usable marketplace token before the loop starts: the pass aborts, nothing is sent
//! - token exchange fails mid-pass: the pass stops, work done so far is returned
//!   inside the error
//! - token rejected by a search: the cache is cleared and the item retried once
//!   with a fresh token
//! - search failure or timeout for one item: recorded in `errors`, next item continues
//! - failed push to one subscription: recorded, the other subscriptions still get it

use crate::error::{MarketplaceError, ReconcileError};
use crate::marketplace::{Marketplace, TokenCache};
use crate::models::{
    CheckSummary, Listing, NotificationHistory, NotificationRecord, PushPayload, Subscription, WatchItem,
};
use crate::push::{fan_out, PushSender};
use crate::store::StateStore;
use crate::watchlist::prune_subscriptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When a listing price counts as a match for a target price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// price <= target
    #[default]
    AtOrBelow,
    /// price < target
    StrictlyBelow,
}

impl MatchPolicy {
    pub fn qualifies(self, price: f64, target: f64) -> bool {
        match self {
            MatchPolicy::AtOrBelow => price <= target,
            MatchPolicy::StrictlyBelow => price < target,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Listings requested per watch item
    pub listing_limit: usize,
    pub match_policy: MatchPolicy,
    /// Budget for one item's marketplace lookup
    pub item_timeout: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            listing_limit: 15,
            match_policy: MatchPolicy::AtOrBelow,
            item_timeout: Duration::from_secs(20),
        }
    }
}

/// Read-only inputs plus the history the pass will update
#[derive(Debug, Clone)]
pub struct PassInput<'a> {
    pub watchlist: &'a [WatchItem],
    pub subscriptions: &'a [Subscription],
    pub history: NotificationHistory,
}

#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub summary: CheckSummary,
    /// Updated history; the caller persists it in one write
    pub history: NotificationHistory,
    /// Subscriptions the push service reported as expired
    pub gone_endpoints: Vec<String>,
}

/// Decision for a single watch item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDecision {
    NoListings,
    AboveTarget { cheapest: f64 },
    AlreadyNotified { listing_id: String },
    Notify(Listing),
}

/// Cheapest listing; the first one wins a tie
pub fn cheapest(listings: &[Listing]) -> Option<&Listing> {
    listings.iter().min_by(|a, b| a.price.total_cmp(&b.price))
}

pub fn decide(
    item: &WatchItem,
    listings: &[Listing],
    history: &NotificationHistory,
    policy: MatchPolicy,
) -> ItemDecision {
    let Some(best) = cheapest(listings) else {
        return ItemDecision::NoListings;
    };
    if !policy.qualifies(best.price, item.target_price) {
        return ItemDecision::AboveTarget {
            cheapest: best.price,
        };
    }
    match history.get(&item.id) {
        Some(record) if record.last_notified_listing_id == best.external_id => {
            ItemDecision::AlreadyNotified {
                listing_id: best.external_id.clone(),
            }
        }
        _ => ItemDecision::Notify(best.clone()),
    }
}

/// Run one pass over the watchlist
pub async fn run_pass(
    marketplace: &dyn Marketplace,
    sender: &dyn PushSender,
    token_cache: &mut TokenCache,
    input: PassInput<'_>,
    options: &ReconcileOptions,
    now: DateTime<Utc>,
) -> Result<PassOutcome, ReconcileError> {
    let PassInput {
        watchlist,
        subscriptions,
        mut history,
    } = input;

    marketplace
        .authenticate(token_cache)
        .await
        .map_err(|source| ReconcileError::Auth {
            source,
            partial: None,
        })?;

    let mut summary = CheckSummary::default();
    let mut gone_endpoints: Vec<String> = Vec::new();

    for item in watchlist {
        summary.checked += 1;

        let listings = match search_item(marketplace, token_cache, item, options).await {
            Ok(listings) => listings,
            Err(LookupFailure::Item(e)) => {
                log::warn!("Check failed for {} ({}): {}", item.card_name, item.id, e);
                summary.errors.push(format!("{}: {}", item.card_name, e));
                continue;
            }
            Err(LookupFailure::Auth(source)) => {
                log::error!(
                    "Lost marketplace access at {} ({} of {} items checked): {}",
                    item.card_name,
                    summary.checked,
                    watchlist.len(),
                    source
                );
                summary.errors.push(format!("{}: {}", item.card_name, source));
                return Err(ReconcileError::Auth {
                    source,
                    partial: Some(Box::new(PassOutcome {
                        summary,
                        history,
                        gone_endpoints,
                    })),
                });
            }
        };

        let listing = match decide(item, &listings, &history, options.match_policy) {
            ItemDecision::Notify(listing) => listing,
            ItemDecision::NoListings => {
                log::debug!("{}: no listings", item.card_name);
                continue;
            }
            ItemDecision::AboveTarget { cheapest } => {
                log::debug!(
                    "{}: cheapest {:.2} above target {:.2}",
                    item.card_name,
                    cheapest,
                    item.target_price
                );
                continue;
            }
            ItemDecision::AlreadyNotified { listing_id } => {
                log::debug!("{}: already notified for listing {}", item.card_name, listing_id);
                continue;
            }
        };

        log::info!(
            "{}: listing {} at {:.2} meets target {:.2}, notifying {} subscription(s)",
            item.card_name,
            listing.external_id,
            listing.price,
            item.target_price,
            subscriptions.len()
        );

        let payload = PushPayload::for_match(item, &listing);
        let report = fan_out(sender, subscriptions, &payload).await;
        summary.errors.extend(
            report
                .failures
                .into_iter()
                .map(|failure| format!("{}: push to {}", item.card_name, failure)),
        );
        for endpoint in report.gone {
            if !gone_endpoints.contains(&endpoint) {
                gone_endpoints.push(endpoint);
            }
        }

        history.insert(
            item.id.clone(),
            NotificationRecord {
                watch_item_id: item.id.clone(),
                last_notified_listing_id: listing.external_id,
                last_notified_at: now,
            },
        );
        summary.notified += 1;
    }

    Ok(PassOutcome {
        summary,
        history,
        gone_endpoints,
    })
}

/// Why one item's lookup failed
enum LookupFailure {
    /// No token could be obtained; fatal to the pass
    Auth(MarketplaceError),
    /// Search error, repeated token rejection or timeout; only this item is skipped
    Item(MarketplaceError),
}

async fn search_item(
    marketplace: &dyn Marketplace,
    token_cache: &mut TokenCache,
    item: &WatchItem,
    options: &ReconcileOptions,
) -> Result<Vec<Listing>, LookupFailure> {
    let query = item.search_query();
    let lookup = async {
        let token = marketplace
            .authenticate(token_cache)
            .await
            .map_err(LookupFailure::Auth)?;
        match marketplace.search(&token, &query, options.listing_limit).await {
            Err(MarketplaceError::Auth(reason)) => {
                log::warn!("Access token rejected ({}), exchanging a new one", reason);
                token_cache.clear();
                let token = marketplace
                    .authenticate(token_cache)
                    .await
                    .map_err(LookupFailure::Auth)?;
                let retry = marketplace.search(&token, &query, options.listing_limit).await;
                if matches!(retry, Err(MarketplaceError::Auth(_))) {
                    token_cache.clear();
                }
                retry.map_err(LookupFailure::Item)
            }
            other => other.map_err(LookupFailure::Item),
        }
    };
    tokio::time::timeout(options.item_timeout, lookup)
        .await
        .unwrap_or(Err(LookupFailure::Item(MarketplaceError::Timeout(
            options.item_timeout,
        ))))
}

/// Load state, run one pass, write the history back and prune expired subscriptions
pub async fn run_check(
    store: &dyn StateStore,
    marketplace: &dyn Marketplace,
    sender: &dyn PushSender,
    token_cache: &mut TokenCache,
    options: &ReconcileOptions,
) -> Result<CheckSummary, ReconcileError> {
    let watchlist = store.load_watchlist()?;
    let subscriptions = store.load_subscriptions()?;
    let history = store.load_history()?;

    log::info!(
        "Starting check: {} watch item(s), {} subscription(s)",
        watchlist.len(),
        subscriptions.len()
    );

    let input = PassInput {
        watchlist: &watchlist,
        subscriptions: &subscriptions,
        history,
    };
    let mut outcome = match run_pass(marketplace, sender, token_cache, input, options, Utc::now()).await {
        Ok(outcome) => outcome,
        Err(ReconcileError::Auth {
            source,
            partial: Some(mut partial),
        }) => {
            // Alerts sent before the abort must stay recorded
            persist_outcome(store, &mut partial)?;
            return Err(ReconcileError::Auth {
                source,
                partial: Some(partial),
            });
        }
        Err(e) => return Err(e),
    };
    persist_outcome(store, &mut outcome)?;

    let summary = outcome.summary;
    log::info!(
        "Check complete: {} checked, {} notified, {} error(s)",
        summary.checked,
        summary.notified,
        summary.errors.len()
    );
    Ok(summary)
}

/// Write back the history and drop expired subscriptions
fn persist_outcome(store: &dyn StateStore, outcome: &mut PassOutcome) -> Result<(), ReconcileError> {
    if outcome.summary.notified > 0 {
        store.save_history(&outcome.history)?;
    }

    if let Err(e) = prune_subscriptions(store, &outcome.gone_endpoints) {
        log::warn!("Failed to prune expired subscriptions: {}", e);
        outcome
            .summary
            .errors
            .push(format!("pruning expired subscriptions: {}", e));
    }
    Ok(())
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
