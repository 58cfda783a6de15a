//! Snipe Watch - MTG marketplace watcher
//!
//! Keeps a watchlist of wanted cards with target prices, checks live eBay
//! fixed-price listings against it and sends Web Push alerts when a listing
//! at or below target shows up.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod models;
pub mod push;
pub mod reconcile;
pub mod snipes;
pub mod store;
pub mod watchlist;
pub mod web;

pub use error::{Error, Result};
pub use models::{CheckSummary, Listing, NotificationRecord, Scope, Subscription, WatchItem};
pub use reconcile::{run_check, run_pass, MatchPolicy, ReconcileOptions};
