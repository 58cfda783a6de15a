//! Durable state: watchlist, subscriptions and notification history
//!
//! Each piece of state is one JSON document. Backends only move documents in
//! and out; (de)serialization lives in the provided trait methods so both
//! backends persist byte-identical layouts.

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::error::{StoreError, StoreResult};
use crate::models::{NotificationHistory, Subscription, WatchItem};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The persisted documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Watchlist,
    Subscriptions,
    History,
}

impl Document {
    pub fn key(self) -> &'static str {
        match self {
            Document::Watchlist => "watchlist",
            Document::Subscriptions => "subscriptions",
            Document::History => "notifications",
        }
    }
}

/// Storage backend for the JSON documents
pub trait StateStore: Send + Sync {
    /// Raw document, `None` when it was never written
    fn read(&self, document: Document) -> StoreResult<Option<String>>;

    /// Replace a document
    fn write(&self, document: Document, json: &str) -> StoreResult<()>;

    fn load_watchlist(&self) -> StoreResult<Vec<WatchItem>> {
        load_document(self, Document::Watchlist)
    }

    fn save_watchlist(&self, items: &[WatchItem]) -> StoreResult<()> {
        save_document(self, Document::Watchlist, items)
    }

    fn load_subscriptions(&self) -> StoreResult<Vec<Subscription>> {
        load_document(self, Document::Subscriptions)
    }

    fn save_subscriptions(&self, subscriptions: &[Subscription]) -> StoreResult<()> {
        save_document(self, Document::Subscriptions, subscriptions)
    }

    fn load_history(&self) -> StoreResult<NotificationHistory> {
        load_document(self, Document::History)
    }

    fn save_history(&self, history: &NotificationHistory) -> StoreResult<()> {
        save_document(self, Document::History, history)
    }
}

fn load_document<S, T>(store: &S, document: Document) -> StoreResult<T>
where
    S: StateStore + ?Sized,
    T: DeserializeOwned + Default,
{
    match store.read(document)? {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).map_err(|source| StoreError::Parse {
                document: document.key(),
                source,
            })
        }
        _ => Ok(T::default()),
    }
}

fn save_document<S, T>(store: &S, document: Document, value: &T) -> StoreResult<()>
where
    S: StateStore + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Parse {
        document: document.key(),
        source,
    })?;
    store.write(document, &json)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
