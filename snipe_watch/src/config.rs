//! Command-line and environment configuration

use crate::error::{Error, PushError, Result};
use crate::marketplace::{EbayConfig, EBAY_API_URL};
use crate::push::VapidKeys;
use crate::reconcile::{MatchPolicy, ReconcileOptions};
use crate::store::{JsonFileStore, SqliteStore, StateStore};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use mtg_common::scryfall::SCRYFALL_API_URL;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// MTG snipe watcher - watchlist, marketplace price checks and push alerts
#[derive(Parser, Debug)]
#[command(name = "snipe_watch")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding the watchlist, subscriptions and notification history
    #[arg(long, env = "SNIPE_WATCH_DATA_DIR", default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Persistence backend
    #[arg(long, env = "SNIPE_WATCH_STORE", value_enum, default_value_t = StoreBackend::Json)]
    pub store: StoreBackend,

    /// Web UI / API port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Whether a listing exactly at the target price counts as a match
    #[arg(long, env = "MATCH_POLICY", value_enum, default_value_t = MatchPolicy::AtOrBelow)]
    pub match_policy: MatchPolicy,

    /// Listings fetched per watch item (10-20)
    #[arg(
        long,
        env = "LISTING_LIMIT",
        default_value_t = 15,
        value_parser = RangedU64ValueParser::<usize>::new().range(10..=20)
    )]
    pub listing_limit: usize,

    /// Per-item marketplace lookup budget in seconds
    #[arg(
        long,
        env = "ITEM_TIMEOUT_SECS",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub item_timeout_secs: u64,

    /// Run a check every N minutes while serving (default: only on trigger)
    #[arg(long, env = "CHECK_INTERVAL_MINUTES")]
    pub check_interval_minutes: Option<u64>,

    /// Shared secret required by /api/check
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    pub cron_secret: Option<String>,

    #[arg(long, env = "EBAY_CLIENT_ID", default_value = "", hide_env_values = true)]
    pub ebay_client_id: String,

    #[arg(long, env = "EBAY_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub ebay_client_secret: String,

    #[arg(long, env = "EBAY_MARKETPLACE_ID", default_value = "EBAY_US")]
    pub ebay_marketplace_id: String,

    #[arg(long, env = "EBAY_BASE_URL", default_value = EBAY_API_URL)]
    pub ebay_base_url: String,

    #[arg(long, env = "SCRYFALL_BASE_URL", default_value = SCRYFALL_API_URL)]
    pub scryfall_base_url: String,

    /// VAPID public key (base64url uncompressed P-256 point)
    #[arg(long, env = "VAPID_PUBLIC_KEY")]
    pub vapid_public_key: Option<String>,

    /// Path to the VAPID private key (PKCS#8 PEM)
    #[arg(long, env = "VAPID_PRIVATE_KEY_FILE")]
    pub vapid_private_key: Option<PathBuf>,

    /// Contact sent to push services in the VAPID token
    #[arg(long, env = "VAPID_SUBJECT", default_value = "mailto:admin@localhost")]
    pub vapid_subject: String,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the web UI, API and check trigger (default)
    Serve,
    /// Run one check, print the summary as JSON and exit
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// One JSON document per collection
    Json,
    /// Single SQLite database file
    Sqlite,
}

/// Returns the default data directory: ~/.local/share/snipe_watch
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snipe_watch")
        .to_string_lossy()
        .to_string()
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    pub fn open_store(&self) -> Result<Arc<dyn StateStore>> {
        let dir = PathBuf::from(&self.data_dir);
        let store: Arc<dyn StateStore> = match self.store {
            StoreBackend::Json => Arc::new(JsonFileStore::new(&dir)?),
            StoreBackend::Sqlite => Arc::new(SqliteStore::open(&dir.join("snipe_watch.db"))?),
        };
        log::info!("Using {:?} store in {}", self.store, dir.display());
        Ok(store)
    }

    pub fn ebay_config(&self) -> EbayConfig {
        EbayConfig {
            marketplace_id: self.ebay_marketplace_id.clone(),
            base_url: self.ebay_base_url.clone(),
            ..EbayConfig::new(self.ebay_client_id.clone(), self.ebay_client_secret.clone())
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            listing_limit: self.listing_limit,
            match_policy: self.match_policy,
            item_timeout: Duration::from_secs(self.item_timeout_secs),
        }
    }

    /// Blank secrets count as unset
    pub fn cron_secret(&self) -> Option<String> {
        self.cron_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// VAPID keys when both halves are configured; only one half is an error
    pub fn vapid_keys(&self) -> Result<Option<VapidKeys>> {
        match (&self.vapid_public_key, &self.vapid_private_key) {
            (Some(public), Some(private)) => Ok(Some(VapidKeys::from_pem_file(
                private,
                public.trim(),
                self.vapid_subject.clone(),
            )?)),
            (None, None) => Ok(None),
            _ => Err(Error::Push(PushError::Config(
                "VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY_FILE must be set together".to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["snipe_watch"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.command(), Command::Serve);
        assert_eq!(args.store, StoreBackend::Json);
        assert_eq!(args.match_policy, MatchPolicy::AtOrBelow);

        let options = args.reconcile_options();
        assert_eq!(options.listing_limit, 15);
        assert_eq!(options.item_timeout, Duration::from_secs(20));
    }

    #[test]
    fn check_subcommand_and_policy() {
        let args = parse(&["--match-policy", "strictly-below", "--store", "sqlite", "check"]);
        assert_eq!(args.command(), Command::Check);
        assert_eq!(args.store, StoreBackend::Sqlite);
        assert_eq!(args.reconcile_options().match_policy, MatchPolicy::StrictlyBelow);
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        for bad in [
            ["--listing-limit", "0"],
            ["--listing-limit", "9"],
            ["--listing-limit", "21"],
            ["--item-timeout-secs", "0"],
        ] {
            let mut argv = vec!["snipe_watch"];
            argv.extend_from_slice(&bad);
            assert!(Args::try_parse_from(argv).is_err(), "accepted {bad:?}");
        }

        let args = parse(&["--listing-limit", "20", "--item-timeout-secs", "1"]);
        assert_eq!(args.reconcile_options().listing_limit, 20);
        assert_eq!(args.reconcile_options().item_timeout, Duration::from_secs(1));
    }

    #[test]
    fn blank_cron_secret_is_unset() {
        assert_eq!(parse(&["--cron-secret", "  "]).cron_secret(), None);
        assert_eq!(
            parse(&["--cron-secret", "s3cret"]).cron_secret(),
            Some("s3cret".to_string())
        );
    }

    #[test]
    fn ebay_config_carries_overrides() {
        let config = parse(&[
            "--ebay-client-id",
            "id",
            "--ebay-client-secret",
            "secret",
            "--ebay-marketplace-id",
            "EBAY_DE",
        ])
        .ebay_config();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.marketplace_id, "EBAY_DE");
        assert_eq!(config.base_url, EBAY_API_URL);
    }

    #[test]
    fn half_configured_vapid_is_rejected() {
        let args = parse(&["--vapid-public-key", "BKyx"]);
        assert!(matches!(args.vapid_keys(), Err(Error::Push(PushError::Config(_)))));
        assert!(parse(&[]).vapid_keys().unwrap().is_none());
    }

    #[test]
    fn opens_both_store_backends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();

        for backend in ["json", "sqlite"] {
            let store = parse(&["--data-dir", path, "--store", backend])
                .open_store()
                .unwrap();
            assert!(store.load_watchlist().unwrap().is_empty());
        }
        assert!(dir.path().join("snipe_watch.db").exists());
    }
}
