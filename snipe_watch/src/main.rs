//! Snipe Watch - MTG marketplace watcher
//!
//! `serve` (default) runs the web UI and check trigger, optionally with an
//! in-process check timer. `check` runs one pass and prints the summary.

use clap::Parser;
use mtg_common::ScryfallClient;
use snipe_watch::config::{Args, Command};
use snipe_watch::marketplace::{EbayClient, TokenCache};
use snipe_watch::push::{DisabledSender, PushSender, WebPushSender};
use snipe_watch::web::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("Starting snipe_watch...");

    let state = match build_state(&args) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    match args.command() {
        Command::Check => run_once(&state).await,
        Command::Serve => {
            if let Some(minutes) = args.check_interval_minutes.filter(|m| *m > 0) {
                log::info!("Checking every {} minute(s)", minutes);
                let timer_state = state.clone();
                tokio::spawn(async move { run_timer(timer_state, minutes).await });
            }
            if let Err(e) = web::serve(state, args.port).await {
                log::error!("Web server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn build_state(args: &Args) -> snipe_watch::Result<AppState> {
    let store = args.open_store()?;

    let (push, vapid_public_key): (Arc<dyn PushSender>, Option<String>) = match args.vapid_keys()? {
        Some(keys) => {
            let sender = WebPushSender::new(keys);
            let public_key = sender.public_key().to_string();
            (Arc::new(sender), Some(public_key))
        }
        None => {
            log::warn!("VAPID keys not configured; push alerts are disabled");
            (Arc::new(DisabledSender), None)
        }
    };

    let cron_secret = args.cron_secret();
    if cron_secret.is_none() {
        log::warn!("CRON_SECRET not set; /api/check will refuse every request");
    }

    Ok(AppState {
        store,
        marketplace: Arc::new(EbayClient::new(args.ebay_config())),
        push,
        catalog: Arc::new(ScryfallClient::with_base_url(args.scryfall_base_url.clone())),
        token_cache: Arc::new(Mutex::new(TokenCache::new())),
        cron_secret,
        vapid_public_key,
        options: args.reconcile_options(),
    })
}

/// One pass, JSON summary on stdout, exit code 1 on a fatal error
async fn run_once(state: &AppState) {
    match state.check().await {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to encode summary: {}", e),
        },
        Err(e) => {
            log::error!("Check failed: {}", e);
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            std::process::exit(1);
        }
    }
}

/// In-process stand-in for an external cron trigger
async fn run_timer(state: AppState, minutes: u64) {
    let mut ticker = interval(Duration::from_secs(minutes * 60));

    loop {
        ticker.tick().await;
        log::info!("Scheduled check triggered");
        if let Err(e) = state.check().await {
            log::error!("Scheduled check failed: {}", e);
        }
    }
}
