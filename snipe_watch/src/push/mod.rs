//! Push notification delivery
//!
//! [`fan_out`] sends one payload to every subscription concurrently and waits
//! for all of them; a failing endpoint never blocks the others.

mod web_push;

pub use web_push::{VapidKeys, WebPushSender};

use crate::error::{PushError, PushResult};
use crate::models::{PushPayload, Subscription};
use async_trait::async_trait;
use futures_util::future::join_all;

/// Delivers a payload to one registered endpoint
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &Subscription, payload: &PushPayload) -> PushResult<()>;
}

/// Stand-in when no VAPID keys are configured; every delivery fails
pub struct DisabledSender;

#[async_trait]
impl PushSender for DisabledSender {
    async fn send(&self, _subscription: &Subscription, _payload: &PushPayload) -> PushResult<()> {
        Err(PushError::Config("Web Push is not configured".to_string()))
    }
}

/// Outcome of delivering one payload to every subscription
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FanOutReport {
    pub delivered: usize,
    /// `"<endpoint host>: <error>"` per failed delivery
    pub failures: Vec<String>,
    /// Endpoints the push service reported as expired
    pub gone: Vec<String>,
}

pub async fn fan_out(
    sender: &dyn PushSender,
    subscriptions: &[Subscription],
    payload: &PushPayload,
) -> FanOutReport {
    let deliveries = subscriptions
        .iter()
        .map(|subscription| async move { (subscription, sender.send(subscription, payload).await) });

    let mut report = FanOutReport::default();
    for (subscription, result) in join_all(deliveries).await {
        match result {
            Ok(()) => report.delivered += 1,
            Err(PushError::Gone(endpoint)) => {
                log::info!("Push endpoint expired: {}", endpoint_host(&endpoint));
                report.gone.push(endpoint);
            }
            Err(e) => {
                log::warn!(
                    "Push delivery to {} failed: {}",
                    endpoint_host(&subscription.endpoint),
                    e
                );
                report
                    .failures
                    .push(format!("{}: {}", endpoint_host(&subscription.endpoint), e));
            }
        }
    }
    report
}

/// Host part of an endpoint; full endpoints carry per-device tokens
pub(crate) fn endpoint_host(endpoint: &str) -> String {
    reqwest::Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| endpoint.to_string())
}
