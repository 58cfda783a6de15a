//! Bearer token cache for the client-credentials flow
//!
//! Plain value owned by the caller and handed to [`Marketplace::authenticate`](super::Marketplace::authenticate).

use chrono::{DateTime, TimeDelta, Utc};

/// A token is treated as expired this many seconds before its real expiry
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    token: Option<CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, if it is still valid at `now` minus the safety margin
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|t| t.expires_at - TimeDelta::seconds(EXPIRY_MARGIN_SECS) > now)
            .map(|t| t.access_token.as_str())
    }

    /// Cache a freshly exchanged token
    pub fn store(&mut self, access_token: String, expires_in_secs: i64, now: DateTime<Utc>) -> &str {
        let expires_at = now + TimeDelta::seconds(expires_in_secs.max(0));
        let token = self.token.insert(CachedToken {
            access_token,
            expires_at,
        });
        token.access_token.as_str()
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    pub fn cached(&self) -> Option<&CachedToken> {
        self.token.as_ref()
    }
}
