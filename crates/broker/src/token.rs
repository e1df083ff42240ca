//! Access-token model and the validity predicate shared by the session
//! path and the environment-credential fallback path.

use std::fmt;

use chrono::{DateTime, Utc};

/// Seconds subtracted from the advertised lifetime so an in-flight request
/// never races the real expiry.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 30;

/// Bearer token issued by the upstream brokerage API.
///
/// Tokens are replaced, never mutated in place: a refresh produces a new
/// `AccessToken` that overwrites the old one wherever it is cached.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Opaque bearer string issued by upstream.
    pub access_token: String,
    /// Lifetime advertised by upstream at issuance, in seconds.
    pub expires_in_secs: i64,
    /// When the token was obtained.
    pub obtained_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is still usable at `now`.
    ///
    /// This is the single source of truth for refresh decisions. A token is
    /// valid while `now - obtained_at < expires_in_secs - 30`; both the
    /// session store and the fallback slot call this and nothing else, so
    /// the two paths can never disagree on the staleness window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.obtained_at).num_seconds();
        elapsed < self.expires_in_secs - TOKEN_SAFETY_MARGIN_SECS
    }
}

/// Username/password pair used to obtain tokens on behalf of a session.
///
/// Retained in memory for the session's full lifetime to support refresh;
/// only ever transmitted to the upstream token endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// The password must never reach logs, so Debug redacts it.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
