//! In-memory session store mapping opaque handles to brokerage credentials
//! and cached upstream tokens, plus the process-wide fallback slot used
//! when no session is presented.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::clock::Clock;
use crate::errors::BrokerError;
use crate::fetcher::TokenFetcher;
use crate::token::{AccessToken, Credentials};

/// Absolute session lifetime. Eviction is age-based, not last-access-based:
/// a session cannot be extended indefinitely by repeated use.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// One authenticated user, owned exclusively by the store.
struct Session {
    credentials: Credentials,
    token: Option<AccessToken>,
    created_at: DateTime<Utc>,
}

/// Read-only status snapshot returned by [`SessionStore::check_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub valid: bool,
    pub remaining_secs: i64,
    pub has_token: bool,
}

impl SessionStatus {
    fn invalid() -> Self {
        Self {
            valid: false,
            remaining_secs: 0,
            has_token: false,
        }
    }
}

/// Session map with transparent, expiry-aware token refresh.
///
/// The map is the only shared mutable resource in the crate. Locks are
/// never held across an await: a refresh reads the credentials under the
/// lock, performs the upstream exchange unlocked, then writes the new token
/// back. Two callers racing the same refresh window may both hit upstream;
/// the last write wins, which is an accepted property of the design.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    fetcher: Arc<dyn TokenFetcher>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(fetcher: Arc<dyn TokenFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            fetcher,
            clock,
        }
    }

    /// Validate `credentials` against upstream and, on success, store a new
    /// session and return its handle. No record is created on failure.
    pub async fn create_session(&self, credentials: Credentials) -> Result<String, BrokerError> {
        let token = self.fetcher.fetch_token(&credentials).await?;

        let session_id = generate_session_id();
        let session = Session {
            credentials,
            token: Some(token),
            created_at: self.clock.now(),
        };

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session_id.clone(), session);
        debug!(
            session = %&session_id[..8],
            total = sessions.len(),
            "New session created"
        );
        Ok(session_id)
    }

    /// Return a usable access token for `session_id`, refreshing it with
    /// the stored credentials when stale.
    ///
    /// The cached-token path is the hot path: it takes a read lock and does
    /// no I/O. Refresh failures propagate as the underlying fetcher error
    /// so a credential problem is never masked as a session problem.
    pub async fn get_token(&self, session_id: &str) -> Result<String, BrokerError> {
        let credentials = {
            let sessions = self.sessions.read().unwrap();
            let session = sessions.get(session_id).ok_or(BrokerError::SessionNotFound)?;
            if let Some(token) = &session.token {
                if token.is_valid_at(self.clock.now()) {
                    return Ok(token.access_token.clone());
                }
            }
            session.credentials.clone()
        };

        debug!(session = %&session_id[..8], "Cached token stale, refreshing");
        let token = self.fetcher.fetch_token(&credentials).await?;
        let access_token = token.access_token.clone();

        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(session_id) {
            Some(session) => session.token = Some(token),
            // Destroyed while the refresh was in flight: the result is
            // discarded and the caller sees the session as gone.
            None => return Err(BrokerError::SessionNotFound),
        }
        Ok(access_token)
    }

    /// Remove the session if present; returns whether it existed.
    pub fn destroy_session(&self, session_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap()
            .remove(session_id)
            .is_some();
        if removed {
            debug!(session = %&session_id[..8], "Session closed");
        }
        removed
    }

    /// Read-only status query; never mutates and never triggers a refresh.
    pub fn check_session(&self, session_id: &str) -> SessionStatus {
        let sessions = self.sessions.read().unwrap();
        match sessions.get(session_id) {
            Some(session) => {
                let age = (self.clock.now() - session.created_at).num_seconds();
                SessionStatus {
                    valid: age <= SESSION_TTL_SECS,
                    remaining_secs: (SESSION_TTL_SECS - age).max(0),
                    has_token: session.token.is_some(),
                }
            }
            None => SessionStatus::invalid(),
        }
    }

    /// Evict every session older than [`SESSION_TTL_SECS`]; returns how
    /// many were removed. Called periodically by the server's sweeper task.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| (now - session.created_at).num_seconds() <= SESSION_TTL_SECS);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Expired sessions removed");
        }
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

/// Process-wide token slot fed by statically configured environment
/// credentials, used when a request carries no session header.
///
/// Exists for single-operator deployments that skip the login flow. Uses
/// the same validity predicate as the session path.
pub struct FallbackSlot {
    credentials: Option<Credentials>,
    token: RwLock<Option<AccessToken>>,
    fetcher: Arc<dyn TokenFetcher>,
    clock: Arc<dyn Clock>,
}

impl FallbackSlot {
    pub fn new(
        credentials: Option<Credentials>,
        fetcher: Arc<dyn TokenFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            token: RwLock::new(None),
            fetcher,
            clock,
        }
    }

    /// Return a usable access token from the slot, fetching or refreshing
    /// as needed. Fails fast with `MissingCredentials` before any network
    /// call when no environment credentials are configured.
    pub async fn get_token(&self) -> Result<String, BrokerError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(BrokerError::MissingCredentials)?;

        {
            let token = self.token.read().unwrap();
            if let Some(token) = token.as_ref() {
                if token.is_valid_at(self.clock.now()) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Fallback token stale or absent, fetching with env credentials");
        let token = self.fetcher.fetch_token(credentials).await?;
        let access_token = token.access_token.clone();
        *self.token.write().unwrap() = Some(token);
        Ok(access_token)
    }
}

/// 256 bits from the OS RNG, hex encoded. Handles are unguessable and
/// never reused after eviction.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
