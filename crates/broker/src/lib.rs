//! Cartera Broker Crate
//!
//! This crate provides the session-scoped credential proxy for the IOL
//! (invertironline.com) brokerage API used by the Cartera dashboard.
//!
//! # Overview
//!
//! The broker crate supports:
//! - Password-grant credential exchange against the upstream token endpoint
//! - Expiry-aware bearer-token caching with a fixed safety margin
//! - Opaque session handles mapping to per-user credentials and tokens
//! - Absolute-age session eviction (24-hour TTL)
//! - Quote fetching through a fallback chain of candidate URLs
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  HTTP boundary   | --> |  SessionStore    |  (handle -> credentials/token)
//! +------------------+     +------------------+
//!          |                        |
//!          |                        v
//!          |               +------------------+
//!          |               |   TokenFetcher   |  (password grant -> AccessToken)
//!          |               +------------------+
//!          v
//! +------------------+     +------------------+
//! |   QuoteFetcher   | --> |  candidate URLs  |  (first 200+JSON wins)
//! +------------------+     +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`AccessToken`] - Upstream bearer token with issuance metadata
//! - [`Credentials`] - Username/password pair, password redacted from `Debug`
//! - [`SessionStore`] - In-memory session map with transparent token refresh
//! - [`FallbackSlot`] - Process-wide token slot fed by environment credentials
//! - [`QuoteFetcher`] - Fallback-chain quote client

pub mod clock;
pub mod errors;
pub mod fetcher;
pub mod quotes;
pub mod session;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use errors::BrokerError;
pub use fetcher::{IolTokenFetcher, TokenFetcher, DEFAULT_TOKEN_URL};
pub use quotes::{QuoteFetcher, QuoteResult, DEFAULT_QUOTE_BASE_URL};
pub use session::{FallbackSlot, SessionStatus, SessionStore, SESSION_TTL_SECS};
pub use token::{AccessToken, Credentials, TOKEN_SAFETY_MARGIN_SECS};
