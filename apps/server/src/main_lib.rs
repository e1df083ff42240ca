use std::sync::Arc;

use cartera_broker::{
    Clock, FallbackSlot, IolTokenFetcher, QuoteFetcher, SessionStore, SystemClock, TokenFetcher,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub fallback: Arc<FallbackSlot>,
    pub quotes: Arc<QuoteFetcher>,
    /// Used directly by the credential-check endpoint, which validates
    /// without creating a session.
    pub token_fetcher: Arc<dyn TokenFetcher>,
}

pub fn init_tracing() {
    let log_format = std::env::var("CARTERA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let token_fetcher: Arc<dyn TokenFetcher> = Arc::new(IolTokenFetcher::new(
        config.token_url.clone(),
        config.accept_invalid_certs,
        clock.clone(),
    ));

    let sessions = Arc::new(SessionStore::new(token_fetcher.clone(), clock.clone()));
    let fallback = Arc::new(FallbackSlot::new(
        config.fallback_credentials.clone(),
        token_fetcher.clone(),
        clock,
    ));
    let quotes = Arc::new(QuoteFetcher::new(
        config.quote_base_url.clone(),
        config.accept_invalid_certs,
    ));

    Arc::new(AppState {
        sessions,
        fallback,
        quotes,
        token_fetcher,
    })
}
