//! The anonymous ballot submission and tally engine.
//!
//! [`BallotEngine`] wires the receipt issuer, the ballot transaction, the
//! anonymization step, the tally aggregator, the result cache and the rate
//! limiter to the storage collaborators. It is cheap to clone; every clone
//! shares the same collaborators, cache and limiter.

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::model::store::{AuditLog, BallotStore, ElectionDirectory};

mod anonymize;
mod cache;
mod rate_limit;
mod receipts;
mod submission;
mod tally;

#[cfg(test)]
pub mod fixture;

pub use anonymize::anonymize;
pub use cache::{cache_key, Cached, ResultCache, TtlCache};
pub use rate_limit::{RateLimiter, VOTE_SUBMIT};
pub use submission::ClientInfo;
pub use tally::{percentage, rank_position, turnout_percentage};

#[cfg(test)]
pub use fixture::TestFixture;

#[derive(Clone)]
pub struct BallotEngine {
    store: Arc<dyn BallotStore>,
    directory: Arc<dyn ElectionDirectory>,
    audit: Arc<dyn AuditLog>,
    cache: Arc<dyn ResultCache>,
    limiter: Arc<RateLimiter>,
    config: Config,
}

impl BallotEngine {
    pub fn new(
        store: impl BallotStore + 'static,
        directory: impl ElectionDirectory + 'static,
        audit: impl AuditLog + 'static,
        cache: impl ResultCache + 'static,
        config: &Config,
    ) -> Self {
        Self {
            store: Arc::new(store),
            directory: Arc::new(directory),
            audit: Arc::new(audit),
            cache: Arc::new(cache),
            limiter: Arc::new(RateLimiter::new(
                config.vote_rate_limit(),
                config.vote_rate_window(),
            )),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Drop every cached aggregate.
    pub async fn invalidate_results(&self) {
        self.cache.invalidate_all().await;
    }

    /// Serve `key` from the cache, or compute and cache it for `ttl`.
    /// Failures are not cached.
    async fn cached<T, F, Fut>(&self, key: String, ttl: Duration, compute: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get(&key).await {
            if let Some(value) = hit.downcast_ref::<T>() {
                return Ok(value.clone());
            }
        }
        let value = compute().await?;
        self.cache.set(key, Arc::new(value.clone()), ttl).await;
        Ok(value)
    }
}
