//! Per-voter admission control in front of the ballot transaction.
//!
//! This is abuse mitigation only. The uniqueness constraints of the store are
//! what actually stop a voter from voting twice, so the state here is kept in
//! process memory and forgotten on restart.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rocket::tokio::sync::Mutex;

use crate::model::common::VoterId;

/// Scope of ballot submissions.
pub const VOTE_SUBMIT: &str = "vote_submit";

type Key = (VoterId, &'static str);

#[derive(Default)]
struct History {
    attempts: HashMap<Key, VecDeque<DateTime<Utc>>>,
    last_sweep: Option<DateTime<Utc>>,
}

impl History {
    /// Forget every key with no attempt after `cutoff`, at most once per
    /// window.
    fn sweep(&mut self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        match self.last_sweep {
            Some(last) if last > cutoff => return,
            Some(_) => self
                .attempts
                .retain(|_, attempts| attempts.back().map_or(false, |t| *t > cutoff)),
            None => {}
        }
        self.last_sweep = Some(now);
    }
}

/// Rolling-window limiter keyed by voter and action scope.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    history: Mutex<History>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            history: Mutex::new(History::default()),
        }
    }

    /// Record an attempt at `now`, or refuse it if the voter has already made
    /// `limit` attempts in this scope within the window ending at `now`.
    /// Refused attempts are not recorded.
    pub async fn allow(&self, voter: VoterId, scope: &'static str, now: DateTime<Utc>) -> bool {
        let mut history = self.history.lock().await;
        history.sweep(now, self.window);
        let attempts = history.attempts.entry((voter, scope)).or_default();
        let cutoff = now - self.window;
        while attempts.front().map_or(false, |t| *t <= cutoff) {
            attempts.pop_front();
        }
        if attempts.len() >= self.limit as usize {
            return false;
        }
        attempts.push_back(now);
        true
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.history.lock().await.attempts.len()
    }
}
