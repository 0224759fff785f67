// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Exponential backoff retry for remote calls

use crate::constants::{conflict, inventory};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// How often and how patiently an operation is retried.
///
/// The loop stops at whichever budget runs out first. A policy with
/// neither `max_attempts` nor `max_elapsed` retries until success.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub max_elapsed: Option<Duration>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of each delay randomised in both directions, 0.0 disables it
    pub jitter: f64,
}

impl RetryPolicy {
    /// Policy for optimistic-concurrency conflicts on cluster writes
    pub fn conflict() -> Self {
        Self {
            max_attempts: Some(conflict::MAX_ATTEMPTS),
            max_elapsed: None,
            initial_delay: Duration::from_millis(conflict::BASE_DELAY_MILLIS),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Policy for inventory lookups, bounded by wall-clock time
    pub fn inventory() -> Self {
        Self {
            max_attempts: None,
            max_elapsed: Some(Duration::from_secs(inventory::MAX_ELAPSED_SECS)),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 1.5,
            jitter: 0.5,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_elapsed = Some(elapsed);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Un-jittered delay before attempt `attempt + 1`, attempts counted from 1
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        // Capped in float seconds, the unclamped product can overflow Duration
        let secs = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        delay.mul_f64((1.0 + spread).max(0.0))
    }
}

/// Run `op` until it succeeds, fails with an error `should_retry` rejects,
/// or the policy's budget is spent. The last error is returned on expiry.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, should_retry: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let started = Instant::now();
    let mut attempt = 1;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !should_retry(&err) {
            return Err(err);
        }
        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            debug!("Giving up after {} attempts: {}", attempt, err);
            return Err(err);
        }

        let wait = policy.jittered(policy.backoff(attempt));
        if policy
            .max_elapsed
            .is_some_and(|max| started.elapsed() + wait > max)
        {
            debug!("Giving up after {:?}: {}", started.elapsed(), err);
            return Err(err);
        }

        debug!("Attempt {} failed ({}), retrying in {:?}", attempt, err, wait);
        sleep(wait).await;
        attempt += 1;
    }
}
