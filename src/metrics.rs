// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Metrics
//!
//! A single process-lifetime registry, created at startup and handed to the
//! metrics and panic middlewares. Counters are plain atomics; nothing here
//! takes a lock.
//!
//! | Metric | Meaning |
//! |--------|---------|
//! | `requests` | Requests that entered the chain |
//! | `errors` | Requests that left the chain with an error |
//! | `panics` | Handler panics recovered by the panic guard |
//! | `in_flight` | Requests currently inside the chain |
//! | `concurrency` | `in_flight` as sampled every `sample_every` requests |

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use utoipa::ToSchema;

/// Default sampling interval for the concurrency gauge.
pub const DEFAULT_SAMPLE_EVERY: u64 = 1000;

#[derive(Debug)]
pub struct Metrics {
    requests: AtomicU64,
    errors: AtomicU64,
    panics: AtomicU64,
    in_flight: AtomicU64,
    concurrency: AtomicU64,
    sample_every: u64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub panics: u64,
    pub in_flight: u64,
    pub concurrency: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_EVERY)
    }
}

impl Metrics {
    /// `sample_every` of zero is treated as one.
    pub fn new(sample_every: u64) -> Self {
        Self {
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            panics: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            concurrency: AtomicU64::new(0),
            sample_every: sample_every.max(1),
        }
    }

    /// Count a request entering the chain. The returned guard tracks it as in
    /// flight until dropped.
    pub fn begin_request(&self) -> InFlight<'_> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.sample_every == 0 {
            self.concurrency.store(in_flight, Ordering::Relaxed);
        }
        InFlight { metrics: self }
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            concurrency: self.concurrency.load(Ordering::Relaxed),
        }
    }
}

/// Marks one request as in flight.
#[derive(Debug)]
pub struct InFlight<'a> {
    metrics: &'a Metrics,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_requests_and_in_flight() {
        let metrics = Metrics::default();
        let first = metrics.begin_request();
        let second = metrics.begin_request();
        assert_eq!(metrics.snapshot().in_flight, 2);

        drop(first);
        drop(second);
        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.in_flight, 0);
    }

    #[test]
    fn samples_concurrency_every_nth_request() {
        let metrics = Metrics::new(3);
        let _a = metrics.begin_request();
        let _b = metrics.begin_request();
        assert_eq!(metrics.snapshot().concurrency, 0);

        let _c = metrics.begin_request();
        assert_eq!(metrics.snapshot().concurrency, 3);
    }

    #[test]
    fn zero_interval_samples_every_request() {
        let metrics = Metrics::new(0);
        drop(metrics.begin_request());
        assert_eq!(metrics.snapshot().concurrency, 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let metrics = Arc::new(Metrics::default());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        drop(metrics.begin_request());
                        metrics.record_error();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 4000);
        assert_eq!(snap.errors, 4000);
        assert_eq!(snap.in_flight, 0);
    }
}
