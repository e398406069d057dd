// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for submission outcomes.

use prometheus::{IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Outcome label for a delivered submission.
pub const DELIVERED: &str = "DELIVERED";

pub struct Metrics {
    registry: Registry,
    submissions: IntCounterVec,
    tracked_addresses: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "contact_submissions_total",
                "Contact form submissions by outcome",
            ),
            &["outcome"],
        )?;
        let tracked_addresses = IntGauge::new(
            "contact_rate_limit_tracked_addresses",
            "Client addresses with requests inside the rate window",
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(tracked_addresses.clone()))?;

        Ok(Self {
            registry,
            submissions,
            tracked_addresses,
        })
    }

    /// Count one submission under `outcome`.
    pub fn record(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    pub fn count(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    pub fn set_tracked_addresses(&self, n: usize) {
        self.tracked_addresses.set(n as i64);
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
