// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for abuse simulation runs.

use axum::http::StatusCode;
use std::collections::HashMap;

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Delivered,
    RateLimited,
    Rejected,
    Other,
}

impl From<StatusCode> for Outcome {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => Outcome::Delivered,
            StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited,
            StatusCode::BAD_REQUEST => Outcome::Rejected,
            _ => Outcome::Other,
        }
    }
}

/// Collects outcomes during a simulation.
#[derive(Debug, Default)]
pub struct SimulationMetrics {
    outcomes: HashMap<Outcome, usize>,
    total: usize,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Share of requests that were not delivered.
    pub fn block_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        1.0 - self.count(Outcome::Delivered) as f64 / self.total as f64
    }
}

impl std::fmt::Display for SimulationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={} delivered={} rate_limited={} rejected={} other={} block_rate={:.2}",
            self.total,
            self.count(Outcome::Delivered),
            self.count(Outcome::RateLimited),
            self.count(Outcome::Rejected),
            self.count(Outcome::Other),
            self.block_rate()
        )
    }
}
