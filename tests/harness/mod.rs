// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for contact form abuse simulation.
//!
//! Generates junk and legitimate submissions and tallies how the server
//! tier answers them.

pub mod generators;
pub mod metrics;
