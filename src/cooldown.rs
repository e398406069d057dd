// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client-side resubmission cooldown.
//!
//! The time of the last successful submission is kept in durable storage
//! as milliseconds since the Unix epoch, formatted as a decimal string.
//! A new attempt is refused while less than the window has elapsed.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Storage key holding the last successful submission time.
pub const LAST_SUBMIT_KEY: &str = "contact_form_last_submit";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not a JSON object: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable string key-value storage on the client.
pub trait SubmissionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Wall-clock time source in epoch milliseconds.
pub trait WallClock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Current UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Settable wall clock.
#[derive(Debug, Default)]
pub struct ManualWallClock {
    millis: AtomicI64,
}

impl ManualWallClock {
    pub fn at(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl WallClock for ManualWallClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// In-memory store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a small JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Map::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SubmissionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .load()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Resubmission guard for one client.
#[derive(Clone)]
pub struct SubmissionCooldown {
    store: Arc<dyn SubmissionStore>,
    clock: Arc<dyn WallClock>,
    window: Duration,
}

impl SubmissionCooldown {
    pub fn new(store: Arc<dyn SubmissionStore>, clock: Arc<dyn WallClock>, window: Duration) -> Self {
        Self {
            store,
            clock,
            window,
        }
    }

    /// Time left before another submission is allowed, if any.
    ///
    /// A missing timestamp, or one without leading digits, never blocks.
    pub fn remaining(&self) -> Result<Option<Duration>, StoreError> {
        let Some(raw) = self.store.get(LAST_SUBMIT_KEY)? else {
            return Ok(None);
        };
        let Some(last) = leading_integer(&raw) else {
            debug!(value = %raw, "Ignoring unparsable last-submit timestamp");
            return Ok(None);
        };

        let window_ms = self.window.as_millis() as i64;
        let elapsed = self.clock.now_millis().saturating_sub(last);
        if elapsed < window_ms {
            let left = (window_ms - elapsed).min(window_ms);
            Ok(Some(Duration::from_millis(left as u64)))
        } else {
            Ok(None)
        }
    }

    pub fn is_rate_limited(&self) -> Result<bool, StoreError> {
        Ok(self.remaining()?.is_some())
    }

    /// Record a successful submission at the current time.
    pub fn record_success(&self) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        self.store.set(LAST_SUBMIT_KEY, &now.to_string())
    }
}

/// Base-10 integer at the start of `raw`, after leading whitespace and an
/// optional sign. Trailing characters are ignored.
fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
