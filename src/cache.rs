//! Cache capability for fetched annotation lists.
//!
//! The fetcher talks to the cache only through [`AnnotationCache`]
//! (`get` by key, `set` with a TTL). Eviction is the implementation's job.
//! [`MemoryCache`] is the in-process implementation; expiry is measured
//! against an injected [`Clock`] so tests can move time forward.
//!
//! Keys come from [`cache_key`]: SHA-256 over a length-prefixed,
//! separator-delimited encoding of `(api_url, course_id, module_id, user_id)`.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::models::{Annotation, RequestContext};

const KEY_NAMESPACE: &str = "annotations";

/// Read/write access to a shared key-value cache with per-entry TTL.
///
/// Implementations must be safe for concurrent use; the fetcher does no
/// locking of its own.
pub trait AnnotationCache: Send + Sync {
    /// Live value for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Option<Vec<Annotation>>;
    /// Store `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: Vec<Annotation>, ttl: Duration);
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        let advanced = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta));
        *now = advanced.unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Compute the cache key for a request.
///
/// The URL is length-prefixed and every field is `|`-delimited, so no two
/// distinct inputs share an encoding (course 1/module 23 vs. course
/// 12/module 3, or a URL ending in digits). Stable across restarts.
pub fn cache_key(api_url: &str, context: &RequestContext) -> String {
    let canonical = format!(
        "{}|{}:{}|{}|{}|{}",
        KEY_NAMESPACE,
        api_url.len(),
        api_url,
        context.course_id,
        context.module_id,
        context.user_id
    );

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{}:{:x}", KEY_NAMESPACE, hasher.finalize())
}

struct CacheEntry {
    value: Vec<Annotation>,
    expires_at: DateTime<Utc>,
}

/// In-process cache backed by a `HashMap` behind an `RwLock`.
pub struct MemoryCache<C: Clock = SystemClock> {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: C,
}

impl MemoryCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of stored entries. Expired ones stay counted until the next write.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> AnnotationCache for MemoryCache<C> {
    fn get(&self, key: &str) -> Option<Vec<Annotation>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().ok()?;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not grow with dead entries.
        if let Ok(mut entries) = self.entries.write() {
            if entries.get(key).is_some_and(|e| e.expires_at <= now) {
                entries.remove(key);
            }
        }
        None
    }

    fn set(&self, key: &str, value: Vec<Annotation>, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return;
        };
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if let Ok(mut entries) = self.entries.write() {
            // Sweep on write so keys that are never read again still leave the map.
            entries.retain(|_, entry| entry.expires_at > now);
            entries.insert(key.to_string(), CacheEntry { value, expires_at });
        }
    }
}
