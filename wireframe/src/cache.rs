//! Response cache with fixed TTL and lazy expiration.
//!
//! The cache is an explicitly constructed value, shared by handle, not a
//! process-wide singleton. There is no background sweeper: entries expire
//! lazily when read, so an expired entry occupies memory until the next
//! lookup of its key evicts it. Time is injected through the `Clock` trait
//! so expiry is testable without sleeping.

use crate::config::CacheConfig;
use crate::types::WireframeResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Production clock backed by the system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

struct CacheEntry {
    response: WireframeResponse,
    expires_at: SystemTime,
}

/// Keyed by the raw user query string; no normalization is applied, so
/// queries differing in whitespace or case are distinct entries.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl: Duration::from_secs(config.ttl_seconds),
            enabled: config.enabled,
        }
    }

    /// Look up a response. Returns `None` when disabled, absent, or expired;
    /// an expired entry is removed on the spot. A lock poisoned by a
    /// panicking holder degrades to a miss rather than propagating the panic.
    pub fn get(&self, key: &str) -> Option<WireframeResponse> {
        if !self.enabled {
            return None;
        }
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => return None,
        };
        match entries.get(key) {
            Some(entry) if self.clock.now() < entry.expires_at => {
                tracing::debug!(key, "cache hit");
                Some(entry.response.clone())
            }
            Some(_) => {
                tracing::debug!(key, "cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a response with a fresh full-TTL expiry, unconditionally
    /// overwriting any previous entry for the key. Returns whether the write
    /// landed: `false` when disabled or when the lock is poisoned.
    pub fn set(&self, key: &str, response: WireframeResponse) -> bool {
        if !self.enabled {
            return false;
        }
        let expires_at = self.clock.now() + self.ttl;
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        response,
                        expires_at,
                    },
                );
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of stored entries, expired ones included (they linger until
    /// their key is next read).
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
