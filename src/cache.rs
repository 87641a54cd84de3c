//! Time-bounded result cache keyed by `(platform, username)`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::check::Availability;

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Source of the current time.
///
/// [`SystemClock`] in production, [`ManualClock`] in tests.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time via [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// ```
/// use std::time::Duration;
/// use handle_avail::cache::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(clock.now() - start, Duration::from_secs(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// A clock frozen at the moment of creation.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *lock(&self.now) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *lock(&self.now)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Cache key: platform id plus the exact username string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Platform id.
    pub platform: &'static str,
    /// Username as given by the caller.
    pub username: String,
}

impl CacheKey {
    /// Build a key.
    pub fn new(platform: &'static str, username: impl Into<String>) -> Self {
        Self {
            platform,
            username: username.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.username)
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    stored_at: Instant,
    result: Availability,
}

/// In-memory read-through cache with a single fixed TTL.
///
/// Entries are never evicted; a stale entry is simply ignored and later
/// overwritten. The lock is held only for the map operation itself, so two
/// callers missing on the same key both fetch and the last write wins.
pub struct ResultCache<C = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache<SystemClock> {
    /// A cache on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl Default for ResultCache<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<C: Clock> ResultCache<C> {
    /// A cache reading time from `clock`.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cache's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The cached result for `key`, if one exists and is younger than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<Availability> {
        let now = self.clock.now();
        let entries = lock(&self.entries);
        let entry = entries.get(key)?;
        (now.saturating_duration_since(entry.stored_at) < self.ttl).then_some(entry.result)
    }

    /// Store `result` for `key`, stamped with the current time.
    pub fn insert(&self, key: CacheKey, result: Availability) {
        let stored_at = self.clock.now();
        lock(&self.entries).insert(key, CacheEntry { stored_at, result });
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has any entry at all, fresh or stale.
    pub fn contains(&self, key: &CacheKey) -> bool {
        lock(&self.entries).contains_key(key)
    }
}

impl<C> fmt::Debug for ResultCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("entries", &lock(&self.entries).len())
            .finish_non_exhaustive()
    }
}

// A panic while holding the lock cannot leave the map half-written.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
