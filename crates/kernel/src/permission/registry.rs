//! Volatile, process-local permission registry.
//!
//! Each grant stores `name -> category` with a deadline `GRANT_TTL` ahead of
//! the registry clock and arms a tokio timer that removes the entry when it
//! fires. Entries carry a generation number; the timer only removes the
//! entry if its generation still matches, so a later grant for the same
//! name survives the earlier grant's timer.
//!
//! The deadline decides liveness. Timers only reclaim memory, and are not
//! armed for clocks that do not follow tokio time (see
//! [`Clock::tracks_runtime`]). Such registries sweep lapsed entries on
//! each grant instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// How long a granted permission stays consumable.
pub const GRANT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct PermissionEntry {
    category: String,
    generation: u64,
    deadline: Instant,
}

/// Result of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// Identity of the stored entry.
    pub generation: u64,
}

/// Registry of live upload permissions.
///
/// Wrapped in Arc internally so Clone is cheap. All access to an entry goes
/// through the map's shard lock, which makes grant, consume and expiry
/// mutually exclusive per name.
#[derive(Clone)]
pub struct PermissionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    entries: DashMap<String, PermissionEntry>,
    next_generation: AtomicU64,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PermissionRegistry {
    /// Create a registry on the system clock with the standard TTL.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), GRANT_TTL)
    }

    /// Create a registry with an explicit clock and TTL.
    pub fn with_clock(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                next_generation: AtomicU64::new(1),
                ttl,
                clock,
            }),
        }
    }

    /// Grant (or re-grant) an upload permission for `name`.
    ///
    /// Overwrites any existing entry for the name. The previous entry's
    /// timer becomes a no-op.
    pub fn grant(&self, name: &str, category: &str) -> Grant {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let deadline = self.inner.clock.now() + self.inner.ttl;

        let previous = self.inner.entries.insert(
            name.to_string(),
            PermissionEntry {
                category: category.to_string(),
                generation,
                deadline,
            },
        );

        debug!(
            name = %name,
            category = %category,
            generation,
            replaced = previous.is_some(),
            "permission granted"
        );

        self.schedule_expiry(name.to_string(), generation);

        Grant { generation }
    }

    /// Atomically take the permission for `name`.
    ///
    /// Returns the granted category, or `None` if there is no live entry.
    /// At most one caller receives a given entry.
    pub fn try_consume(&self, name: &str) -> Option<String> {
        let (_, entry) = self.inner.entries.remove(name)?;

        // The timer may not have run yet; the deadline is authoritative.
        if self.inner.clock.now() >= entry.deadline {
            debug!(name = %name, generation = entry.generation, "permission past deadline");
            return None;
        }

        debug!(
            name = %name,
            category = %entry.category,
            generation = entry.generation,
            "permission consumed"
        );
        Some(entry.category)
    }

    /// Check for a live entry without consuming it.
    ///
    /// The answer may be stale by the time the caller acts on it; only
    /// [`try_consume`](Self::try_consume) is authoritative.
    pub fn is_live(&self, name: &str) -> bool {
        let now = self.inner.clock.now();
        self.inner
            .entries
            .get(name)
            .is_some_and(|entry| now < entry.deadline)
    }

    /// Number of live permissions.
    pub fn len(&self) -> usize {
        let now = self.inner.clock.now();
        self.inner
            .entries
            .iter()
            .filter(|entry| now < entry.deadline)
            .count()
    }

    /// True if no live permissions exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the entry for `name` if it is still the given generation.
    fn expire(&self, name: &str, generation: u64) -> bool {
        let removed = self
            .inner
            .entries
            .remove_if(name, |_, entry| entry.generation == generation)
            .is_some();

        if removed {
            debug!(name = %name, generation, "permission expired");
        }
        removed
    }

    fn schedule_expiry(&self, name: String, generation: u64) {
        if !self.inner.clock.tracks_runtime() {
            self.sweep();
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // Outside a runtime the deadline check in try_consume still applies.
            debug!(name = %name, generation, "no runtime, expiry timer not armed");
            return;
        };

        let registry = Arc::downgrade(&self.inner);
        let ttl = self.inner.ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = registry.upgrade() {
                PermissionRegistry { inner }.expire(&name, generation);
            }
        });
    }

    /// Drop every entry whose deadline has passed.
    fn sweep(&self) {
        let now = self.inner.clock.now();
        self.inner.entries.retain(|_, entry| now < entry.deadline);
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PermissionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRegistry")
            .field("entries", &self.inner.entries.len())
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}
