//! Result cache (spec §4.8): TTL-bounded verdict storage with a
//! single-flight guard so concurrent lookups of the same address share one
//! probe.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::orchestrator::ProbeOrchestrator;
use crate::verdict::Verdict;

/// Default cache TTL (spec §6): 30 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

struct CachedRow {
    verdict: Verdict,
    cached_at: u64,
}

/// Marks an address as "probe in flight." Removed by the guard's `Drop` on
/// every exit path, including panic, releasing the next waiter.
struct InFlightGuard<'a> {
    registry: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.key);
    }
}

/// Wraps a [`ProbeOrchestrator`] with a TTL cache and per-address
/// single-flight lock. Never holds a reference back to the orchestrator
/// beyond this one direction, per the spec's cyclic-holder redesign flag.
pub struct ResultCache {
    orchestrator: Arc<ProbeOrchestrator>,
    rows: DashMap<String, CachedRow>,
    in_flight: DashMap<String, ()>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(orchestrator: Arc<ProbeOrchestrator>) -> Self {
        Self::with_ttl(orchestrator, DEFAULT_TTL)
    }

    pub fn with_ttl(orchestrator: Arc<ProbeOrchestrator>, ttl: Duration) -> Self {
        Self {
            orchestrator,
            rows: DashMap::new(),
            in_flight: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cached verdict if fresh, otherwise probes, stores, and
    /// returns the new one. Concurrent callers for the same address block
    /// on the single-flight lock rather than duplicating the probe.
    pub fn fetch(&self, address: &str) -> Verdict {
        let key = normalize_key(address);

        if let Some(verdict) = self.fresh_row(&key) {
            return verdict;
        }

        loop {
            match self.in_flight.entry(key.clone()) {
                Entry::Occupied(_) => {
                    if let Some(verdict) = self.fresh_row(&key) {
                        return verdict;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(());
                    break;
                }
            }
        }
        let _guard = InFlightGuard {
            registry: &self.in_flight,
            key: key.clone(),
        };

        if let Some(verdict) = self.fresh_row(&key) {
            return verdict;
        }

        debug!(%address, "cache miss, invoking orchestrator");
        let verdict = self.orchestrator.categorize(address);
        self.store(&key, verdict.clone());
        verdict
    }

    pub fn store(&self, address: &str, verdict: Verdict) {
        let key = normalize_key(address);
        self.rows.insert(
            key,
            CachedRow {
                verdict,
                cached_at: now_secs(),
            },
        );
    }

    /// Addresses whose cached row has aged past the TTL and need a fresh
    /// probe. The refresh driver collaborator owns re-invoking `fetch` for
    /// each and re-storing the result.
    pub fn expired_addresses(&self) -> Vec<String> {
        let ttl = self.ttl;
        self.rows
            .iter()
            .filter(|entry| !is_fresh(entry.value().cached_at, ttl))
            .map(|entry| entry.value().verdict.address.clone())
            .collect()
    }

    pub fn all_by_category(&self, category: &str) -> Vec<Verdict> {
        self.rows
            .iter()
            .filter(|entry| entry.value().verdict.category.matches(category))
            .map(|entry| entry.value().verdict.clone())
            .collect()
    }

    fn fresh_row(&self, key: &str) -> Option<Verdict> {
        let ttl = self.ttl;
        self.rows.get(key).and_then(|row| {
            if is_fresh(row.cached_at, ttl) {
                Some(row.verdict.clone())
            } else {
                None
            }
        })
    }
}

fn is_fresh(cached_at: u64, ttl: Duration) -> bool {
    cached_at >= now_secs().saturating_sub(ttl.as_secs())
}

fn normalize_key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_lowercases_and_trims() {
        assert_eq!(normalize_key("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn is_fresh_rejects_entries_older_than_ttl() {
        let ttl = Duration::from_secs(60);
        let stale = now_secs().saturating_sub(120);
        assert!(!is_fresh(stale, ttl));
    }

    #[test]
    fn is_fresh_accepts_recent_entries() {
        let ttl = Duration::from_secs(60);
        assert!(is_fresh(now_secs(), ttl));
    }
}
