//! Client-side identifier generation.
//!
//! Identifiers look like `proc-1718022133123`: a prefix naming the node
//! level and a number. Numbers come from a counter that is strictly
//! increasing and at least the current Unix time in milliseconds, so an id
//! is never handed out twice. Clones share the counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Observed numbers above this are ignored. The counter advances by one per
/// id from the current time, so it never gets near it, and an observed
/// number this large would leave no room to keep counting.
const MAX_OBSERVED: u64 = u64::MAX / 2;

/// Generates unique `<prefix>-<n>` identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: Arc<AtomicU64>,
}

impl IdGenerator {
    /// Create a generator with no prior ids.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that will only produce numbers above `floor`.
    #[must_use]
    pub fn starting_after(floor: u64) -> Self {
        Self {
            last: Arc::new(AtomicU64::new(floor)),
        }
    }

    /// Make sure future ids are numbered above the one in `existing`.
    ///
    /// Ids without a numeric suffix, or with one too large to count past,
    /// are ignored.
    pub fn observe(&self, existing: &str) {
        if let Some(n) = numeric_suffix(existing).filter(|&n| n <= MAX_OBSERVED) {
            self.last.fetch_max(n, Ordering::SeqCst);
        }
    }

    /// Produce the next identifier for `prefix`.
    pub fn next(&self, prefix: &str) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut current = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(current.saturating_add(1));
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return format!("{prefix}-{candidate}"),
                Err(actual) => current = actual,
            }
        }
    }

    /// The highest number handed out or observed so far.
    #[must_use]
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

fn numeric_suffix(id: &str) -> Option<u64> {
    id.rsplit_once('-').and_then(|(_, n)| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_next_uses_prefix() {
        let ids = IdGenerator::new();
        let id = ids.next("proc");
        assert!(id.starts_with("proc-"));
        assert!(numeric_suffix(&id).is_some());
    }

    #[test]
    fn test_ids_never_repeat_in_a_burst() {
        let ids = IdGenerator::new();
        let generated: HashSet<String> = (0..1_000).map(|_| ids.next("efecto")).collect();
        assert_eq!(generated.len(), 1_000);
    }

    #[test]
    fn test_ids_strictly_increase_across_prefixes() {
        let ids = IdGenerator::new();
        let a = numeric_suffix(&ids.next("proc")).unwrap();
        let b = numeric_suffix(&ids.next("subproc")).unwrap();
        let c = numeric_suffix(&ids.next("falla")).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_observe_raises_floor() {
        let ids = IdGenerator::new();
        let far_future = u64::MAX / 2;
        ids.observe(&format!("falla-{far_future}"));
        let next = numeric_suffix(&ids.next("falla")).unwrap();
        assert_eq!(next, far_future + 1);
    }

    #[test]
    fn test_observe_ignores_numbers_without_headroom() {
        let ids = IdGenerator::starting_after(10);
        ids.observe(&format!("proc-{}", u64::MAX));
        ids.observe(&format!("proc-{}", MAX_OBSERVED + 1));
        assert_eq!(ids.last(), 10);

        let a = ids.next("proc");
        let b = ids.next("proc");
        assert_ne!(a, b);
        assert_ne!(a, format!("proc-{}", u64::MAX));
    }

    #[test]
    fn test_observe_ignores_non_numeric_ids() {
        let ids = IdGenerator::starting_after(10);
        ids.observe("proc-abc");
        ids.observe("legacy");
        assert_eq!(ids.last(), 10);
    }

    #[test]
    fn test_observe_handles_element_kind_prefixes() {
        let ids = IdGenerator::new();
        ids.observe("efectosPotenciales-99999999999999");
        assert_eq!(ids.last(), 99_999_999_999_999);
    }

    #[test]
    fn test_clones_share_counter() {
        let ids = IdGenerator::new();
        let other = ids.clone();
        let a = ids.next("proc");
        let b = other.next("proc");
        assert_ne!(a, b);
        assert_eq!(ids.last(), other.last());
    }
}
