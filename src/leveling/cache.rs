//! In-memory XP accumulation between flush cycles.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// XP accumulated for one (guild, user) pair since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingXp {
    pub amount: i64,
    /// Number of flush cycles this delta has already failed.
    pub retries: u32,
}

/// Accumulator mapping (guild, user) to pending XP.
///
/// Writers add deltas from the message path; the flush cycle drains the whole
/// map with a single swap so activity recorded during a slow flush lands in
/// the next cycle instead of being lost or double counted.
#[derive(Default)]
pub struct XpCache {
    inner: Mutex<HashMap<(u64, u64), PendingXp>>,
}

impl XpCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the pending delta for a member. Never touches the
    /// backing store.
    pub fn record(&self, guild_id: u64, user_id: u64, amount: i64) {
        let mut map = self.lock();
        map.entry((guild_id, user_id))
            .or_insert(PendingXp {
                amount: 0,
                retries: 0,
            })
            .amount += amount;
    }

    /// Swaps the cache for an empty map and returns the drained snapshot.
    pub fn take(&self) -> HashMap<(u64, u64), PendingXp> {
        std::mem::take(&mut *self.lock())
    }

    /// Merges a failed delta back for the next cycle, preserving the higher
    /// retry count if new activity already recreated the entry.
    pub fn requeue(&self, guild_id: u64, user_id: u64, pending: PendingXp) {
        let mut map = self.lock();
        let entry = map.entry((guild_id, user_id)).or_insert(PendingXp {
            amount: 0,
            retries: 0,
        });
        entry.amount += pending.amount;
        entry.retries = entry.retries.max(pending.retries);
    }

    /// Discards any pending delta for a member, typically because they left
    /// the guild before the next flush.
    pub fn remove(&self, guild_id: u64, user_id: u64) {
        self.lock().remove(&(guild_id, user_id));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(u64, u64), PendingXp>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Key for an XP cooldown window.
///
/// The guild component is `None` under the historical per-user-global scope
/// and `Some` when `cooldown_per_guild` is enabled.
type CooldownKey = (u64, Option<u64>);

/// Rate limiter for XP awards.
#[derive(Default)]
pub struct CooldownTable {
    inner: Mutex<HashMap<CooldownKey, Instant>>,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an XP award slot for a member.
    ///
    /// Returns true and records the claim if the member's last claim is older
    /// than `window` (or absent); returns false while the window is still
    /// running.
    pub fn try_claim(&self, user_id: u64, guild_id: Option<u64>, window: Duration) -> bool {
        let now = Instant::now();
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        match map.get(&(user_id, guild_id)) {
            Some(last) if now.duration_since(*last) < window => false,
            _ => {
                map.insert((user_id, guild_id), now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_per_member() {
        let cache = XpCache::new();
        cache.record(100, 1, 5);
        cache.record(100, 1, 7);
        cache.record(100, 2, 3);
        cache.record(200, 1, 9);

        let snapshot = cache.take();
        assert_eq!(snapshot[&(100, 1)].amount, 12);
        assert_eq!(snapshot[&(100, 2)].amount, 3);
        assert_eq!(snapshot[&(200, 1)].amount, 9);
    }

    #[test]
    fn take_leaves_cache_empty_for_new_activity() {
        let cache = XpCache::new();
        cache.record(100, 1, 5);

        let first = cache.take();
        assert_eq!(first.len(), 1);
        assert!(cache.is_empty());

        // Activity after the swap lands in the next snapshot only.
        cache.record(100, 1, 4);
        let second = cache.take();
        assert_eq!(second[&(100, 1)].amount, 4);
        assert_eq!(second[&(100, 1)].retries, 0);
    }

    #[test]
    fn requeue_merges_with_new_activity() {
        let cache = XpCache::new();
        cache.record(100, 1, 5);
        cache.requeue(
            100,
            1,
            PendingXp {
                amount: 10,
                retries: 2,
            },
        );

        let snapshot = cache.take();
        assert_eq!(
            snapshot[&(100, 1)],
            PendingXp {
                amount: 15,
                retries: 2,
            }
        );
    }

    #[test]
    fn remove_discards_pending_delta() {
        let cache = XpCache::new();
        cache.record(100, 1, 5);
        cache.record(100, 2, 7);

        cache.remove(100, 1);

        let snapshot = cache.take();
        assert!(!snapshot.contains_key(&(100, 1)));
        assert_eq!(snapshot[&(100, 2)].amount, 7);
    }

    #[test]
    fn cooldown_blocks_within_window() {
        let table = CooldownTable::new();
        let window = Duration::from_secs(60);

        assert!(table.try_claim(1, None, window));
        assert!(!table.try_claim(1, None, window));
        // A different user is unaffected.
        assert!(table.try_claim(2, None, window));
    }

    #[test]
    fn cooldown_scope_separates_guilds_when_keyed() {
        let table = CooldownTable::new();
        let window = Duration::from_secs(60);

        assert!(table.try_claim(1, Some(100), window));
        assert!(table.try_claim(1, Some(200), window));
        assert!(!table.try_claim(1, Some(100), window));
    }

    #[test]
    fn zero_window_never_blocks() {
        let table = CooldownTable::new();

        assert!(table.try_claim(1, None, Duration::ZERO));
        assert!(table.try_claim(1, None, Duration::ZERO));
    }
}
