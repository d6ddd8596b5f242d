//! Periodic cache-to-ledger flush cycle.

use sea_orm::DatabaseConnection;
use tracing::{debug, error, warn};

use crate::leveling::cache::XpCache;
use crate::leveling::engine::LevelingEngine;

/// Flush attempts before a failing delta is dropped.
pub const MAX_FLUSH_RETRIES: u32 = 3;

/// A level advancement produced by a flush cycle, for the caller to announce
/// and to sync reward roles from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub guild_id: u64,
    pub user_id: u64,
    pub level: i32,
    pub total_xp: i64,
}

/// Drains the cache and reconciles every pending delta into the ledger.
///
/// The cache is swapped out in one step, so message handlers keep recording
/// into a fresh map while this cycle writes the snapshot. Each delta is
/// reconciled independently: one failing member does not block the rest.
/// Failed deltas are merged back into the cache and retried on subsequent
/// cycles up to [`MAX_FLUSH_RETRIES`] times, then dropped.
pub async fn flush_cycle(db: &DatabaseConnection, cache: &XpCache) -> Vec<LevelUp> {
    let pending = cache.take();
    if pending.is_empty() {
        return Vec::new();
    }

    debug!(entries = pending.len(), "flushing xp cache");

    let engine = LevelingEngine::new(db);
    let mut level_ups = Vec::new();

    for ((guild_id, user_id), mut entry) in pending {
        if entry.amount <= 0 {
            warn!(guild_id, user_id, amount = entry.amount, "discarding non-positive xp delta");
            continue;
        }

        match engine.reconcile(guild_id, user_id, entry.amount).await {
            Ok(result) => {
                if result.leveled_up {
                    level_ups.push(LevelUp {
                        guild_id,
                        user_id,
                        level: result.record.level,
                        total_xp: result.record.total_xp,
                    });
                }
            }
            Err(err) => {
                entry.retries += 1;
                if entry.retries >= MAX_FLUSH_RETRIES {
                    error!(
                        guild_id,
                        user_id,
                        amount = entry.amount,
                        "dropping xp delta after {MAX_FLUSH_RETRIES} failed flushes: {err}"
                    );
                } else {
                    warn!(
                        guild_id,
                        user_id,
                        retries = entry.retries,
                        "requeueing xp delta after flush failure: {err}"
                    );
                    cache.requeue(guild_id, user_id, entry);
                }
            }
        }
    }

    level_ups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::XpRepository;
    use sea_orm::DbErr;
    use test_utils::builder::TestBuilder;

    #[tokio::test]
    async fn flush_persists_deltas_and_empties_cache() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let cache = XpCache::new();
        cache.record(100, 1, 40);
        cache.record(100, 1, 30);
        cache.record(100, 2, 15);

        let level_ups = flush_cycle(db, &cache).await;
        assert!(level_ups.is_empty());
        assert!(cache.is_empty());

        let repo = XpRepository::new(db);
        assert_eq!(repo.get(100, 1).await?.unwrap().total_xp, 70);
        assert_eq!(repo.get(100, 2).await?.unwrap().total_xp, 15);

        Ok(())
    }

    #[tokio::test]
    async fn flush_reports_level_ups() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let cache = XpCache::new();
        cache.record(100, 1, 400);
        cache.record(100, 2, 10);

        let level_ups = flush_cycle(db, &cache).await;
        assert_eq!(
            level_ups,
            vec![LevelUp {
                guild_id: 100,
                user_id: 1,
                level: 1,
                total_xp: 400,
            }]
        );

        Ok(())
    }

    #[tokio::test]
    async fn non_positive_deltas_are_discarded() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let cache = XpCache::new();
        cache.record(100, 1, -5);

        let level_ups = flush_cycle(db, &cache).await;
        assert!(level_ups.is_empty());

        let repo = XpRepository::new(db);
        assert!(repo.get(100, 1).await?.is_none());

        Ok(())
    }

    /// A database with no tables makes every reconcile fail, exercising the
    /// requeue-then-drop policy.
    #[tokio::test]
    async fn failed_deltas_requeue_then_drop() {
        let test = TestBuilder::new().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let cache = XpCache::new();
        cache.record(100, 1, 40);

        for expected_retries in 1..MAX_FLUSH_RETRIES {
            let level_ups = flush_cycle(db, &cache).await;
            assert!(level_ups.is_empty());

            let snapshot = cache.take();
            let entry = snapshot[&(100, 1)];
            assert_eq!(entry.amount, 40);
            assert_eq!(entry.retries, expected_retries);
            cache.requeue(100, 1, entry);
        }

        // Final cycle exhausts the retries and drops the delta.
        flush_cycle(db, &cache).await;
        assert!(cache.is_empty());
    }
}
