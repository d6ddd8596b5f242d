//! XP reconciliation against the persistent ledger.

use sea_orm::{DatabaseConnection, DbErr};
use tracing::info;

use crate::data::XpRepository;
use crate::model::XpRecord;

/// XP required to advance to `level` from the level below it.
///
/// Quadratic curve: 50n^2 + 100n + 200. Reaching level 1 costs 350 XP and
/// each level after that gets progressively more expensive.
pub fn xp_required_for(level: i32) -> i64 {
    let n = level as i64;
    50 * n * n + 100 * n + 200
}

/// Outcome of reconciling a pending XP delta into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    pub record: XpRecord,
    /// Set when the delta pushed the member over at least one threshold.
    pub leveled_up: bool,
}

/// Applies XP deltas to the ledger and computes level advancement.
pub struct LevelingEngine<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> LevelingEngine<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds `amount` XP to a member's ledger row, advancing their level while
    /// the within-level XP clears the threshold for the next level.
    ///
    /// A member with no row starts from level 0 with no XP. A single large
    /// delta can advance several levels in one call; `leveled_up` is set once
    /// regardless of how many thresholds were crossed.
    ///
    /// # Arguments
    /// * `guild_id` - Guild the XP was earned in.
    /// * `user_id` - Member earning the XP.
    /// * `amount` - XP delta to apply, must be positive.
    ///
    /// # Returns
    /// The persisted record and whether a level-up occurred.
    pub async fn reconcile(
        &self,
        guild_id: u64,
        user_id: u64,
        amount: i64,
    ) -> Result<ReconcileResult, DbErr> {
        let repository = XpRepository::new(self.db);

        let mut record = repository
            .get(guild_id, user_id)
            .await?
            .unwrap_or_else(|| XpRecord::fresh(guild_id, user_id));

        record.xp += amount;
        record.total_xp += amount;

        let mut leveled_up = false;
        while record.xp >= xp_required_for(record.level + 1) {
            record.xp -= xp_required_for(record.level + 1);
            record.level += 1;
            leveled_up = true;
        }

        let record = repository.upsert(&record).await?;

        if leveled_up {
            info!(
                guild_id,
                user_id,
                level = record.level,
                total_xp = record.total_xp,
                "member leveled up"
            );
        }

        Ok(ReconcileResult { record, leveled_up })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{builder::TestBuilder, factory};

    #[test]
    fn curve_matches_expected_thresholds() {
        assert_eq!(xp_required_for(0), 200);
        assert_eq!(xp_required_for(1), 350);
        assert_eq!(xp_required_for(2), 600);
        assert_eq!(xp_required_for(10), 6200);
    }

    #[tokio::test]
    async fn creates_fresh_record_for_unknown_member() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let engine = LevelingEngine::new(db);
        let result = engine.reconcile(100, 1, 50).await?;

        assert!(!result.leveled_up);
        assert_eq!(result.record.level, 0);
        assert_eq!(result.record.xp, 50);
        assert_eq!(result.record.total_xp, 50);

        Ok(())
    }

    #[tokio::test]
    async fn crossing_threshold_levels_up_and_carries_remainder() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        factory::create_xp_record_with(db, 100, 1, 0, 340, 340).await?;

        let engine = LevelingEngine::new(db);
        let result = engine.reconcile(100, 1, 30).await?;

        assert!(result.leveled_up);
        assert_eq!(result.record.level, 1);
        assert_eq!(result.record.xp, 20);
        assert_eq!(result.record.total_xp, 370);

        Ok(())
    }

    #[tokio::test]
    async fn first_level_requires_the_full_threshold() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let engine = LevelingEngine::new(db);

        // 300 XP is short of the 350 needed for level 1.
        let result = engine.reconcile(100, 1, 300).await?;
        assert!(!result.leveled_up);
        assert_eq!(result.record.level, 0);
        assert_eq!(result.record.xp, 300);

        // 560 lifetime XP clears level 1 with 210 left over.
        let result = engine.reconcile(100, 1, 260).await?;
        assert!(result.leveled_up);
        assert_eq!(result.record.level, 1);
        assert_eq!(result.record.xp, 210);

        Ok(())
    }

    #[tokio::test]
    async fn large_delta_crosses_multiple_thresholds() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let engine = LevelingEngine::new(db);
        // 350 + 600 = 950 clears levels 1 and 2 with 10 left over.
        let result = engine.reconcile(100, 1, 960).await?;

        assert!(result.leveled_up);
        assert_eq!(result.record.level, 2);
        assert_eq!(result.record.xp, 10);
        assert_eq!(result.record.total_xp, 960);

        Ok(())
    }

    #[tokio::test]
    async fn total_xp_equals_sum_of_cleared_thresholds_plus_remainder() -> Result<(), DbErr> {
        let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
        let db = test.db.as_ref().unwrap();

        let engine = LevelingEngine::new(db);
        engine.reconcile(100, 1, 700).await?;
        let result = engine.reconcile(100, 1, 413).await?;

        let cleared: i64 = (1..=result.record.level).map(xp_required_for).sum();
        assert_eq!(result.record.total_xp, cleared + result.record.xp);
        assert_eq!(result.record.total_xp, 1113);

        Ok(())
    }
}
