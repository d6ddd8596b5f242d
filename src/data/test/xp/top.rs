use super::*;

/// Tests that the leaderboard is ordered by lifetime XP descending.
///
/// Expected: records returned in descending total_xp order, capped at limit
#[tokio::test]
async fn orders_by_total_xp_descending() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 0, 0, 50).await?;
    factory::create_xp_record_with(db, 100, 2, 0, 0, 300).await?;
    factory::create_xp_record_with(db, 100, 3, 0, 0, 100).await?;

    let repo = XpRepository::new(db);
    let top = repo.top(100, 2).await?;

    assert_eq!(top.len(), 2);
    assert_eq!(top[0].user_id, 2);
    assert_eq!(top[1].user_id, 3);

    Ok(())
}

/// Tests the leaderboard for a guild with no records.
///
/// Expected: empty vector, rows in other guilds don't leak in
#[tokio::test]
async fn empty_guild_has_empty_leaderboard() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record(db, 200, 1).await?;

    let repo = XpRepository::new(db);
    assert!(repo.top(100, 10).await?.is_empty());

    Ok(())
}
