use super::*;

/// Tests the strictly-greater rank computation, including ties.
///
/// With totals [100, 100, 50], both leaders share rank 1 and the third
/// member ranks 3.
#[tokio::test]
async fn tied_members_share_rank() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 0, 0, 100).await?;
    factory::create_xp_record_with(db, 100, 2, 0, 0, 100).await?;
    factory::create_xp_record_with(db, 100, 3, 0, 0, 50).await?;

    let repo = XpRepository::new(db);

    assert_eq!(repo.rank(100, 100).await?, 1);
    assert_eq!(repo.rank(100, 50).await?, 3);

    Ok(())
}

/// Tests that rank only counts members of the same guild.
///
/// Expected: members of other guilds don't affect the rank
#[tokio::test]
async fn rank_is_scoped_per_guild() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 0, 0, 100).await?;
    factory::create_xp_record_with(db, 200, 2, 0, 0, 9000).await?;

    let repo = XpRepository::new(db);
    assert_eq!(repo.rank(100, 100).await?, 1);

    Ok(())
}

/// Tests rank for a member with no XP in an empty guild.
///
/// Expected: rank 1
#[tokio::test]
async fn rank_in_empty_guild_is_one() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    let repo = XpRepository::new(db);
    assert_eq!(repo.rank(100, 0).await?, 1);

    Ok(())
}
