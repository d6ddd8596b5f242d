use super::*;

/// Tests fetching an existing ledger row.
///
/// Expected: Ok(Some) with the stored level and XP values
#[tokio::test]
async fn gets_existing_record() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 3, 250, 2000).await?;

    let repo = XpRepository::new(db);
    let record = repo.get(100, 1).await?;

    assert_eq!(
        record,
        Some(XpRecord {
            guild_id: 100,
            user_id: 1,
            level: 3,
            xp: 250,
            total_xp: 2000,
        })
    );

    Ok(())
}

/// Tests fetching a member with no ledger row.
///
/// Expected: Ok(None)
#[tokio::test]
async fn returns_none_for_missing_record() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    let repo = XpRepository::new(db);
    let record = repo.get(100, 1).await?;

    assert!(record.is_none());

    Ok(())
}

/// Tests that records are scoped per guild.
///
/// Expected: the same user in another guild has an independent row
#[tokio::test]
async fn scopes_records_per_guild() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 5, 0, 5000).await?;
    factory::create_xp_record_with(db, 200, 1, 1, 0, 300).await?;

    let repo = XpRepository::new(db);

    assert_eq!(repo.get(100, 1).await?.unwrap().level, 5);
    assert_eq!(repo.get(200, 1).await?.unwrap().level, 1);

    Ok(())
}
