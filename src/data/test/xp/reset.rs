use super::*;

/// Tests resetting an existing member's progress.
///
/// Expected: all progress columns zeroed, row retained
#[tokio::test]
async fn zeroes_existing_record() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 7, 120, 12000).await?;

    let repo = XpRepository::new(db);
    repo.reset(100, 1).await?;

    let record = repo.get(100, 1).await?.unwrap();
    assert_eq!(record.level, 0);
    assert_eq!(record.xp, 0);
    assert_eq!(record.total_xp, 0);

    Ok(())
}

/// Tests resetting a member with no ledger row.
///
/// Expected: Ok, no row created
#[tokio::test]
async fn reset_of_missing_record_is_noop() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    let repo = XpRepository::new(db);
    repo.reset(100, 1).await?;

    assert!(repo.get(100, 1).await?.is_none());

    Ok(())
}
