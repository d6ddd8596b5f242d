use super::*;

/// Tests deleting a member's ledger row.
///
/// Expected: row removed, other members unaffected
#[tokio::test]
async fn deletes_only_the_target_member() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 2, 0, 900).await?;
    factory::create_xp_record_with(db, 100, 2, 3, 0, 1500).await?;

    let repo = XpRepository::new(db);
    repo.delete(100, 1).await?;

    assert!(repo.get(100, 1).await?.is_none());
    assert!(repo.get(100, 2).await?.is_some());

    Ok(())
}

/// Tests deleting a member with no ledger row.
///
/// Expected: Ok
#[tokio::test]
async fn delete_of_missing_record_is_noop() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    let repo = XpRepository::new(db);
    repo.delete(100, 1).await?;

    Ok(())
}
