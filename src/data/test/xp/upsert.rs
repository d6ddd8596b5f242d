use super::*;

/// Tests inserting a new ledger row via upsert.
///
/// Expected: Ok with the row created
#[tokio::test]
async fn inserts_new_record() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    let repo = XpRepository::new(db);
    let record = XpRecord {
        guild_id: 100,
        user_id: 1,
        level: 2,
        xp: 50,
        total_xp: 900,
    };

    let stored = repo.upsert(&record).await?;
    assert_eq!(stored, record);

    let count = entity::prelude::Users::find().count(db).await?;
    assert_eq!(count, 1);

    Ok(())
}

/// Tests that upserting an existing key replaces the progress columns.
///
/// Expected: Ok with a single row carrying the new values
#[tokio::test]
async fn updates_existing_record() -> Result<(), DbErr> {
    let test = TestBuilder::new().with_leveling_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();

    factory::create_xp_record_with(db, 100, 1, 1, 10, 400).await?;

    let repo = XpRepository::new(db);
    let updated = repo
        .upsert(&XpRecord {
            guild_id: 100,
            user_id: 1,
            level: 2,
            xp: 0,
            total_xp: 750,
        })
        .await?;

    assert_eq!(updated.level, 2);
    assert_eq!(updated.total_xp, 750);

    let count = entity::prelude::Users::find().count(db).await?;
    assert_eq!(count, 1);

    Ok(())
}
