//! XP ledger factory for creating test rows in the `users` table.

use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, DbErr};

/// Creates an XP ledger row with all progress fields zeroed.
///
/// # Arguments
/// - `db` - Database connection
/// - `guild_id` - Discord guild ID
/// - `user_id` - Discord user ID
///
/// # Returns
/// - `Ok(Model)` - The created row at level 0 with no XP
/// - `Err(DbErr)` - Database error during insert
pub async fn create_xp_record(
    db: &DatabaseConnection,
    guild_id: u64,
    user_id: u64,
) -> Result<entity::users::Model, DbErr> {
    create_xp_record_with(db, guild_id, user_id, 0, 0, 0).await
}

/// Creates an XP ledger row with explicit level and XP values.
///
/// # Arguments
/// - `db` - Database connection
/// - `guild_id` - Discord guild ID
/// - `user_id` - Discord user ID
/// - `level` - Current level
/// - `xp` - XP accumulated within the current level
/// - `total_xp` - Lifetime XP total
///
/// # Returns
/// - `Ok(Model)` - The created row
/// - `Err(DbErr)` - Database error during insert
pub async fn create_xp_record_with(
    db: &DatabaseConnection,
    guild_id: u64,
    user_id: u64,
    level: i32,
    xp: i64,
    total_xp: i64,
) -> Result<entity::users::Model, DbErr> {
    entity::users::ActiveModel {
        user_id: ActiveValue::Set(user_id as i64),
        guild_id: ActiveValue::Set(guild_id as i64),
        level: ActiveValue::Set(level),
        xp: ActiveValue::Set(xp),
        total_xp: ActiveValue::Set(total_xp),
    }
    .insert(db)
    .await
}
