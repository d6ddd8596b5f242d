use migration::OnConflict;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::model::XpRecord;

/// Repository for the per-guild-per-user XP ledger.
pub struct XpRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> XpRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches a member's ledger row, if one exists.
    pub async fn get(&self, guild_id: u64, user_id: u64) -> Result<Option<XpRecord>, DbErr> {
        let record = entity::prelude::Users::find_by_id((user_id as i64, guild_id as i64))
            .one(self.db)
            .await?;

        Ok(record.map(XpRecord::from_entity))
    }

    /// Inserts or replaces a member's ledger row in a single statement.
    pub async fn upsert(&self, record: &XpRecord) -> Result<XpRecord, DbErr> {
        let model = entity::prelude::Users::insert(entity::users::ActiveModel {
            user_id: ActiveValue::Set(record.user_id as i64),
            guild_id: ActiveValue::Set(record.guild_id as i64),
            level: ActiveValue::Set(record.level),
            xp: ActiveValue::Set(record.xp),
            total_xp: ActiveValue::Set(record.total_xp),
        })
        .on_conflict(
            OnConflict::columns([
                entity::users::Column::UserId,
                entity::users::Column::GuildId,
            ])
            .update_columns([
                entity::users::Column::Level,
                entity::users::Column::Xp,
                entity::users::Column::TotalXp,
            ])
            .to_owned(),
        )
        .exec_with_returning(self.db)
        .await?;

        Ok(XpRecord::from_entity(model))
    }

    /// Returns a member's rank within a guild.
    ///
    /// Rank is 1 plus the number of members with strictly greater lifetime XP,
    /// so tied members share the same rank number.
    pub async fn rank(&self, guild_id: u64, total_xp: i64) -> Result<u64, DbErr> {
        let above = entity::prelude::Users::find()
            .filter(entity::users::Column::GuildId.eq(guild_id as i64))
            .filter(entity::users::Column::TotalXp.gt(total_xp))
            .count(self.db)
            .await?;

        Ok(above + 1)
    }

    /// Returns a guild's top members ordered by lifetime XP descending.
    pub async fn top(&self, guild_id: u64, limit: u64) -> Result<Vec<XpRecord>, DbErr> {
        let records = entity::prelude::Users::find()
            .filter(entity::users::Column::GuildId.eq(guild_id as i64))
            .order_by_desc(entity::users::Column::TotalXp)
            .limit(limit)
            .all(self.db)
            .await?;

        Ok(records.into_iter().map(XpRecord::from_entity).collect())
    }

    /// Zeroes a member's level and XP. No-op if the member has no row.
    pub async fn reset(&self, guild_id: u64, user_id: u64) -> Result<(), DbErr> {
        entity::prelude::Users::update_many()
            .col_expr(entity::users::Column::Level, Expr::value(0))
            .col_expr(entity::users::Column::Xp, Expr::value(0i64))
            .col_expr(entity::users::Column::TotalXp, Expr::value(0i64))
            .filter(entity::users::Column::UserId.eq(user_id as i64))
            .filter(entity::users::Column::GuildId.eq(guild_id as i64))
            .exec(self.db)
            .await?;
        Ok(())
    }

    /// Removes a member's ledger row, typically after they leave the guild.
    pub async fn delete(&self, guild_id: u64, user_id: u64) -> Result<(), DbErr> {
        entity::prelude::Users::delete_many()
            .filter(entity::users::Column::UserId.eq(user_id as i64))
            .filter(entity::users::Column::GuildId.eq(guild_id as i64))
            .exec(self.db)
            .await?;
        Ok(())
    }
}
