use sea_orm::entity::prelude::*;

/// Per-guild-per-user XP ledger row.
///
/// `xp` is the amount accumulated within the current level; `total_xp` is the
/// monotonically non-decreasing lifetime total used for ranking.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    pub level: i32,
    pub xp: i64,
    pub total_xp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
