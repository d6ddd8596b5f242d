use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(big_integer(Users::UserId))
                    .col(big_integer(Users::GuildId))
                    .col(integer(Users::Level).default(0))
                    .col(big_integer(Users::Xp).default(0))
                    .col(big_integer(Users::TotalXp).default(0))
                    .primary_key(
                        Index::create()
                            .col(Users::UserId)
                            .col(Users::GuildId),
                    )
                    .to_owned(),
            )
            .await?;

        // Rank and leaderboard queries scan a guild ordered by lifetime XP.
        manager
            .create_index(
                Index::create()
                    .name("idx_users_guild_total_xp")
                    .table(Users::Table)
                    .col(Users::GuildId)
                    .col(Users::TotalXp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    UserId,
    GuildId,
    Level,
    Xp,
    TotalXp,
}
