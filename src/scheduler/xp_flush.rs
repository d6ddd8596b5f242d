//! Periodic XP flush scheduler.

use std::sync::Arc;

use serenity::all::{
    ChannelId, Colour, Context, CreateEmbed, CreateEmbedFooter, CreateMessage, GuildId, UserId,
};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::bot::start::BotState;
use crate::config::LevelingConfig;
use crate::error::AppError;
use crate::leveling::roles::sync_level_roles;
use crate::leveling::{flush_cycle, LevelUp};

/// Starts the XP flush scheduler.
///
/// Runs once a minute: drains the in-memory XP cache into the database and
/// dispatches role synchronization and congratulation messages for every
/// member who leveled up during the cycle.
///
/// # Arguments
/// - `ctx`: Gateway context for role updates and announcements
/// - `state`: Shared bot state holding the cache and database connection
pub async fn start_scheduler(ctx: Context, state: Arc<BotState>) -> Result<(), AppError> {
    let scheduler = JobScheduler::new().await?;

    let job_ctx = ctx.clone();
    let job_state = state.clone();

    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let ctx = job_ctx.clone();
        let state = job_state.clone();

        Box::pin(async move {
            run_flush(&state, &ctx).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("XP flush scheduler started");

    Ok(())
}

/// Runs one flush cycle and dispatches the resulting level-ups.
///
/// Each level-up is handled in its own task: role sync and announcement
/// failures are logged per member and never delay the next cycle.
pub async fn run_flush(state: &Arc<BotState>, ctx: &Context) {
    let level_ups = flush_cycle(&state.db, &state.xp_cache).await;
    if level_ups.is_empty() {
        return;
    }

    let config = state.leveling_config.current();
    for level_up in level_ups {
        let ctx = ctx.clone();
        let config = config.clone();

        tokio::spawn(async move {
            if let Err(e) = sync_level_roles(
                &ctx,
                level_up.guild_id,
                level_up.user_id,
                level_up.level,
                &config,
            )
            .await
            {
                error!(
                    guild_id = level_up.guild_id,
                    user_id = level_up.user_id,
                    "failed to sync reward roles: {e}"
                );
            }

            if let Err(e) = announce_level_up(&ctx, &level_up, &config).await {
                error!(
                    guild_id = level_up.guild_id,
                    user_id = level_up.user_id,
                    "failed to announce level up: {e}"
                );
            }
        });
    }
}

/// Posts the congratulation embed to the configured channel, falling back to
/// the guild's system channel. No channel at all means no announcement.
async fn announce_level_up(
    ctx: &Context,
    level_up: &LevelUp,
    config: &LevelingConfig,
) -> Result<(), AppError> {
    let channel_id = config
        .congratulations_channel_id
        .map(ChannelId::new)
        .or_else(|| {
            GuildId::new(level_up.guild_id)
                .to_guild_cached(&ctx.cache)
                .and_then(|guild| guild.system_channel_id)
        });
    let Some(channel_id) = channel_id else {
        return Ok(());
    };

    let mut embed = CreateEmbed::new()
        .title("Level up!")
        .description(format!(
            "<@{}> reached level {}!",
            level_up.user_id, level_up.level
        ))
        .footer(CreateEmbedFooter::new(format!(
            "Total XP: {}",
            level_up.total_xp
        )))
        .colour(Colour::GOLD);

    if let Ok(user) = UserId::new(level_up.user_id).to_user(ctx).await {
        embed = embed.thumbnail(user.face());
    }

    channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}
