//! Leveling commands: progress lookup, leaderboard, and admin configuration.

use std::sync::Arc;

use serenity::all::{Colour, Context, CreateEmbed, CreateMessage, Message};

use crate::bot::commands::{has_manage_guild, parse_channel_arg, parse_role_arg, parse_user_arg};
use crate::bot::start::BotState;
use crate::data::XpRepository;
use crate::error::AppError;
use crate::leveling::roles::sync_level_roles;
use crate::leveling::xp_required_for;

/// `!level [member]` - shows a member's level, progress, and guild rank.
pub async fn level(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let target = parse_user_arg(args).unwrap_or_else(|| message.author.id.get());

    let repository = XpRepository::new(&state.db);
    let Some(record) = repository.get(guild_id.get(), target).await? else {
        message
            .channel_id
            .say(&ctx.http, "No XP earned yet. Say something first!")
            .await?;
        return Ok(());
    };
    let rank = repository.rank(guild_id.get(), record.total_xp).await?;

    let required = xp_required_for(record.level + 1);
    let embed = CreateEmbed::new()
        .title(format!("Level {}", record.level))
        .description(format!("<@{target}>"))
        .field(
            "Progress",
            format!(
                "{} {} / {} XP",
                progress_bar(record.xp, required),
                record.xp,
                required
            ),
            false,
        )
        .field("Total XP", record.total_xp.to_string(), true)
        .field("Rank", format!("#{rank}"), true)
        .colour(Colour::BLURPLE);

    message
        .channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Ten-segment bar showing progress toward the next level.
fn progress_bar(xp: i64, required: i64) -> String {
    const SEGMENTS: i64 = 10;
    let filled = if required <= 0 {
        SEGMENTS
    } else {
        (xp * SEGMENTS / required).clamp(0, SEGMENTS)
    };
    let mut bar = String::new();
    for index in 0..SEGMENTS {
        bar.push(if index < filled { '▰' } else { '▱' });
    }
    bar
}

/// `!leaderboard` - shows the guild's top ten members by lifetime XP.
pub async fn leaderboard(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let repository = XpRepository::new(&state.db);
    let top = repository.top(guild_id.get(), 10).await?;

    if top.is_empty() {
        message
            .channel_id
            .say(&ctx.http, "Nobody has earned XP in this server yet.")
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = top
        .iter()
        .enumerate()
        .map(|(index, record)| {
            format!(
                "**{}.** <@{}> (level {}, {} XP)",
                index + 1,
                record.user_id,
                record.level,
                record.total_xp
            )
        })
        .collect();

    let embed = CreateEmbed::new()
        .title("Leaderboard")
        .description(lines.join("\n"))
        .colour(Colour::GOLD);

    message
        .channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// `!resetlevel <member>` - zeroes a member's progress. Requires Manage
/// Guild.
pub async fn reset_level(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    if !has_manage_guild(ctx, message) {
        message
            .channel_id
            .say(&ctx.http, "You need the Manage Server permission for that.")
            .await?;
        return Ok(());
    }
    let Some(target) = parse_user_arg(args) else {
        message
            .channel_id
            .say(&ctx.http, "Usage: `resetlevel <member>`")
            .await?;
        return Ok(());
    };

    // Drop any not-yet-flushed XP along with the persisted progress.
    state.xp_cache.remove(guild_id.get(), target);
    XpRepository::new(&state.db)
        .reset(guild_id.get(), target)
        .await?;

    let config = state.leveling_config.current();
    sync_level_roles(ctx, guild_id.get(), target, 0, &config).await?;

    message
        .channel_id
        .say(&ctx.http, format!("Reset all progress for <@{target}>."))
        .await?;
    Ok(())
}

/// `!levelrole` - lists reward roles; `!levelrole set <level> <role>` sets
/// one; `!levelrole remove <level>` removes one. Requires Manage Guild.
pub async fn level_role(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    if message.guild_id.is_none() {
        return Ok(());
    }
    if !has_manage_guild(ctx, message) {
        message
            .channel_id
            .say(&ctx.http, "You need the Manage Server permission for that.")
            .await?;
        return Ok(());
    }

    if args.is_empty() {
        let config = state.leveling_config.current();
        let reply = if config.level_roles.is_empty() {
            "No reward roles configured. Use `levelrole set <level> <role>` to add one."
                .to_string()
        } else {
            config
                .level_roles
                .iter()
                .map(|(level, role)| format!("Level {level}: <@&{role}>"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        message.channel_id.say(&ctx.http, reply).await?;
        return Ok(());
    }

    if let Some(rest) = args.strip_prefix("remove") {
        let Ok(level) = rest.trim().parse::<i32>() else {
            message
                .channel_id
                .say(&ctx.http, "Usage: `levelrole remove <level>`")
                .await?;
            return Ok(());
        };
        state
            .leveling_config
            .update(|config| {
                config.level_roles.remove(&level);
            })?;
        message
            .channel_id
            .say(&ctx.http, format!("Removed the reward role for level {level}."))
            .await?;
        return Ok(());
    }

    // "set" is optional: `levelrole set 5 @role` and `levelrole 5 @role`
    // both work.
    let rest = args.strip_prefix("set").map(str::trim).unwrap_or(args);
    let mut parts = rest.split_whitespace();
    let level = parts.next().and_then(|part| part.parse::<i32>().ok());
    let role = parts.next().and_then(parse_role_arg);
    let (Some(level), Some(role)) = (level, role) else {
        message
            .channel_id
            .say(&ctx.http, "Usage: `levelrole set <level> <role>`")
            .await?;
        return Ok(());
    };
    if level < 1 {
        message
            .channel_id
            .say(&ctx.http, "The level must be 1 or higher.")
            .await?;
        return Ok(());
    }

    state.leveling_config.update(|config| {
        config.level_roles.insert(level, role);
    })?;
    message
        .channel_id
        .say(
            &ctx.http,
            format!("Members reaching level {level} now receive <@&{role}>."),
        )
        .await?;
    Ok(())
}

/// `!levelstack [on|off]` - chooses between stacking all earned reward roles
/// and keeping only the highest. With no argument, toggles. Requires Manage
/// Guild.
pub async fn level_stack(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    if message.guild_id.is_none() {
        return Ok(());
    }
    if !has_manage_guild(ctx, message) {
        message
            .channel_id
            .say(&ctx.http, "You need the Manage Server permission for that.")
            .await?;
        return Ok(());
    }

    let desired = match args.to_lowercase().as_str() {
        "on" => Some(true),
        "off" => Some(false),
        "" => None,
        _ => {
            message
                .channel_id
                .say(&ctx.http, "Usage: `levelstack [on|off]`")
                .await?;
            return Ok(());
        }
    };

    let config = state.leveling_config.update(|config| {
        config.stack_roles = desired.unwrap_or(!config.stack_roles);
    })?;

    let reply = if config.stack_roles {
        "Members now keep every reward role they earn."
    } else {
        "Members now keep only their highest reward role."
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

/// `!levelchannel <block|allow> <channel>` - manages the set of channels in
/// which no XP is awarded. Requires Manage Guild.
pub async fn level_channel(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    if message.guild_id.is_none() {
        return Ok(());
    }
    if !has_manage_guild(ctx, message) {
        message
            .channel_id
            .say(&ctx.http, "You need the Manage Server permission for that.")
            .await?;
        return Ok(());
    }

    let mut parts = args.splitn(2, char::is_whitespace);
    let action = parts.next().unwrap_or("").to_lowercase();
    let channel = parts.next().and_then(parse_channel_arg);

    let (Some(channel), true) = (channel, action == "block" || action == "allow") else {
        message
            .channel_id
            .say(&ctx.http, "Usage: `levelchannel <block|allow> <channel>`")
            .await?;
        return Ok(());
    };

    let reply = if action == "block" {
        state.leveling_config.update(|config| {
            config.blacklisted_channels.insert(channel);
        })?;
        format!("No XP will be awarded in <#{channel}>.")
    } else {
        state.leveling_config.update(|config| {
            config.blacklisted_channels.remove(&channel);
        })?;
        format!("XP is awarded in <#{channel}> again.")
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::progress_bar;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0, 200), "▱▱▱▱▱▱▱▱▱▱");
        assert_eq!(progress_bar(100, 200), "▰▰▰▰▰▱▱▱▱▱");
        assert_eq!(progress_bar(199, 200), "▰▰▰▰▰▰▰▰▰▱");
        assert_eq!(progress_bar(200, 200), "▰▰▰▰▰▰▰▰▰▰");
    }
}
