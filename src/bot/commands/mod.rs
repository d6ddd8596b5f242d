//! Prefix command dispatch.

use std::sync::Arc;

use serenity::all::{Context, Message};
use tracing::warn;

use crate::bot::start::BotState;
use crate::error::AppError;
use crate::music::MusicError;

pub mod leveling;
pub mod music;

/// Routes a prefix-stripped message to its command handler.
///
/// Unknown commands are ignored silently. Handler errors are logged and
/// answered with a short user-facing message in the invoking channel.
pub async fn dispatch(state: &Arc<BotState>, ctx: &Context, message: &Message, input: &str) {
    let mut parts = input.trim().splitn(2, char::is_whitespace);
    let Some(command) = parts.next().filter(|part| !part.is_empty()) else {
        return;
    };
    let args = parts.next().unwrap_or("").trim();

    let result = match command.to_lowercase().as_str() {
        "level" | "rank" => leveling::level(state, ctx, message, args).await,
        "leaderboard" | "top" => leveling::leaderboard(state, ctx, message).await,
        "resetlevel" => leveling::reset_level(state, ctx, message, args).await,
        "levelrole" => leveling::level_role(state, ctx, message, args).await,
        "levelstack" => leveling::level_stack(state, ctx, message, args).await,
        "levelchannel" => leveling::level_channel(state, ctx, message, args).await,
        "play" | "p" => music::play(state, ctx, message, args).await,
        "skip" => music::skip(state, ctx, message).await,
        "stop" | "leave" => music::stop(state, ctx, message).await,
        "queue" | "q" => music::queue(state, ctx, message).await,
        "nowplaying" | "np" => music::now_playing(state, ctx, message).await,
        "loop" => music::toggle_loop(state, ctx, message).await,
        "volume" => music::volume(state, ctx, message, args).await,
        "clear" => music::clear(state, ctx, message).await,
        _ => return,
    };

    if let Err(err) = result {
        warn!(command, "command failed: {err}");
        let _ = message
            .channel_id
            .say(&ctx.http, user_facing_message(&err))
            .await;
    }
}

/// Short reply for a failed command. Music errors have actionable messages;
/// everything else gets a generic one.
fn user_facing_message(err: &AppError) -> String {
    match err {
        AppError::Music(MusicError::Resolve(_)) => {
            "Could not find anything to play for that.".to_string()
        }
        AppError::Music(music_err) => music_err.to_string(),
        _ => "Something went wrong running that command.".to_string(),
    }
}

/// Checks whether the author owns the guild or holds a role with Manage
/// Guild or Administrator.
pub(crate) fn has_manage_guild(ctx: &Context, message: &Message) -> bool {
    let Some(guild) = message.guild(&ctx.cache) else {
        return false;
    };
    if guild.owner_id == message.author.id {
        return true;
    }
    let Some(member) = &message.member else {
        return false;
    };
    member
        .roles
        .iter()
        .filter_map(|role_id| guild.roles.get(role_id))
        .any(|role| role.permissions.manage_guild() || role.permissions.administrator())
}

/// Parses the first token of `args` as a user mention (`<@123>`, `<@!123>`)
/// or a raw ID.
pub(crate) fn parse_user_arg(args: &str) -> Option<u64> {
    parse_id_token(args, "<@", "!")
}

/// Parses the first token of `args` as a role mention (`<@&123>`) or a raw
/// ID.
pub(crate) fn parse_role_arg(args: &str) -> Option<u64> {
    parse_id_token(args, "<@&", "")
}

/// Parses the first token of `args` as a channel mention (`<#123>`) or a raw
/// ID.
pub(crate) fn parse_channel_arg(args: &str) -> Option<u64> {
    parse_id_token(args, "<#", "")
}

fn parse_id_token(args: &str, prefix: &str, nick_marker: &str) -> Option<u64> {
    let token = args.split_whitespace().next()?;
    let token = token
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(token);
    let token = if nick_marker.is_empty() {
        token
    } else {
        token.strip_prefix(nick_marker).unwrap_or(token)
    };
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_mentions_and_raw_ids() {
        assert_eq!(parse_user_arg("<@123456>"), Some(123456));
        assert_eq!(parse_user_arg("<@!123456>"), Some(123456));
        assert_eq!(parse_user_arg("123456 trailing words"), Some(123456));
        assert_eq!(parse_user_arg("not-an-id"), None);
        assert_eq!(parse_user_arg(""), None);
    }

    #[test]
    fn parses_role_and_channel_mentions() {
        assert_eq!(parse_role_arg("<@&42>"), Some(42));
        assert_eq!(parse_role_arg("42"), Some(42));
        assert_eq!(parse_channel_arg("<#99>"), Some(99));
        assert_eq!(parse_channel_arg("99"), Some(99));
    }
}
