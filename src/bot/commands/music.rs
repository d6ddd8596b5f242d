//! Music commands driving the playback engine.

use std::sync::Arc;

use serenity::all::{Colour, Context, CreateEmbed, CreateMessage, Message};

use crate::bot::start::BotState;
use crate::error::AppError;
use crate::music::track::format_duration;
use crate::music::Track;

/// `!play <url or search>` - queues tracks, joining the author's voice
/// channel if nothing is playing yet.
pub async fn play(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    if args.is_empty() {
        message
            .channel_id
            .say(&ctx.http, "Usage: `play <url or search terms>`")
            .await?;
        return Ok(());
    }

    // Copied out of the cache ref before any await.
    let voice_channel = message.guild(&ctx.cache).and_then(|guild| {
        guild
            .voice_states
            .get(&message.author.id)
            .and_then(|voice_state| voice_state.channel_id)
    });
    let Some(voice_channel) = voice_channel else {
        message
            .channel_id
            .say(&ctx.http, "Join a voice channel first.")
            .await?;
        return Ok(());
    };

    let tracks = state
        .player
        .play(
            guild_id.get(),
            voice_channel.get(),
            message.channel_id.get(),
            args,
            message.author.id.get(),
        )
        .await?;

    let reply = match tracks.as_slice() {
        [track] => format!("Queued **{}**.", track.title),
        tracks => format!("Queued {} tracks.", tracks.len()),
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

/// `!skip` - stops the current track and advances the queue.
pub async fn skip(state: &Arc<BotState>, ctx: &Context, message: &Message) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let skipped = state.player.skip(guild_id.get()).await?;
    message
        .channel_id
        .say(&ctx.http, format!("Skipped **{}**.", skipped.title))
        .await?;
    Ok(())
}

/// `!stop` - clears the queue and leaves the voice channel.
pub async fn stop(state: &Arc<BotState>, ctx: &Context, message: &Message) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    state.player.stop(guild_id.get()).await?;
    message
        .channel_id
        .say(&ctx.http, "Stopped playback and left the channel.")
        .await?;
    Ok(())
}

/// `!queue` - shows the current track and the next ten queued tracks.
pub async fn queue(state: &Arc<BotState>, ctx: &Context, message: &Message) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let snapshot = state.player.snapshot(guild_id.get()).await;
    let Some(current) = &snapshot.current else {
        message.channel_id.say(&ctx.http, "Nothing is playing.").await?;
        return Ok(());
    };

    let mut description = format!("**Now playing:** {}\n", track_line(current));
    if snapshot.upcoming.is_empty() {
        description.push_str("\nThe queue is empty.");
    } else {
        description.push_str("\n**Up next:**\n");
        for (index, track) in snapshot.upcoming.iter().take(10).enumerate() {
            description.push_str(&format!("{}. {}\n", index + 1, track_line(track)));
        }
        if snapshot.upcoming.len() > 10 {
            description.push_str(&format!("...and {} more\n", snapshot.upcoming.len() - 10));
        }
    }

    let mut embed = CreateEmbed::new()
        .title("Queue")
        .description(description)
        .footer(serenity::all::CreateEmbedFooter::new(format!(
            "Loop: {} | Volume: {}%",
            if snapshot.looping { "on" } else { "off" },
            (snapshot.volume * 100.0).round() as u32
        )))
        .colour(Colour::BLURPLE);
    if let Some(thumbnail) = &current.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    message
        .channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// `!nowplaying` - shows the current track.
pub async fn now_playing(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let snapshot = state.player.snapshot(guild_id.get()).await;
    let reply = match &snapshot.current {
        Some(track) => format!("Now playing: {}", track_line(track)),
        None => "Nothing is playing.".to_string(),
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

/// `!loop` - toggles replaying the current track.
pub async fn toggle_loop(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let looping = state.player.toggle_loop(guild_id.get()).await;
    let reply = if looping {
        "Looping the current track."
    } else {
        "Loop disabled."
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

/// `!volume [percent]` - shows or sets the playback volume (0-150).
pub async fn volume(
    state: &Arc<BotState>,
    ctx: &Context,
    message: &Message,
    args: &str,
) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    if args.is_empty() {
        let snapshot = state.player.snapshot(guild_id.get()).await;
        message
            .channel_id
            .say(
                &ctx.http,
                format!("Volume is {}%.", (snapshot.volume * 100.0).round() as u32),
            )
            .await?;
        return Ok(());
    }

    let Ok(percent) = args.trim_end_matches('%').parse::<u32>() else {
        message
            .channel_id
            .say(&ctx.http, "Usage: `volume <0-150>`")
            .await?;
        return Ok(());
    };

    state
        .player
        .set_volume(guild_id.get(), percent as f32 / 100.0)
        .await?;
    message
        .channel_id
        .say(&ctx.http, format!("Volume set to {percent}%."))
        .await?;
    Ok(())
}

/// `!clear` - removes every queued track, leaving the current one playing.
pub async fn clear(state: &Arc<BotState>, ctx: &Context, message: &Message) -> Result<(), AppError> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let removed = state.player.clear(guild_id.get()).await;
    let reply = match removed {
        0 => "The queue is already empty.".to_string(),
        1 => "Removed 1 track from the queue.".to_string(),
        n => format!("Removed {n} tracks from the queue."),
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

fn track_line(track: &Track) -> String {
    match track.duration {
        Some(duration) => format!(
            "[{}]({}) ({})",
            track.title,
            track.url,
            format_duration(duration)
        ),
        None => format!("[{}]({})", track.title, track.url),
    }
}
