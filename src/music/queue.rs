//! Per-guild playback state.

use std::collections::VecDeque;

use crate::music::track::Track;

/// Playback lifecycle for one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// No voice session.
    Idle,
    /// Joining a voice endpoint.
    Connecting,
    /// Streaming the current track.
    Playing,
    /// Queue drained; connected and waiting for a new track or the idle
    /// timeout.
    Draining,
}

/// Mutable playback state for one guild, guarded by the player's per-guild
/// lock.
#[derive(Debug)]
pub struct GuildPlayerState {
    pub queue: VecDeque<Track>,
    pub current: Option<Track>,
    /// Replays `current` indefinitely when set.
    pub looping: bool,
    pub volume: f32,
    pub status: PlayerStatus,
    /// Generation counter for the idle-disconnect timer. Bumping it cancels
    /// any timer scheduled under an earlier value.
    pub idle_epoch: u64,
    /// Generation counter for sink plays. Completion events carrying an older
    /// value are stale and discarded.
    pub play_seq: u64,
    /// Text channel playback notices go to, from the most recent play command.
    pub text_channel: Option<u64>,
}

impl GuildPlayerState {
    pub fn new(volume: f32) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            looping: false,
            volume,
            status: PlayerStatus::Idle,
            idle_epoch: 0,
            play_seq: 0,
            text_channel: None,
        }
    }

    /// Picks the track to stream next: the current track again when looping,
    /// otherwise the queue front.
    pub fn next_track(&mut self) -> Option<Track> {
        if self.looping {
            if let Some(current) = &self.current {
                return Some(current.clone());
            }
        }
        self.queue.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            duration: None,
            thumbnail: None,
            requested_by: 1,
        }
    }

    #[test]
    fn next_track_pops_queue_in_order() {
        let mut state = GuildPlayerState::new(0.5);
        state.queue.push_back(track("a"));
        state.queue.push_back(track("b"));

        assert_eq!(state.next_track().unwrap().title, "a");
        assert_eq!(state.next_track().unwrap().title, "b");
        assert!(state.next_track().is_none());
    }

    #[test]
    fn next_track_repeats_current_when_looping() {
        let mut state = GuildPlayerState::new(0.5);
        state.queue.push_back(track("b"));
        state.current = Some(track("a"));
        state.looping = true;

        assert_eq!(state.next_track().unwrap().title, "a");
        assert_eq!(state.next_track().unwrap().title, "a");
        // Queue is untouched while looping.
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn looping_with_no_current_falls_back_to_queue() {
        let mut state = GuildPlayerState::new(0.5);
        state.looping = true;
        state.queue.push_back(track("a"));

        assert_eq!(state.next_track().unwrap().title, "a");
    }
}
