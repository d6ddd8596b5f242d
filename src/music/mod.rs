//! Music playback subsystem.
//!
//! Each guild gets an ordered queue of resolved tracks and a small state
//! machine driving the voice connection: join, stream the current track,
//! advance on completion or skip, and disconnect after an idle timeout once
//! the queue drains. The [`Player`] owns all per-guild state and serializes
//! every advance decision behind a per-guild lock; the actual audio I/O sits
//! behind the [`AudioSink`] trait so the engine can be driven in tests
//! without a voice connection.

pub mod player;
pub mod queue;
pub mod resolver;
pub mod track;
pub mod voice;

pub use player::{AudioSink, NowPlayingNotice, Player, PlayerEvent, QueueSnapshot};
pub use queue::PlayerStatus;
pub use resolver::{ResolveError, TrackResolver, YtDlpResolver};
pub use track::Track;

use thiserror::Error;

/// Maximum playback volume, 150%.
pub const MAX_VOLUME: f32 = 1.5;

#[derive(Debug, Error)]
pub enum MusicError {
    #[error("failed to resolve track: {0}")]
    Resolve(#[from] ResolveError),
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error("failed to join voice channel: {0}")]
    Join(#[from] songbird::error::JoinError),
    #[error("nothing is playing")]
    NothingPlaying,
    #[error("volume must be between 0% and 150%")]
    VolumeOutOfRange,
    #[error("audio control failed: {0}")]
    Control(#[from] songbird::error::ControlError),
}
