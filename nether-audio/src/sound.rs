//! Sound and music instance traits
//!
//! Decoders produce these from a [`FileHandle`](crate::FileHandle). Every
//! operation that touches hardware receives the [`StreamPool`] explicitly;
//! instances never hold on to the audio system.

use std::time::Duration;

use crate::backend::VoiceId;
use crate::streams::StreamPool;

/// A fully decoded, short one-shot effect.
///
/// Plays on transient voices obtained with
/// [`StreamOwnership::Transient`](crate::StreamOwnership::Transient), so
/// several plays can overlap and a play may be dropped when the pool is busy.
pub trait Sound {
    /// Play at `volume` and `pitch` (1.0 = original speed), once or until
    /// stopped.
    ///
    /// Returns the voice used, or `None` when no voice was free and the
    /// request was dropped.
    fn play_with(
        &mut self,
        streams: &mut StreamPool,
        volume: f32,
        pitch: f32,
        looping: bool,
    ) -> Option<VoiceId>;

    /// Play once at `volume`
    fn play(&mut self, streams: &mut StreamPool, volume: f32) -> Option<VoiceId> {
        self.play_with(streams, volume, 1.0, false)
    }

    /// Play repeatedly at `volume` until stopped
    fn play_looped(&mut self, streams: &mut StreamPool, volume: f32) -> Option<VoiceId> {
        self.play_with(streams, volume, 1.0, true)
    }

    /// Stop every voice currently playing this sound
    fn stop(&mut self, streams: &mut StreamPool);

    /// Length of the decoded audio
    fn duration(&self) -> Duration;

    /// Release the sound's buffers.
    ///
    /// Implementations call [`StreamPool::free_buffer`] before deleting a
    /// buffer. A sound dropped without `dispose` keeps its buffers until the
    /// backend shuts down.
    fn dispose(self: Box<Self>, streams: &mut StreamPool);
}

/// Long-running streamed playback.
///
/// Owns one voice exclusively while playing and must be ticked with
/// [`Music::update`] every frame to keep its queue fed.
pub trait Music {
    /// Start, or resume after a pause
    fn play(&mut self, streams: &mut StreamPool);

    /// Pause, keeping the voice and position
    fn pause(&mut self, streams: &mut StreamPool);

    /// Stop, release the voice and rewind to the start
    fn stop(&mut self, streams: &mut StreamPool);

    /// Whether playback is active (not paused, not stopped)
    fn is_playing(&self) -> bool;

    /// Restart from the beginning when the stream ends
    fn set_looping(&mut self, looping: bool);

    /// Whether the stream restarts when it ends
    fn is_looping(&self) -> bool;

    /// Set gain (1.0 = unity)
    fn set_volume(&mut self, streams: &mut StreamPool, volume: f32);

    /// Current gain
    fn volume(&self) -> f32;

    /// Playback time rendered so far
    fn position(&self) -> Duration;

    /// Per-frame maintenance: refill streaming buffers, detect the natural
    /// end of the stream and apply the loop policy
    fn update(&mut self, streams: &mut StreamPool);

    /// Stop and release every hardware resource
    fn dispose(self: Box<Self>, streams: &mut StreamPool);
}
