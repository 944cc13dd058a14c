//! Music tracking and the per-frame update loop
//!
//! Streamed music has to be ticked every frame so it can refill its buffer
//! queue. The tracker keeps every live music instance in creation order and
//! drives them from [`AudioSystem::update`](crate::AudioSystem::update). There
//! is no timer or background thread: if the application stops calling
//! `update`, streamed playback starves.

use std::fmt;
use std::time::Duration;

use crate::sound::Music;
use crate::streams::StreamPool;

/// Handle to a tracked music instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MusicId(u32);

impl fmt::Display for MusicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "music#{}", self.0)
    }
}

/// Ordered collection of live music instances
#[derive(Default)]
pub(crate) struct MusicTracker {
    next_id: u32,
    tracked: Vec<(MusicId, Box<dyn Music>)>,
}

impl MusicTracker {
    /// Start tracking `music`, after every instance already tracked
    pub(crate) fn track(&mut self, music: Box<dyn Music>) -> MusicId {
        self.next_id += 1;
        let id = MusicId(self.next_id);
        self.tracked.push((id, music));
        id
    }

    /// Stop tracking `id`, keeping the order of the rest
    pub(crate) fn untrack(&mut self, id: MusicId) -> Option<Box<dyn Music>> {
        let index = self.tracked.iter().position(|(tracked, _)| *tracked == id)?;
        Some(self.tracked.remove(index).1)
    }

    pub(crate) fn get_mut(&mut self, id: MusicId) -> Option<&mut (dyn Music + 'static)> {
        self.tracked
            .iter_mut()
            .find(|(tracked, _)| *tracked == id)
            .map(|(_, music)| music.as_mut())
    }

    /// Tick every tracked instance in tracking order
    pub(crate) fn update(&mut self, streams: &mut StreamPool) {
        for (_, music) in &mut self.tracked {
            music.update(streams);
        }
    }

    /// Remove every instance, oldest first
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (MusicId, Box<dyn Music>)> + '_ {
        self.tracked.drain(..)
    }

    pub(crate) fn ids(&self) -> Vec<MusicId> {
        self.tracked.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tracked.len()
    }
}

/// Borrowed control surface for one tracked music instance.
///
/// Obtained from [`AudioSystem::music`](crate::AudioSystem::music); wires the
/// stream pool into each call.
pub struct MusicControl<'a> {
    pub(crate) music: &'a mut dyn Music,
    pub(crate) streams: &'a mut StreamPool,
}

impl MusicControl<'_> {
    /// Start, or resume after a pause
    pub fn play(&mut self) {
        self.music.play(self.streams);
    }

    /// Pause, keeping the voice
    pub fn pause(&mut self) {
        self.music.pause(self.streams);
    }

    /// Stop and rewind, releasing the voice
    pub fn stop(&mut self) {
        self.music.stop(self.streams);
    }

    /// Whether playback is active
    pub fn is_playing(&self) -> bool {
        self.music.is_playing()
    }

    /// Restart from the beginning when the stream ends
    pub fn set_looping(&mut self, looping: bool) {
        self.music.set_looping(looping);
    }

    /// Whether the stream restarts when it ends
    pub fn is_looping(&self) -> bool {
        self.music.is_looping()
    }

    /// Set gain (1.0 = unity)
    pub fn set_volume(&mut self, volume: f32) {
        self.music.set_volume(self.streams, volume);
    }

    /// Current gain
    pub fn volume(&self) -> f32 {
        self.music.volume()
    }

    /// Playback time rendered so far
    pub fn position(&self) -> Duration {
        self.music.position()
    }
}
