//! Hardware audio binding
//!
//! The core never mixes audio itself. Everything it knows about playback
//! comes from polling an [`AudioBackend`]: voices are created once at startup,
//! their state is queried on demand, and buffers are bound or queued onto them.
//! There are no completion callbacks, so every allocation decision is made
//! from a point-in-time snapshot.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Hardware voice ("stream") handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u32);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hardware-resident audio payload handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback state of a voice, as reported by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    /// Never played since creation (or since a rewind)
    #[default]
    Initial,
    /// Rendering its bound buffer or queue
    Playing,
    /// Halted, resumable from the same position
    Paused,
    /// Finished or explicitly stopped
    Stopped,
}

impl VoiceState {
    /// Whether the voice can be handed to a new allocation
    ///
    /// Anything that is neither playing nor paused is reclaimable.
    pub fn is_reclaimable(self) -> bool {
        !matches!(self, VoiceState::Playing | VoiceState::Paused)
    }
}

/// Layout of 16-bit PCM data uploaded into a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// 1 (mono) or 2 (stereo, interleaved)
    pub channels: u16,
    /// Frames per second
    pub sample_rate: u32,
}

impl PcmFormat {
    /// Mono format at the given rate
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            channels: 1,
            sample_rate,
        }
    }

    /// Interleaved stereo format at the given rate
    pub const fn stereo(sample_rate: u32) -> Self {
        Self {
            channels: 2,
            sample_rate,
        }
    }

    /// Number of whole frames in `samples` interleaved samples
    pub fn frames(&self, samples: usize) -> usize {
        samples / self.channels.max(1) as usize
    }
}

/// Listener placement applied to the audio context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    /// Listener position
    #[serde(default = "default_position")]
    pub position: Vec3,
    /// Listener velocity (doppler)
    #[serde(default = "default_velocity")]
    pub velocity: Vec3,
    /// Facing direction
    #[serde(default = "default_at")]
    pub at: Vec3,
    /// Up axis
    #[serde(default = "default_up")]
    pub up: Vec3,
}

fn default_position() -> Vec3 {
    Vec3::ZERO
}
fn default_velocity() -> Vec3 {
    Vec3::ZERO
}
fn default_at() -> Vec3 {
    Vec3::NEG_Z
}
fn default_up() -> Vec3 {
    Vec3::Y
}

impl Default for Listener {
    /// At the origin, motionless, facing into the scene (-Z) with +Y up
    fn default() -> Self {
        Self {
            position: default_position(),
            velocity: default_velocity(),
            at: default_at(),
            up: default_up(),
        }
    }
}

impl Listener {
    /// Orientation as the six floats `[at.x, at.y, at.z, up.x, up.y, up.z]`
    pub fn orientation(&self) -> [f32; 6] {
        [
            self.at.x, self.at.y, self.at.z, self.up.x, self.up.y, self.up.z,
        ]
    }
}

/// Hardware audio binding consumed by the core.
///
/// Implementations wrap a real audio API (an OpenAL-style voice/buffer model)
/// or simulate one, as [`HeadlessBackend`](crate::headless::HeadlessBackend)
/// does. All calls are made from the owning thread.
///
/// Operations on unknown voice handles are ignored; state queries on unknown
/// voices report [`VoiceState::Stopped`].
pub trait AudioBackend {
    /// Bring up the audio context.
    ///
    /// Called exactly once, before any other operation.
    fn init(&mut self) -> Result<(), BackendError>;

    /// Tear down the audio context. Called exactly once, last.
    fn shutdown(&mut self);

    /// Allocate a hardware voice
    fn create_voice(&mut self) -> Result<VoiceId, BackendError>;

    /// Release a hardware voice
    fn delete_voice(&mut self, voice: VoiceId);

    /// Poll the voice's current playback state
    fn voice_state(&self, voice: VoiceId) -> VoiceState;

    /// Start or resume playback
    fn play(&mut self, voice: VoiceId);

    /// Pause playback, keeping the position
    fn pause(&mut self, voice: VoiceId);

    /// Stop playback
    fn stop(&mut self, voice: VoiceId);

    /// Buffer statically bound to the voice, if any
    fn bound_buffer(&self, voice: VoiceId) -> Option<BufferId>;

    /// Bind a buffer to the voice, or unbind with `None`.
    ///
    /// Either way the voice's streaming queue is cleared.
    fn bind_buffer(&mut self, voice: VoiceId, buffer: Option<BufferId>);

    /// Set voice gain (1.0 = unity)
    fn set_gain(&mut self, voice: VoiceId, gain: f32);

    /// Set voice pitch multiplier (1.0 = unchanged)
    fn set_pitch(&mut self, voice: VoiceId, pitch: f32);

    /// Loop the statically bound buffer
    fn set_looping(&mut self, voice: VoiceId, looping: bool);

    /// Allocate an empty buffer
    fn create_buffer(&mut self) -> Result<BufferId, BackendError>;

    /// Upload interleaved 16-bit PCM into a buffer, replacing its contents
    fn buffer_data(
        &mut self,
        buffer: BufferId,
        format: PcmFormat,
        samples: &[i16],
    ) -> Result<(), BackendError>;

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Append buffers to the voice's streaming queue
    fn queue_buffers(&mut self, voice: VoiceId, buffers: &[BufferId]);

    /// Remove and return the buffers the voice has finished rendering
    fn unqueue_processed(&mut self, voice: VoiceId) -> Vec<BufferId>;

    /// Number of buffers currently queued (processed or not)
    fn queued_buffers(&self, voice: VoiceId) -> usize;

    /// Apply listener position, velocity and orientation
    fn set_listener(&mut self, listener: &Listener);
}
