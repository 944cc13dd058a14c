//! In-memory audio backend
//!
//! Simulates an OpenAL-style voice/buffer device without producing sound.
//! Voices only change state when told to (play/pause/stop) or when a test
//! drives them with [`HeadlessBackend::process`] / [`HeadlessBackend::finish`],
//! which makes playback completion fully deterministic.
//!
//! The backend is a cheap handle: clones share the same device, so a test can
//! keep one clone for inspection while the [`StreamPool`](crate::StreamPool)
//! owns another.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use hashbrown::HashMap;
use tracing::debug;

use crate::backend::{AudioBackend, BufferId, Listener, PcmFormat, VoiceId, VoiceState};
use crate::error::BackendError;

/// Shared in-memory device
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    inner: Rc<RefCell<Device>>,
}

/// Observable state of one simulated voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSnapshot {
    /// Current playback state
    pub state: VoiceState,
    /// Statically bound buffer
    pub buffer: Option<BufferId>,
    /// Buffers in the streaming queue (processed or not)
    pub queued: usize,
    /// Gain last set
    pub gain: f32,
    /// Pitch last set
    pub pitch: f32,
    /// Looping flag last set
    pub looping: bool,
}

#[derive(Default)]
struct Device {
    initialized: bool,
    shut_down: bool,
    init_failure: Option<String>,
    voice_limit: Option<usize>,
    buffer_limit: Option<usize>,
    next_voice: u32,
    next_buffer: u32,
    voices: HashMap<VoiceId, Voice>,
    buffers: HashMap<BufferId, Buffer>,
    listener: Option<Listener>,
}

struct Voice {
    state: VoiceState,
    buffer: Option<BufferId>,
    queue: VecDeque<Queued>,
    gain: f32,
    pitch: f32,
    looping: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            state: VoiceState::Initial,
            buffer: None,
            queue: VecDeque::new(),
            gain: 1.0,
            pitch: 1.0,
            looping: false,
        }
    }
}

impl Voice {
    fn has_pending(&self) -> bool {
        self.buffer.is_some() || self.queue.iter().any(|q| !q.processed)
    }
}

struct Queued {
    buffer: BufferId,
    processed: bool,
}

struct Buffer {
    format: Option<PcmFormat>,
    samples: Vec<i16>,
}

impl HeadlessBackend {
    /// Device with unlimited voices
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that refuses to create more than `limit` voices
    pub fn with_voice_limit(limit: usize) -> Self {
        let backend = Self::default();
        backend.inner.borrow_mut().voice_limit = Some(limit);
        backend
    }

    /// Device that refuses to hold more than `limit` buffers at once
    pub fn with_buffer_limit(limit: usize) -> Self {
        let backend = Self::default();
        backend.inner.borrow_mut().buffer_limit = Some(limit);
        backend
    }

    /// Device whose context initialization fails with `reason`
    pub fn failing_init(reason: impl Into<String>) -> Self {
        let backend = Self::default();
        backend.inner.borrow_mut().init_failure = Some(reason.into());
        backend
    }

    /// Force a voice into `state`, as if the hardware changed it
    pub fn set_state(&self, voice: VoiceId, state: VoiceState) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.state = state;
        }
    }

    /// Mark up to `count` queued buffers as rendered.
    ///
    /// A playing voice with nothing left to render stops. Returns how many
    /// buffers were marked.
    pub fn process(&self, voice: VoiceId, count: usize) -> usize {
        let mut device = self.inner.borrow_mut();
        let Some(v) = device.voices.get_mut(&voice) else {
            return 0;
        };
        let mut marked = 0;
        for queued in v.queue.iter_mut().filter(|q| !q.processed).take(count) {
            queued.processed = true;
            marked += 1;
        }
        if v.state == VoiceState::Playing && !v.has_pending() {
            v.state = VoiceState::Stopped;
        }
        marked
    }

    /// Render everything the voice has, ending in [`VoiceState::Stopped`]
    pub fn finish(&self, voice: VoiceId) {
        let mut device = self.inner.borrow_mut();
        if let Some(v) = device.voices.get_mut(&voice) {
            v.queue.iter_mut().for_each(|q| q.processed = true);
            v.state = VoiceState::Stopped;
        }
    }

    /// Snapshot of a live voice
    pub fn voice(&self, voice: VoiceId) -> Option<VoiceSnapshot> {
        self.inner.borrow().voices.get(&voice).map(|v| VoiceSnapshot {
            state: v.state,
            buffer: v.buffer,
            queued: v.queue.len(),
            gain: v.gain,
            pitch: v.pitch,
            looping: v.looping,
        })
    }

    /// Contents of a live buffer
    pub fn buffer_samples(&self, buffer: BufferId) -> Option<Vec<i16>> {
        self.inner
            .borrow()
            .buffers
            .get(&buffer)
            .map(|b| b.samples.clone())
    }

    /// Format of a live buffer's last upload
    pub fn buffer_format(&self, buffer: BufferId) -> Option<PcmFormat> {
        self.inner.borrow().buffers.get(&buffer).and_then(|b| b.format)
    }

    /// Number of voices created and not yet deleted
    pub fn live_voices(&self) -> usize {
        self.inner.borrow().voices.len()
    }

    /// Number of buffers created and not yet deleted
    pub fn live_buffers(&self) -> usize {
        self.inner.borrow().buffers.len()
    }

    /// Listener last applied
    pub fn listener(&self) -> Option<Listener> {
        self.inner.borrow().listener
    }

    /// Whether `init` succeeded
    pub fn is_initialized(&self) -> bool {
        self.inner.borrow().initialized
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.inner.borrow().shut_down
    }
}

impl AudioBackend for HeadlessBackend {
    fn init(&mut self) -> Result<(), BackendError> {
        let mut device = self.inner.borrow_mut();
        if let Some(reason) = &device.init_failure {
            return Err(BackendError::InitFailed(reason.clone()));
        }
        device.initialized = true;
        debug!("Headless audio device initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut device = self.inner.borrow_mut();
        device.voices.clear();
        device.buffers.clear();
        device.initialized = false;
        device.shut_down = true;
        debug!("Headless audio device shut down");
    }

    fn create_voice(&mut self) -> Result<VoiceId, BackendError> {
        let mut device = self.inner.borrow_mut();
        if device
            .voice_limit
            .is_some_and(|limit| device.voices.len() >= limit)
        {
            return Err(BackendError::VoiceUnavailable);
        }
        device.next_voice += 1;
        let id = VoiceId(device.next_voice);
        device.voices.insert(id, Voice::default());
        Ok(id)
    }

    fn delete_voice(&mut self, voice: VoiceId) {
        self.inner.borrow_mut().voices.remove(&voice);
    }

    fn voice_state(&self, voice: VoiceId) -> VoiceState {
        self.inner
            .borrow()
            .voices
            .get(&voice)
            .map(|v| v.state)
            .unwrap_or(VoiceState::Stopped)
    }

    fn play(&mut self, voice: VoiceId) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.state = if v.has_pending() {
                VoiceState::Playing
            } else {
                VoiceState::Stopped
            };
        }
    }

    fn pause(&mut self, voice: VoiceId) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice)
            && v.state == VoiceState::Playing
        {
            v.state = VoiceState::Paused;
        }
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.queue.iter_mut().for_each(|q| q.processed = true);
            v.state = VoiceState::Stopped;
        }
    }

    fn bound_buffer(&self, voice: VoiceId) -> Option<BufferId> {
        self.inner.borrow().voices.get(&voice).and_then(|v| v.buffer)
    }

    fn bind_buffer(&mut self, voice: VoiceId, buffer: Option<BufferId>) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.queue.clear();
            v.buffer = buffer;
        }
    }

    fn set_gain(&mut self, voice: VoiceId, gain: f32) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.gain = gain;
        }
    }

    fn set_pitch(&mut self, voice: VoiceId, pitch: f32) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.pitch = pitch;
        }
    }

    fn set_looping(&mut self, voice: VoiceId, looping: bool) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.looping = looping;
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, BackendError> {
        let mut device = self.inner.borrow_mut();
        if device
            .buffer_limit
            .is_some_and(|limit| device.buffers.len() >= limit)
        {
            return Err(BackendError::BufferUnavailable);
        }
        device.next_buffer += 1;
        let id = BufferId(device.next_buffer);
        device.buffers.insert(
            id,
            Buffer {
                format: None,
                samples: Vec::new(),
            },
        );
        Ok(id)
    }

    fn buffer_data(
        &mut self,
        buffer: BufferId,
        format: PcmFormat,
        samples: &[i16],
    ) -> Result<(), BackendError> {
        if !matches!(format.channels, 1 | 2) {
            return Err(BackendError::InvalidData(format!(
                "{} channels",
                format.channels
            )));
        }
        if samples.len() % format.channels as usize != 0 {
            return Err(BackendError::InvalidData(
                "sample count is not a whole number of frames".to_string(),
            ));
        }
        let mut device = self.inner.borrow_mut();
        let target = device
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))?;
        target.format = Some(format);
        target.samples.clear();
        target.samples.extend_from_slice(samples);
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.inner.borrow_mut().buffers.remove(&buffer);
    }

    fn queue_buffers(&mut self, voice: VoiceId, buffers: &[BufferId]) {
        if let Some(v) = self.inner.borrow_mut().voices.get_mut(&voice) {
            v.buffer = None;
            v.queue.extend(buffers.iter().map(|&buffer| Queued {
                buffer,
                processed: false,
            }));
        }
    }

    fn unqueue_processed(&mut self, voice: VoiceId) -> Vec<BufferId> {
        let mut device = self.inner.borrow_mut();
        let Some(v) = device.voices.get_mut(&voice) else {
            return Vec::new();
        };
        let mut done = Vec::new();
        while let Some(front) = v.queue.front()
            && front.processed
        {
            done.push(front.buffer);
            v.queue.pop_front();
        }
        done
    }

    fn queued_buffers(&self, voice: VoiceId) -> usize {
        self.inner
            .borrow()
            .voices
            .get(&voice)
            .map(|v| v.queue.len())
            .unwrap_or(0)
    }

    fn set_listener(&mut self, listener: &Listener) {
        self.inner.borrow_mut().listener = Some(*listener);
    }
}
