//! Hardware voice pool
//!
//! A fixed set of voices is allocated once at startup and shared between two
//! kinds of users with different ownership contracts:
//!
//! - **Music** claims a voice exclusively ([`StreamOwnership::Exclusive`]).
//!   The voice leaves the idle set until the music hands it back with
//!   [`StreamPool::free_stream`].
//! - **Sound effects** borrow a voice transiently
//!   ([`StreamOwnership::Transient`]). The voice stays in the idle set and is
//!   reclaimed as soon as the hardware reports it finished. Because state is
//!   polled, two effect requests in the same frame can be handed the same
//!   voice before the first one starts playing; effects tolerate that.
//!
//! Buffers are never owned by the pool. Owners must call
//! [`StreamPool::free_buffer`] before deleting a buffer so that no idle voice
//! keeps a binding to freed audio data.

use tracing::{debug, info, warn};

use crate::backend::{AudioBackend, BufferId, VoiceId, VoiceState};


/// Ownership contract requested from [`StreamPool::obtain_stream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOwnership {
    /// Music: the voice is removed from the idle set and belongs to the
    /// caller until [`StreamPool::free_stream`].
    Exclusive,
    /// Sound effect: the voice stays in the idle set and may be handed out
    /// again once (or even before) its playback ends.
    Transient,
}

/// Fixed pool of hardware voices plus the backend that owns them
pub struct StreamPool {
    backend: Box<dyn AudioBackend>,
    /// Every voice allocated at startup, in allocation order
    all_streams: Vec<VoiceId>,
    /// Voices not exclusively claimed; always a subset of `all_streams`
    idle_streams: Vec<VoiceId>,
    disposed: bool,
}

impl StreamPool {
    /// Allocate up to `requested` voices from an initialized backend.
    ///
    /// Allocation stops at the first hardware refusal; a smaller pool is not
    /// an error.
    pub fn new(mut backend: Box<dyn AudioBackend>, requested: usize) -> Self {
        let mut all_streams = Vec::with_capacity(requested);
        for _ in 0..requested {
            match backend.create_voice() {
                Ok(voice) => all_streams.push(voice),
                Err(e) => {
                    warn!(
                        "Voice allocation stopped at {}/{}: {}",
                        all_streams.len(),
                        requested,
                        e
                    );
                    break;
                }
            }
        }
        debug!("Allocated {} hardware voices", all_streams.len());

        Self {
            backend,
            idle_streams: all_streams.clone(),
            all_streams,
            disposed: false,
        }
    }

    /// Hand out a voice that is neither playing nor paused.
    ///
    /// The chosen voice is stopped and unbound before being returned. Returns
    /// `None` when every idle voice is busy; callers drop the request.
    pub fn obtain_stream(&mut self, ownership: StreamOwnership) -> Option<VoiceId> {
        let index = self
            .idle_streams
            .iter()
            .position(|&voice| self.backend.voice_state(voice).is_reclaimable())?;

        let voice = match ownership {
            StreamOwnership::Exclusive => self.idle_streams.remove(index),
            StreamOwnership::Transient => self.idle_streams[index],
        };
        self.backend.stop(voice);
        self.backend.bind_buffer(voice, None);
        Some(voice)
    }

    /// Stop a voice, unbind it and return it to the idle set.
    ///
    /// Freeing a voice that is already idle leaves a single entry. Voices the
    /// pool didn't allocate are ignored.
    pub fn free_stream(&mut self, voice: VoiceId) {
        if !self.all_streams.contains(&voice) {
            warn!("Ignoring free of voice {} not owned by the pool", voice);
            return;
        }
        self.backend.stop(voice);
        self.backend.bind_buffer(voice, None);
        if !self.idle_streams.contains(&voice) {
            self.idle_streams.push(voice);
        }
    }

    /// Stop and unbind every idle voice bound to `buffer`.
    ///
    /// Must be called before the buffer is deleted.
    pub fn free_buffer(&mut self, buffer: BufferId) {
        for &voice in &self.idle_streams {
            if self.backend.bound_buffer(voice) == Some(buffer) {
                self.backend.stop(voice);
                self.backend.bind_buffer(voice, None);
            }
        }
    }

    /// Stop every idle voice bound to `buffer`, keeping the binding
    pub fn stop_streams_with_buffer(&mut self, buffer: BufferId) {
        for &voice in &self.idle_streams {
            if self.backend.bound_buffer(voice) == Some(buffer) {
                self.backend.stop(voice);
            }
        }
    }

    /// Every voice the pool allocated
    pub fn all_streams(&self) -> &[VoiceId] {
        &self.all_streams
    }

    /// Voices currently available for allocation
    pub fn idle_streams(&self) -> &[VoiceId] {
        &self.idle_streams
    }

    /// Whether `voice` is in the idle set
    pub fn is_idle(&self, voice: VoiceId) -> bool {
        self.idle_streams.contains(&voice)
    }

    /// The hardware binding
    pub fn backend(&self) -> &dyn AudioBackend {
        self.backend.as_ref()
    }

    /// The hardware binding, for buffer management by decoders
    pub fn backend_mut(&mut self) -> &mut dyn AudioBackend {
        self.backend.as_mut()
    }

    /// Stop and release every voice, then tear down the audio context.
    ///
    /// Runs at most once; later calls (including the one from `Drop`) are
    /// no-ops.
    pub(crate) fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for &voice in &self.all_streams {
            if self.backend.voice_state(voice) != VoiceState::Stopped {
                self.backend.stop(voice);
            }
            self.backend.delete_voice(voice);
        }
        self.idle_streams.clear();
        self.backend.shutdown();
        info!("Audio shut down ({} voices released)", self.all_streams.len());
    }
}

impl Drop for StreamPool {
    fn drop(&mut self) {
        self.dispose();
    }
}
