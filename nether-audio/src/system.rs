//! Audio system - composition root
//!
//! Owns the hardware backend (through the [`StreamPool`]), the
//! [`DecoderRegistry`] and every tracked music instance. Create one per
//! process, call [`AudioSystem::update`] once per frame and
//! [`AudioSystem::dispose`] at shutdown.

use tracing::{debug, info};

use crate::backend::{AudioBackend, Listener};
use crate::config::AudioConfig;
use crate::decoder;
use crate::error::{AudioError, BoxError};
use crate::file::FileHandle;
use crate::music::{MusicControl, MusicId, MusicTracker};
use crate::registry::DecoderRegistry;
use crate::sound::{Music, Sound};
use crate::streams::StreamPool;

#[cfg(feature = "pcm-device")]
use crate::device::{AudioDevice, AudioRecorder};

#[cfg(test)]
mod tests;

/// The audio subsystem instance
pub struct AudioSystem {
    registry: DecoderRegistry,
    streams: StreamPool,
    music: MusicTracker,
}

impl AudioSystem {
    /// Bring up `backend` with the built-in decoders registered.
    ///
    /// A backend that fails to initialize is fatal. Fewer voices than
    /// `config.simultaneous_streams` is not.
    pub fn new(backend: impl AudioBackend + 'static, config: &AudioConfig) -> Result<Self, AudioError> {
        let mut registry = DecoderRegistry::new();
        decoder::register_defaults(&mut registry)?;

        let mut backend: Box<dyn AudioBackend> = Box::new(backend);
        backend.init().map_err(AudioError::Init)?;

        let mut streams = StreamPool::new(backend, config.simultaneous_streams);
        streams.backend_mut().set_listener(&config.listener);

        info!(
            "Audio initialized: {}/{} voices",
            streams.all_streams().len(),
            config.simultaneous_streams
        );

        Ok(Self {
            registry,
            streams,
            music: MusicTracker::default(),
        })
    }

    /// Register (or replace) the sound decoder for `extension`
    pub fn register_sound<F>(&mut self, extension: &str, factory: F) -> Result<(), AudioError>
    where
        F: Fn(&mut StreamPool, &FileHandle) -> Result<Box<dyn Sound>, BoxError> + 'static,
    {
        self.registry.register_sound(extension, factory)
    }

    /// Register (or replace) the music decoder for `extension`
    pub fn register_music<F>(&mut self, extension: &str, factory: F) -> Result<(), AudioError>
    where
        F: Fn(&mut StreamPool, &FileHandle) -> Result<Box<dyn Music>, BoxError> + 'static,
    {
        self.registry.register_music(extension, factory)
    }

    /// Build a sound effect for `file`.
    ///
    /// The caller owns the sound and hands it back through
    /// [`AudioSystem::dispose_sound`]. A sound that is dropped instead keeps
    /// its buffer until this system is disposed.
    pub fn create_sound(&mut self, file: &FileHandle) -> Result<Box<dyn Sound>, AudioError> {
        self.registry.create_sound(&mut self.streams, file)
    }

    /// Build a music instance for `file` and start tracking it
    pub fn create_music(&mut self, file: &FileHandle) -> Result<MusicId, AudioError> {
        let music = self.registry.create_music(&mut self.streams, file)?;
        let id = self.music.track(music);
        debug!("Tracking {} for {}", id, file);
        Ok(id)
    }

    /// Control surface for a tracked music instance
    pub fn music(&mut self, id: MusicId) -> Option<MusicControl<'_>> {
        let music = self.music.get_mut(id)?;
        Some(MusicControl {
            music,
            streams: &mut self.streams,
        })
    }

    /// Tracked music, in tracking order
    pub fn music_ids(&self) -> Vec<MusicId> {
        self.music.ids()
    }

    /// Number of tracked music instances
    pub fn music_count(&self) -> usize {
        self.music.len()
    }

    /// Release a music instance and stop tracking it. False if `id` is not
    /// tracked.
    pub fn dispose_music(&mut self, id: MusicId) -> bool {
        match self.music.untrack(id) {
            Some(music) => {
                music.dispose(&mut self.streams);
                true
            }
            None => false,
        }
    }

    /// Release a sound's buffers
    pub fn dispose_sound(&mut self, sound: Box<dyn Sound>) {
        sound.dispose(&mut self.streams);
    }

    /// Per-frame tick: lets every tracked music instance refill its queue
    pub fn update(&mut self) {
        self.music.update(&mut self.streams);
    }

    /// Move the listener
    pub fn set_listener(&mut self, listener: &Listener) {
        self.streams.backend_mut().set_listener(listener);
    }

    /// The voice pool
    pub fn streams(&self) -> &StreamPool {
        &self.streams
    }

    /// The voice pool, for playing sounds
    pub fn streams_mut(&mut self) -> &mut StreamPool {
        &mut self.streams
    }

    /// The decoder registry
    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    /// Open the default output device for raw PCM
    #[cfg(feature = "pcm-device")]
    pub fn new_audio_device(&self, is_mono: bool) -> Result<AudioDevice, AudioError> {
        AudioDevice::open(is_mono)
    }

    /// Open the default input device for raw PCM capture
    #[cfg(feature = "pcm-device")]
    pub fn new_audio_recorder(
        &self,
        sample_rate: u32,
        is_mono: bool,
    ) -> Result<AudioRecorder, AudioError> {
        AudioRecorder::open(sample_rate, is_mono)
    }

    /// Release all tracked music, every voice and the audio context
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        for (id, music) in self.music.drain() {
            debug!("Disposing {}", id);
            music.dispose(&mut self.streams);
        }
        self.streams.dispose();
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.teardown();
    }
}
