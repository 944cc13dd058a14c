//! Fully decoded one-shot sounds

use std::time::Duration;

use tracing::{debug, warn};

use super::{PcmSource, check_format};
use crate::backend::{BufferId, PcmFormat, VoiceId};
use crate::error::DecodeError;
use crate::file::FileHandle;
use crate::sound::Sound;
use crate::streams::{StreamOwnership, StreamPool};

/// Frames decoded per read while loading
const LOAD_CHUNK_FRAMES: usize = 16_384;

/// A sound whose whole PCM payload lives in one backend buffer.
///
/// Hand it back through [`Sound::dispose`]; dropping it leaves the buffer
/// allocated until the backend shuts down.
#[derive(Debug)]
pub struct BufferedSound {
    buffer: BufferId,
    duration: Duration,
    released: bool,
}

impl BufferedSound {
    /// Decode `file` with `S` and upload it
    pub fn load<S: PcmSource>(streams: &mut StreamPool, file: &FileHandle) -> Result<Self, DecodeError> {
        let mut source = S::open(file)?;
        let mut samples = Vec::new();
        while source.read(&mut samples, LOAD_CHUNK_FRAMES)? > 0 {}
        Self::from_pcm(streams, source.format(), &samples)
    }

    /// Upload already decoded interleaved samples
    pub fn from_pcm(
        streams: &mut StreamPool,
        format: PcmFormat,
        samples: &[i16],
    ) -> Result<Self, DecodeError> {
        check_format(format)?;
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        let backend = streams.backend_mut();
        let buffer = backend.create_buffer()?;
        if let Err(e) = backend.buffer_data(buffer, format, samples) {
            backend.delete_buffer(buffer);
            return Err(e.into());
        }

        let frames = format.frames(samples.len());
        Ok(Self {
            buffer,
            duration: Duration::from_secs_f64(frames as f64 / format.sample_rate as f64),
            released: false,
        })
    }

    /// Backend buffer holding the samples
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }
}

impl Sound for BufferedSound {
    fn play_with(
        &mut self,
        streams: &mut StreamPool,
        volume: f32,
        pitch: f32,
        looping: bool,
    ) -> Option<VoiceId> {
        let Some(voice) = streams.obtain_stream(StreamOwnership::Transient) else {
            debug!("No free voice, dropping sound");
            return None;
        };
        // Reclaimed voices keep the previous sound's parameters
        let backend = streams.backend_mut();
        backend.bind_buffer(voice, Some(self.buffer));
        backend.set_looping(voice, looping);
        backend.set_gain(voice, volume);
        backend.set_pitch(voice, pitch);
        backend.play(voice);
        Some(voice)
    }

    fn stop(&mut self, streams: &mut StreamPool) {
        streams.stop_streams_with_buffer(self.buffer);
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn dispose(mut self: Box<Self>, streams: &mut StreamPool) {
        streams.free_buffer(self.buffer);
        streams.backend_mut().delete_buffer(self.buffer);
        self.released = true;
    }
}

impl Drop for BufferedSound {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Sound buffer {} dropped without dispose, held until shutdown",
                self.buffer
            );
        }
    }
}
