//! Streamed music over a rotating buffer queue

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use super::{PcmSource, check_format};
use crate::backend::{BufferId, PcmFormat, VoiceId, VoiceState};
use crate::error::DecodeError;
use crate::file::FileHandle;
use crate::sound::Music;
use crate::streams::{StreamOwnership, StreamPool};

/// Buffers rotating through a music voice's queue
pub const MUSIC_BUFFER_COUNT: usize = 3;

/// Frames decoded into each queued buffer
pub const MUSIC_BUFFER_FRAMES: usize = 4096;

/// One buffer sitting in the voice queue
struct Chunk {
    buffer: BufferId,
    frames: usize,
    /// Frame offset where the source wrapped around to its start
    restart_at: Option<usize>,
}

/// Music decoded a few thousand frames at a time while it plays
pub struct StreamedMusic<S> {
    source: S,
    format: PcmFormat,
    name: String,
    buffers: Vec<BufferId>,
    queued: VecDeque<Chunk>,
    voice: Option<VoiceId>,
    scratch: Vec<i16>,
    volume: f32,
    looping: bool,
    playing: bool,
    /// Frames rendered since the start of the current pass
    rendered: u64,
    /// Source reached its end with looping off
    exhausted: bool,
}

impl<S: PcmSource> StreamedMusic<S> {
    /// Open `file` and allocate the queue buffers
    pub fn open(streams: &mut StreamPool, file: &FileHandle) -> Result<Self, DecodeError> {
        let source = S::open(file)?;
        let format = source.format();
        check_format(format)?;

        let backend = streams.backend_mut();
        let mut buffers = Vec::with_capacity(MUSIC_BUFFER_COUNT);
        for _ in 0..MUSIC_BUFFER_COUNT {
            match backend.create_buffer() {
                Ok(buffer) => buffers.push(buffer),
                Err(e) => {
                    for buffer in buffers {
                        backend.delete_buffer(buffer);
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(Self {
            source,
            format,
            name: file.to_string(),
            buffers,
            queued: VecDeque::with_capacity(MUSIC_BUFFER_COUNT),
            voice: None,
            scratch: Vec::with_capacity(MUSIC_BUFFER_FRAMES * format.channels as usize),
            volume: 1.0,
            looping: false,
            playing: false,
            rendered: 0,
            exhausted: false,
        })
    }

    /// Decode the next chunk into `buffer`. `None` when the source is done.
    fn fill(
        &mut self,
        streams: &mut StreamPool,
        buffer: BufferId,
    ) -> Result<Option<Chunk>, DecodeError> {
        self.scratch.clear();
        let mut frames = 0;
        let mut restart_at = None;

        while frames < MUSIC_BUFFER_FRAMES {
            let read = self
                .source
                .read(&mut self.scratch, MUSIC_BUFFER_FRAMES - frames)?;
            if read > 0 {
                frames += read;
                continue;
            }
            // An empty source must not spin
            if !self.looping || restart_at == Some(frames) {
                break;
            }
            self.source.rewind()?;
            restart_at = Some(frames);
        }

        if frames == 0 {
            return Ok(None);
        }
        streams
            .backend_mut()
            .buffer_data(buffer, self.format, &self.scratch)?;
        Ok(Some(Chunk {
            buffer,
            frames,
            restart_at,
        }))
    }

    /// Fill `buffer` and append it to the voice queue. False at end of stream.
    fn enqueue(
        &mut self,
        streams: &mut StreamPool,
        voice: VoiceId,
        buffer: BufferId,
    ) -> Result<bool, DecodeError> {
        match self.fill(streams, buffer)? {
            Some(chunk) => {
                streams.backend_mut().queue_buffers(voice, &[buffer]);
                self.queued.push_back(chunk);
                self.exhausted = false;
                Ok(true)
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// Hand the voice back to the pool
    fn release(&mut self, streams: &mut StreamPool) {
        if let Some(voice) = self.voice.take() {
            streams.free_stream(voice);
        }
        self.queued.clear();
        self.playing = false;
    }
}

impl<S: PcmSource> Music for StreamedMusic<S> {
    fn play(&mut self, streams: &mut StreamPool) {
        if self.playing {
            return;
        }
        if let Some(voice) = self.voice {
            streams.backend_mut().play(voice);
            self.playing = true;
            return;
        }

        let Some(voice) = streams.obtain_stream(StreamOwnership::Exclusive) else {
            warn!("No free voice for music {}", self.name);
            return;
        };
        self.voice = Some(voice);
        let backend = streams.backend_mut();
        backend.set_looping(voice, false);
        backend.set_gain(voice, self.volume);

        for index in 0..self.buffers.len() {
            let buffer = self.buffers[index];
            match self.enqueue(streams, voice, buffer) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("Music {} failed to decode: {}", self.name, e);
                    break;
                }
            }
        }

        if self.queued.is_empty() {
            debug!("Music {} has nothing to play", self.name);
            self.release(streams);
            return;
        }
        streams.backend_mut().play(voice);
        self.playing = true;
    }

    fn pause(&mut self, streams: &mut StreamPool) {
        if let Some(voice) = self.voice
            && self.playing
        {
            streams.backend_mut().pause(voice);
            self.playing = false;
        }
    }

    fn stop(&mut self, streams: &mut StreamPool) {
        self.release(streams);
        if let Err(e) = self.source.rewind() {
            warn!("Music {} failed to rewind: {}", self.name, e);
        }
        self.rendered = 0;
        self.exhausted = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn set_volume(&mut self, streams: &mut StreamPool, volume: f32) {
        self.volume = volume;
        if let Some(voice) = self.voice {
            streams.backend_mut().set_gain(voice, volume);
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(self.rendered as f64 / self.format.sample_rate as f64)
    }

    fn update(&mut self, streams: &mut StreamPool) {
        if !self.playing {
            return;
        }
        let Some(voice) = self.voice else {
            return;
        };

        let processed = streams.backend_mut().unqueue_processed(voice);
        for buffer in processed {
            if let Some(index) = self.queued.iter().position(|c| c.buffer == buffer)
                && let Some(chunk) = self.queued.remove(index)
            {
                self.rendered = match chunk.restart_at {
                    Some(at) => (chunk.frames - at) as u64,
                    None => self.rendered + chunk.frames as u64,
                };
            }
            if self.exhausted && !self.looping {
                continue;
            }
            if let Err(e) = self.enqueue(streams, voice, buffer) {
                warn!("Music {} failed to decode, stopping: {}", self.name, e);
                self.stop(streams);
                return;
            }
        }

        if self.queued.is_empty() {
            debug!("Music {} finished", self.name);
            self.stop(streams);
            return;
        }
        // Underrun: the voice drained its queue before we refilled it
        if streams.backend().voice_state(voice) != VoiceState::Playing {
            debug!("Music {} ran dry, restarting voice", self.name);
            streams.backend_mut().play(voice);
        }
    }

    fn dispose(mut self: Box<Self>, streams: &mut StreamPool) {
        self.release(streams);
        for &buffer in &self.buffers {
            streams.free_buffer(buffer);
            streams.backend_mut().delete_buffer(buffer);
        }
    }
}
