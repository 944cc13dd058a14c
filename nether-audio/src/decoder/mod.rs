//! Built-in decoders
//!
//! Formats are split into a PCM source (how to get 16-bit samples out of the
//! file) and a playback strategy:
//! - [`BufferedSound`]: decode everything up front into one buffer
//! - [`StreamedMusic`]: keep a small queue of buffers topped up every frame
//!
//! Built-in formats:
//! - `wav` via hound ([`WavSource`])
//! - `ogg` (Vorbis) and `mp3` via symphonia ([`SymphoniaSource`])

use crate::backend::PcmFormat;
use crate::error::{AudioError, BoxError, DecodeError};
use crate::file::FileHandle;
use crate::registry::DecoderRegistry;
use crate::sound::{Music, Sound};
use crate::streams::StreamPool;

mod buffered;
mod compressed;
mod streamed;
mod wav;

pub use buffered::BufferedSound;
pub use compressed::SymphoniaSource;
pub use streamed::{MUSIC_BUFFER_COUNT, MUSIC_BUFFER_FRAMES, StreamedMusic};
pub use wav::WavSource;

/// A decoder that yields interleaved 16-bit PCM
pub trait PcmSource: Sized {
    /// Open `file` and read its header
    fn open(file: &FileHandle) -> Result<Self, DecodeError>;

    /// Channel layout and rate of the decoded samples
    fn format(&self) -> PcmFormat;

    /// Append up to `max_frames` frames to `out`.
    ///
    /// Returns the number of frames appended; 0 means the end of the stream.
    fn read(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, DecodeError>;

    /// Go back to the first frame
    fn rewind(&mut self) -> Result<(), DecodeError>;
}

/// Reject layouts a voice can't render: mono or stereo at a non-zero rate
pub(crate) fn check_format(format: PcmFormat) -> Result<(), DecodeError> {
    if !matches!(format.channels, 1 | 2) {
        return Err(DecodeError::UnsupportedChannels(format.channels));
    }
    if format.sample_rate == 0 {
        return Err(DecodeError::InvalidSampleRate(format.sample_rate));
    }
    Ok(())
}

/// Sound factory decoding the whole file with `S`
pub fn buffered_sound<S: PcmSource>(
    streams: &mut StreamPool,
    file: &FileHandle,
) -> Result<Box<dyn Sound>, BoxError> {
    Ok(Box::new(BufferedSound::load::<S>(streams, file)?))
}

/// Music factory streaming the file with `S`
pub fn streamed_music<S: PcmSource + 'static>(
    streams: &mut StreamPool,
    file: &FileHandle,
) -> Result<Box<dyn Music>, BoxError> {
    Ok(Box::new(StreamedMusic::<S>::open(streams, file)?))
}

/// Register the built-in formats
pub(crate) fn register_defaults(registry: &mut DecoderRegistry) -> Result<(), AudioError> {
    registry.register_sound("ogg", buffered_sound::<SymphoniaSource>)?;
    registry.register_music("ogg", streamed_music::<SymphoniaSource>)?;
    registry.register_sound("wav", buffered_sound::<WavSource>)?;
    registry.register_music("wav", streamed_music::<WavSource>)?;
    registry.register_sound("mp3", buffered_sound::<SymphoniaSource>)?;
    registry.register_music("mp3", streamed_music::<SymphoniaSource>)?;
    Ok(())
}

/// Headerless little-endian 16-bit mono at 8 kHz, for tests
#[cfg(test)]
pub(crate) struct RawSource {
    samples: Vec<i16>,
    cursor: usize,
}

#[cfg(test)]
impl RawSource {
    pub(crate) const RATE: u32 = 8_000;

    /// A `.raw` file holding `samples`
    pub(crate) fn file(name: &str, samples: &[i16]) -> FileHandle {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        FileHandle::from_bytes(name, bytes)
    }
}

#[cfg(test)]
impl PcmSource for RawSource {
    fn open(file: &FileHandle) -> Result<Self, DecodeError> {
        let samples = file
            .read_bytes()?
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self { samples, cursor: 0 })
    }

    fn format(&self) -> PcmFormat {
        PcmFormat::mono(Self::RATE)
    }

    fn read(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, DecodeError> {
        let end = (self.cursor + max_frames).min(self.samples.len());
        out.extend_from_slice(&self.samples[self.cursor..end]);
        let read = end - self.cursor;
        self.cursor = end;
        Ok(read)
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.cursor = 0;
        Ok(())
    }
}
