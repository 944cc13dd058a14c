//! WAV decoding via hound

use std::io::Cursor;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};

use super::{PcmSource, check_format};
use crate::backend::PcmFormat;
use crate::error::DecodeError;
use crate::file::FileHandle;

/// Integer (8/16/24/32-bit) or float WAV, converted to 16-bit
pub struct WavSource {
    reader: WavReader<Cursor<Arc<[u8]>>>,
    format: PcmFormat,
}

impl PcmSource for WavSource {
    fn open(file: &FileHandle) -> Result<Self, DecodeError> {
        let reader = WavReader::new(Cursor::new(file.read_bytes()?))?;
        let spec = reader.spec();
        let format = PcmFormat {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        };
        check_format(format)?;
        Ok(Self { reader, format })
    }

    fn format(&self) -> PcmFormat {
        self.format
    }

    fn read(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, DecodeError> {
        let channels = self.format.channels as usize;
        let wanted = max_frames * channels;
        let start = out.len();
        let spec = self.reader.spec();
        let bits = spec.bits_per_sample;

        match spec.sample_format {
            SampleFormat::Int if bits <= 16 => {
                let shift = 16 - bits;
                for sample in self.reader.samples::<i16>().take(wanted) {
                    out.push(sample? << shift);
                }
            }
            SampleFormat::Int => {
                let shift = bits - 16;
                for sample in self.reader.samples::<i32>().take(wanted) {
                    out.push((sample? >> shift) as i16);
                }
            }
            SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(wanted) {
                    out.push((sample?.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                }
            }
        }

        // A truncated file can end mid-frame
        let read = out.len() - start;
        out.truncate(start + read - read % channels);
        Ok(read / channels)
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.reader.seek(0)?;
        Ok(())
    }
}
