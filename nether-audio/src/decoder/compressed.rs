//! Compressed formats (Vorbis, MP3) via symphonia

use std::io::{Cursor, ErrorKind};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::{PcmSource, check_format};
use crate::backend::PcmFormat;
use crate::error::DecodeError;
use crate::file::FileHandle;

/// Packet-by-packet decoder over an in-memory file
pub struct SymphoniaSource {
    bytes: Arc<[u8]>,
    extension: String,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: PcmFormat,
    sample_buf: Option<SampleBuffer<i16>>,
    /// Decoded samples not yet handed out
    pending: Vec<i16>,
}

struct Opened {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: PcmFormat,
}

fn open_stream(bytes: &Arc<[u8]>, extension: &str) -> Result<Opened, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(Arc::clone(bytes))), Default::default());

    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let reader = probed.format;

    let track = reader.default_track().ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let format = PcmFormat {
        channels: params.channels.map(|c| c.count() as u16).unwrap_or(0),
        sample_rate: params.sample_rate.ok_or(DecodeError::NoTrack)?,
    };
    check_format(format)?;

    let decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

    Ok(Opened {
        reader,
        decoder,
        track_id,
        format,
    })
}

impl PcmSource for SymphoniaSource {
    fn open(file: &FileHandle) -> Result<Self, DecodeError> {
        let bytes = file.read_bytes()?;
        let extension = file.extension().to_ascii_lowercase();
        let opened = open_stream(&bytes, &extension)?;
        Ok(Self {
            bytes,
            extension,
            reader: opened.reader,
            decoder: opened.decoder,
            track_id: opened.track_id,
            format: opened.format,
            sample_buf: None,
            pending: Vec::new(),
        })
    }

    fn format(&self) -> PcmFormat {
        self.format
    }

    fn read(&mut self, out: &mut Vec<i16>, max_frames: usize) -> Result<usize, DecodeError> {
        let channels = self.format.channels as usize;
        let wanted = max_frames * channels;

        while self.pending.len() < wanted {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                // Chained streams change the track list; treat it as the end
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let needed = decoded.capacity() * spec.channels.count();
                    if self
                        .sample_buf
                        .as_ref()
                        .is_none_or(|buf| buf.capacity() < needed)
                    {
                        self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = self.sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        self.pending.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping corrupt packet: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let take = wanted.min(self.pending.len());
        let take = take - take % channels;
        out.extend(self.pending.drain(..take));
        Ok(take / channels)
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        let opened = open_stream(&self.bytes, &self.extension)?;
        self.reader = opened.reader;
        self.decoder = opened.decoder;
        self.track_id = opened.track_id;
        self.pending.clear();
        Ok(())
    }
}
