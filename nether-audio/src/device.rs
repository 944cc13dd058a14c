//! Raw PCM pass-through using cpal and a ring buffer
//!
//! Bypasses the voice pool: the application writes (or reads) interleaved
//! `f32` samples directly. The main thread and the cpal callback meet in a
//! lock-free ring buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use tracing::{debug, error};

use crate::error::AudioError;

/// Ring buffer length in frames (~100ms at 44.1 kHz)
const RING_BUFFER_FRAMES: usize = 4410;

fn device_error(context: &str, e: impl std::fmt::Display) -> AudioError {
    AudioError::Device(format!("{}: {}", context, e))
}

/// Output device fed with raw samples
pub struct AudioDevice {
    producer: ringbuf::HeapProd<f32>,
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    is_mono: bool,
    frame: Vec<f32>,
}

impl AudioDevice {
    /// Open the default output device at its preferred format
    pub(crate) fn open(is_mono: bool) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Device("no audio output device available".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| device_error("failed to get default output config", e))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        let ring = HeapRb::<f32>::new(RING_BUFFER_FRAMES * channels as usize);
        let (producer, mut consumer) = ring.split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let popped = consumer.pop_slice(data);
                    data[popped..].fill(0.0);
                },
                |err| error!("Audio device stream error: {}", err),
                None,
            ),
            cpal::SampleFormat::I16 => {
                let mut temp_buffer: Vec<f32> = vec![0.0; 4096];
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        if temp_buffer.len() < data.len() {
                            temp_buffer.resize(data.len(), 0.0);
                        }
                        let popped = consumer.pop_slice(&mut temp_buffer[..data.len()]);
                        for (out, &f) in data.iter_mut().zip(&temp_buffer[..popped]) {
                            *out = (f * 32767.0).clamp(-32768.0, 32767.0) as i16;
                        }
                        data[popped..].fill(0);
                    },
                    |err| error!("Audio device stream error: {}", err),
                    None,
                )
            }
            format => {
                return Err(AudioError::Device(format!(
                    "unsupported sample format: {:?}",
                    format
                )));
            }
        }
        .map_err(|e| device_error("failed to build output stream", e))?;

        stream
            .play()
            .map_err(|e| device_error("failed to start output stream", e))?;
        debug!(
            "Audio device opened: {} Hz, {} channels, mono input: {}",
            sample_rate, channels, is_mono
        );

        Ok(Self {
            producer,
            _stream: stream,
            sample_rate,
            channels,
            is_mono,
            frame: vec![0.0; channels as usize],
        })
    }

    /// Queue interleaved samples for playback.
    ///
    /// Mono input is duplicated to every device channel; stereo input
    /// repeats its right channel on any extra device channels. Returns the
    /// number of input samples accepted; the rest didn't fit.
    pub fn write_samples(&mut self, samples: &[f32]) -> usize {
        let input_channels = if self.is_mono { 1 } else { 2 };
        let device_channels = self.channels as usize;

        let mut written = 0;
        for input in samples.chunks_exact(input_channels) {
            if self.producer.vacant_len() < device_channels {
                break;
            }
            for (channel, out) in self.frame.iter_mut().enumerate() {
                *out = input[channel.min(input_channels - 1)];
            }
            self.producer.push_slice(&self.frame);
            written += input_channels;
        }
        if written < samples.len() {
            debug!(
                "Audio device buffer full: dropped {} samples",
                samples.len() - written
            );
        }
        written
    }

    /// Device sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Device channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames the ring buffer holds ahead of the device
    pub fn latency_frames(&self) -> usize {
        RING_BUFFER_FRAMES
    }

    /// Whether input is mono
    pub fn is_mono(&self) -> bool {
        self.is_mono
    }
}

/// Input device captured into a ring buffer
pub struct AudioRecorder {
    consumer: ringbuf::HeapCons<f32>,
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioRecorder {
    /// Open the default input device at `sample_rate`, mono or stereo
    pub(crate) fn open(sample_rate: u32, is_mono: bool) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::Device("no audio input device available".to_string()))?;
        let default = device
            .default_input_config()
            .map_err(|e| device_error("failed to get default input config", e))?;

        let channels: u16 = if is_mono { 1 } else { 2 };
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let ring = HeapRb::<f32>::new(sample_rate as usize * channels as usize);
        let (mut producer, consumer) = ring.split();

        let stream = match default.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                },
                |err| error!("Audio recorder stream error: {}", err),
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    for &s in data {
                        if producer.try_push(s as f32 / 32768.0).is_err() {
                            break;
                        }
                    }
                },
                |err| error!("Audio recorder stream error: {}", err),
                None,
            ),
            format => {
                return Err(AudioError::Device(format!(
                    "unsupported sample format: {:?}",
                    format
                )));
            }
        }
        .map_err(|e| device_error("failed to build input stream", e))?;

        stream
            .play()
            .map_err(|e| device_error("failed to start input stream", e))?;
        debug!(
            "Audio recorder opened: {} Hz, {} channels",
            sample_rate, channels
        );

        Ok(Self {
            consumer,
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    /// Copy captured samples into `samples`; returns how many were written
    pub fn read_samples(&mut self, samples: &mut [f32]) -> usize {
        self.consumer.pop_slice(samples)
    }

    /// Capture sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Capture channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }
}
