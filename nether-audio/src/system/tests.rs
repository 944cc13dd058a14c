//! Audio system tests

use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;

use super::*;
use crate::backend::{BufferId, VoiceState};
use crate::decoder::{self, MUSIC_BUFFER_COUNT, RawSource};
use crate::error::{BackendError, DecodeError, DecoderKind};
use crate::headless::HeadlessBackend;
use crate::streams::StreamOwnership;

fn system(voices: usize) -> (AudioSystem, HeadlessBackend) {
    let device = HeadlessBackend::new();
    let config = AudioConfig {
        simultaneous_streams: voices,
        ..AudioConfig::default()
    };
    (AudioSystem::new(device.clone(), &config).unwrap(), device)
}

fn wav(name: &str, channels: u16, frames: usize) -> FileHandle {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
    for i in 0..frames * channels as usize {
        writer.write_sample((i % 2000) as i16).unwrap();
    }
    writer.finalize().unwrap();
    FileHandle::from_bytes(name, bytes)
}

/// Mono 16-bit WAV whose header declares a 0 Hz sample rate
fn zero_rate_wav(name: &str) -> FileHandle {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // channels
    bytes.extend_from_slice(&0u32.to_le_bytes()); // sample rate
    bytes.extend_from_slice(&0u32.to_le_bytes()); // byte rate
    bytes.extend_from_slice(&2u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&4u32.to_le_bytes());
    bytes.extend_from_slice(&[1, 0, 2, 0]);
    FileHandle::from_bytes(name, bytes)
}

// =============================================================
// Construction
// =============================================================

#[test]
fn test_new_allocates_requested_voices() {
    let (system, device) = system(4);
    assert!(device.is_initialized());
    assert_eq!(system.streams().all_streams().len(), 4);
    assert_eq!(system.streams().idle_streams().len(), 4);
}

#[test]
fn test_new_accepts_smaller_pool() {
    let device = HeadlessBackend::with_voice_limit(3);
    let system = AudioSystem::new(device, &AudioConfig::default()).unwrap();
    assert_eq!(system.streams().all_streams().len(), 3);
}

#[test]
fn test_new_applies_listener_defaults() {
    let (_system, device) = system(1);
    let listener = device.listener().unwrap();
    assert_eq!(listener.position, Vec3::ZERO);
    assert_eq!(listener.velocity, Vec3::ZERO);
    assert_eq!(listener.orientation(), [0.0, 0.0, -1.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_init_failure_is_fatal() {
    let device = HeadlessBackend::failing_init("no audio hardware");
    let result = AudioSystem::new(device.clone(), &AudioConfig::default());
    assert!(matches!(
        result,
        Err(AudioError::Init(BackendError::InitFailed(_)))
    ));
    assert_eq!(device.live_voices(), 0);
}

#[test]
fn test_builtin_formats_registered() {
    let (system, _device) = system(1);
    assert_eq!(system.registry().sound_extensions(), vec!["mp3", "ogg", "wav"]);
    assert_eq!(system.registry().music_extensions(), vec!["mp3", "ogg", "wav"]);
}

#[test]
fn test_set_listener() {
    let (mut system, device) = system(1);
    let listener = Listener {
        position: Vec3::new(3.0, 0.0, 1.0),
        ..Listener::default()
    };
    system.set_listener(&listener);
    assert_eq!(device.listener(), Some(listener));
}

// =============================================================
// Voice pool through the system
// =============================================================

#[test]
fn test_exclusive_stream_leaves_idle_set() {
    let (mut system, _device) = system(4);
    let voice = system
        .streams_mut()
        .obtain_stream(StreamOwnership::Exclusive)
        .unwrap();
    assert!(system.streams().all_streams().contains(&voice));
    assert_eq!(system.streams().idle_streams().len(), 3);
}

#[test]
fn test_free_unbound_buffer_is_noop() {
    let (mut system, _device) = system(4);
    let before = system.streams().idle_streams().to_vec();
    system.streams_mut().free_buffer(BufferId(7));
    assert_eq!(system.streams().idle_streams(), before.as_slice());
}

// =============================================================
// Decoder registry through the system
// =============================================================

#[test]
fn test_registration_last_write_wins() {
    let (mut system, _device) = system(2);
    let built_by = Rc::new(Cell::new(""));

    for name in ["A", "B"] {
        let seen = Rc::clone(&built_by);
        system
            .register_sound("ogg", move |streams: &mut StreamPool, file: &FileHandle| {
                seen.set(name);
                decoder::buffered_sound::<RawSource>(streams, file)
            })
            .unwrap();
    }

    let file = RawSource::file("jump.ogg", &[1, 2, 3]);
    let sound = system.create_sound(&file).unwrap();
    assert_eq!(built_by.get(), "B");
    system.dispose_sound(sound);
}

#[test]
fn test_unknown_extension_is_unsupported() {
    let (mut system, device) = system(2);
    let file = FileHandle::from_bytes("blip.xyz", vec![0u8; 16]);
    assert!(matches!(
        system.create_sound(&file),
        Err(AudioError::UnsupportedFormat {
            kind: DecoderKind::Sound,
            ..
        })
    ));
    assert!(matches!(
        system.create_music(&file),
        Err(AudioError::UnsupportedFormat {
            kind: DecoderKind::Music,
            ..
        })
    ));
    assert_eq!(system.music_count(), 0);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn test_corrupt_file_reports_creation_error() {
    let (mut system, _device) = system(2);
    let file = FileHandle::from_bytes("broken.wav", b"RIFF....WAVE".to_vec());
    match system.create_sound(&file) {
        Err(AudioError::Creation {
            kind, file, source, ..
        }) => {
            assert_eq!(kind, DecoderKind::Sound);
            assert_eq!(file, "broken.wav");
            assert!(matches!(
                source.downcast_ref::<DecodeError>(),
                Some(DecodeError::Wav(_))
            ));
        }
        other => panic!("expected creation error, got {:?}", other.err()),
    }
}

#[test]
fn test_zero_sample_rate_is_a_creation_error() {
    let (mut system, device) = system(2);
    let file = zero_rate_wav("still.wav");

    match system.create_sound(&file) {
        Err(AudioError::Creation { kind, source, .. }) => {
            assert_eq!(kind, DecoderKind::Sound);
            assert!(matches!(
                source.downcast_ref::<DecodeError>(),
                Some(DecodeError::InvalidSampleRate(0))
            ));
        }
        other => panic!("expected creation error, got {:?}", other.err()),
    }
    match system.create_music(&file) {
        Err(AudioError::Creation { kind, source, .. }) => {
            assert_eq!(kind, DecoderKind::Music);
            assert!(matches!(
                source.downcast_ref::<DecodeError>(),
                Some(DecodeError::InvalidSampleRate(0))
            ));
        }
        other => panic!("expected creation error, got {:?}", other.err()),
    }
    assert_eq!(system.music_count(), 0);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn test_uppercase_extension_uses_builtin_decoder() {
    let (mut system, _device) = system(2);
    let sound = system.create_sound(&wav("JUMP.WAV", 1, 2205)).unwrap();
    assert_eq!(sound.duration(), Duration::from_millis(100));
    system.dispose_sound(sound);
}

#[test]
fn test_custom_format_registration() {
    let (mut system, device) = system(2);
    system
        .register_sound("raw", decoder::buffered_sound::<RawSource>)
        .unwrap();
    let mut sound = system
        .create_sound(&RawSource::file("beep.raw", &[10, 20, 30]))
        .unwrap();

    let voice = sound.play(system.streams_mut(), 0.8).unwrap();
    assert_eq!(device.voice(voice).unwrap().state, VoiceState::Playing);
    system.dispose_sound(sound);
    assert_eq!(device.live_buffers(), 0);
}

// =============================================================
// Music tracking and update
// =============================================================

#[test]
fn test_update_without_music() {
    let (mut system, _device) = system(2);
    system.update();
    assert_eq!(system.music_count(), 0);
}

#[test]
fn test_music_lifecycle() {
    let (mut system, device) = system(2);
    let id = system.create_music(&wav("theme.wav", 2, 22_050)).unwrap();
    assert_eq!(system.music_ids(), vec![id]);

    let mut control = system.music(id).unwrap();
    control.set_volume(0.5);
    control.play();
    assert!(control.is_playing());
    assert_eq!(control.volume(), 0.5);

    let voice = *system
        .streams()
        .all_streams()
        .iter()
        .find(|v| !system.streams().is_idle(**v))
        .unwrap();
    assert_eq!(device.voice(voice).unwrap().queued, MUSIC_BUFFER_COUNT);

    device.process(voice, 1);
    system.update();
    assert_eq!(device.voice(voice).unwrap().queued, MUSIC_BUFFER_COUNT);
    assert!(system.music(id).unwrap().position() > Duration::ZERO);

    assert!(system.dispose_music(id));
    assert!(!system.dispose_music(id));
    assert!(system.music(id).is_none());
    assert!(system.streams().is_idle(voice));
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn test_music_plays_to_end_and_frees_voice() {
    let (mut system, device) = system(1);
    // Shorter than one queue buffer
    let id = system.create_music(&wav("sting.wav", 1, 1000)).unwrap();
    system.music(id).unwrap().play();
    let voice = system.streams().all_streams()[0];
    assert!(!system.streams().is_idle(voice));

    device.finish(voice);
    system.update();

    assert!(!system.music(id).unwrap().is_playing());
    assert!(system.streams().is_idle(voice));
    assert_eq!(system.music_count(), 1);
}

#[test]
fn test_music_exhausts_pool_gracefully() {
    let (mut system, _device) = system(1);
    let first = system.create_music(&wav("a.wav", 1, 10_000)).unwrap();
    let second = system.create_music(&wav("b.wav", 1, 10_000)).unwrap();

    system.music(first).unwrap().play();
    system.music(second).unwrap().play();

    assert!(system.music(first).unwrap().is_playing());
    assert!(!system.music(second).unwrap().is_playing());
}

// =============================================================
// Teardown
// =============================================================

#[test]
fn test_dispose_leaves_nothing_playing() {
    let (mut system, device) = system(4);
    let mut sound = system.create_sound(&wav("hit.wav", 1, 500)).unwrap();
    sound.play(system.streams_mut(), 1.0).unwrap();
    let id = system.create_music(&wav("theme.wav", 2, 20_000)).unwrap();
    system.music(id).unwrap().play();
    let voices = system.streams().all_streams().to_vec();

    system.dispose();

    for voice in voices {
        assert!(device.voice(voice).is_none());
    }
    assert_eq!(device.live_voices(), 0);
    assert_eq!(device.live_buffers(), 0);
    assert!(device.is_shut_down());
}

#[test]
fn test_drop_tears_down() {
    let device = HeadlessBackend::new();
    {
        let mut system = AudioSystem::new(device.clone(), &AudioConfig::default()).unwrap();
        system.create_music(&wav("theme.wav", 1, 5000)).unwrap();
    }
    assert!(device.is_shut_down());
    assert_eq!(device.live_voices(), 0);
}

#[test]
fn test_dispose_sound_releases_buffer() {
    let (mut system, device) = system(2);
    let sound = system.create_sound(&wav("hit.wav", 1, 500)).unwrap();
    assert_eq!(device.live_buffers(), 1);

    system.dispose_sound(sound);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn test_dropped_sound_held_until_shutdown() {
    let (mut system, device) = system(2);
    drop(system.create_sound(&wav("hit.wav", 1, 500)).unwrap());
    assert_eq!(device.live_buffers(), 1);

    system.dispose();
    assert_eq!(device.live_buffers(), 0);
}
