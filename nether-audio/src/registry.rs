//! Extension-keyed decoder registry
//!
//! Maps a file extension to a factory that builds a [`Sound`] or [`Music`]
//! for that format. Registration is open: applications can add formats or
//! replace the built-in decoders at any time, and the last registration for an
//! extension wins.

use std::any::type_name;

use hashbrown::HashMap;
use tracing::debug;

use crate::error::{AudioError, BoxError, DecoderKind};
use crate::file::FileHandle;
use crate::sound::{Music, Sound};
use crate::streams::StreamPool;

/// Builds a [`Sound`] for a file
pub type SoundFactory =
    Box<dyn Fn(&mut StreamPool, &FileHandle) -> Result<Box<dyn Sound>, BoxError>>;

/// Builds a [`Music`] for a file
pub type MusicFactory =
    Box<dyn Fn(&mut StreamPool, &FileHandle) -> Result<Box<dyn Music>, BoxError>>;

struct Registration<F> {
    /// Factory type name, reported when construction fails
    decoder: &'static str,
    factory: F,
}

/// Registry of sound and music decoders keyed by lowercase extension
#[derive(Default)]
pub struct DecoderRegistry {
    sounds: HashMap<String, Registration<SoundFactory>>,
    music: HashMap<String, Registration<MusicFactory>>,
}

/// Normalize a registration key: trimmed, no leading dot, lowercase
fn normalize_extension(extension: &str) -> Result<String, AudioError> {
    let trimmed = extension.trim();
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(AudioError::InvalidArgument(
            "extension cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_ascii_lowercase())
}

impl DecoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sound decoder for `extension`, replacing any earlier one
    pub fn register_sound<F>(&mut self, extension: &str, factory: F) -> Result<(), AudioError>
    where
        F: Fn(&mut StreamPool, &FileHandle) -> Result<Box<dyn Sound>, BoxError> + 'static,
    {
        let key = normalize_extension(extension)?;
        let decoder = type_name::<F>();
        let previous = self.sounds.insert(
            key.clone(),
            Registration {
                decoder,
                factory: Box::new(factory),
            },
        );
        if let Some(previous) = previous {
            debug!(
                "Sound decoder for .{} replaced: {} -> {}",
                key, previous.decoder, decoder
            );
        }
        Ok(())
    }

    /// Register the music decoder for `extension`, replacing any earlier one
    pub fn register_music<F>(&mut self, extension: &str, factory: F) -> Result<(), AudioError>
    where
        F: Fn(&mut StreamPool, &FileHandle) -> Result<Box<dyn Music>, BoxError> + 'static,
    {
        let key = normalize_extension(extension)?;
        let decoder = type_name::<F>();
        let previous = self.music.insert(
            key.clone(),
            Registration {
                decoder,
                factory: Box::new(factory),
            },
        );
        if let Some(previous) = previous {
            debug!(
                "Music decoder for .{} replaced: {} -> {}",
                key, previous.decoder, decoder
            );
        }
        Ok(())
    }

    /// Build a sound for `file` with the decoder registered for its extension
    pub fn create_sound(
        &self,
        streams: &mut StreamPool,
        file: &FileHandle,
    ) -> Result<Box<dyn Sound>, AudioError> {
        let registration = lookup(&self.sounds, DecoderKind::Sound, file)?;
        debug!("Creating sound {} with {}", file, registration.decoder);
        (registration.factory)(streams, file).map_err(|source| AudioError::Creation {
            kind: DecoderKind::Sound,
            decoder: registration.decoder,
            file: file.to_string(),
            source,
        })
    }

    /// Build a music instance for `file` with the decoder registered for its
    /// extension
    pub fn create_music(
        &self,
        streams: &mut StreamPool,
        file: &FileHandle,
    ) -> Result<Box<dyn Music>, AudioError> {
        let registration = lookup(&self.music, DecoderKind::Music, file)?;
        debug!("Creating music {} with {}", file, registration.decoder);
        (registration.factory)(streams, file).map_err(|source| AudioError::Creation {
            kind: DecoderKind::Music,
            decoder: registration.decoder,
            file: file.to_string(),
            source,
        })
    }

    /// Extensions with a sound decoder, sorted
    pub fn sound_extensions(&self) -> Vec<&str> {
        sorted_keys(&self.sounds)
    }

    /// Extensions with a music decoder, sorted
    pub fn music_extensions(&self) -> Vec<&str> {
        sorted_keys(&self.music)
    }
}

fn lookup<'a, F>(
    map: &'a HashMap<String, Registration<F>>,
    kind: DecoderKind,
    file: &FileHandle,
) -> Result<&'a Registration<F>, AudioError> {
    map.get(file.extension().to_ascii_lowercase().as_str())
        .ok_or_else(|| AudioError::UnsupportedFormat {
            kind,
            file: file.to_string(),
        })
}

fn sorted_keys<F>(map: &HashMap<String, Registration<F>>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::backend::VoiceId;
    use crate::error::DecodeError;
    use crate::headless::HeadlessBackend;

    /// Sound that does nothing
    struct Silent;

    impl Sound for Silent {
        fn play_with(&mut self, _: &mut StreamPool, _: f32, _: f32, _: bool) -> Option<VoiceId> {
            None
        }
        fn stop(&mut self, _: &mut StreamPool) {}
        fn duration(&self) -> Duration {
            Duration::ZERO
        }
        fn dispose(self: Box<Self>, _: &mut StreamPool) {}
    }

    fn factory_a(_: &mut StreamPool, _: &FileHandle) -> Result<Box<dyn Sound>, BoxError> {
        Ok(Box::new(Silent))
    }

    fn streams() -> StreamPool {
        StreamPool::new(Box::new(HeadlessBackend::new()), 2)
    }

    #[test]
    fn test_empty_extension_rejected() {
        let mut registry = DecoderRegistry::new();
        for ext in ["", "   ", "."] {
            let err = registry.register_sound(ext, factory_a).unwrap_err();
            assert!(matches!(err, AudioError::InvalidArgument(_)));
        }
        assert!(registry.sound_extensions().is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = DecoderRegistry::new();
        let built_by = Rc::new(Cell::new(""));

        let seen = Rc::clone(&built_by);
        registry
            .register_sound("ogg", move |_: &mut StreamPool, _: &FileHandle| {
                seen.set("A");
                Ok(Box::new(Silent) as Box<dyn Sound>)
            })
            .unwrap();
        let seen = Rc::clone(&built_by);
        registry
            .register_sound("ogg", move |_: &mut StreamPool, _: &FileHandle| {
                seen.set("B");
                Ok(Box::new(Silent) as Box<dyn Sound>)
            })
            .unwrap();

        let mut pool = streams();
        let file = FileHandle::from_bytes("jump.ogg", Vec::<u8>::new());
        let sound = registry.create_sound(&mut pool, &file).unwrap();
        assert_eq!(built_by.get(), "B");
        assert_eq!(sound.duration(), Duration::ZERO);
        assert_eq!(registry.sound_extensions(), vec!["ogg"]);
    }

    #[test]
    fn test_unregistered_extension_is_unsupported() {
        let mut registry = DecoderRegistry::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        registry
            .register_sound("ogg", move |_: &mut StreamPool, _: &FileHandle| {
                counter.set(counter.get() + 1);
                Ok(Box::new(Silent) as Box<dyn Sound>)
            })
            .unwrap();

        let mut pool = streams();
        let file = FileHandle::from_bytes("blip.xyz", Vec::<u8>::new());
        let err = registry.create_sound(&mut pool, &file).err().unwrap();
        assert!(matches!(
            err,
            AudioError::UnsupportedFormat {
                kind: DecoderKind::Sound,
                ..
            }
        ));
        assert_eq!(calls.get(), 0);

        let err = registry.create_music(&mut pool, &file).err().unwrap();
        assert!(matches!(
            err,
            AudioError::UnsupportedFormat {
                kind: DecoderKind::Music,
                ..
            }
        ));
    }

    #[test]
    fn test_file_without_extension_is_unsupported() {
        let mut registry = DecoderRegistry::new();
        registry.register_sound("ogg", factory_a).unwrap();
        let mut pool = streams();
        let file = FileHandle::from_bytes("README", Vec::<u8>::new());
        assert!(matches!(
            registry.create_sound(&mut pool, &file),
            Err(AudioError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = DecoderRegistry::new();
        registry.register_sound(".OGG", factory_a).unwrap();
        assert_eq!(registry.sound_extensions(), vec!["ogg"]);

        let mut pool = streams();
        let file = FileHandle::from_bytes("LOUD.Ogg", Vec::<u8>::new());
        assert!(registry.create_sound(&mut pool, &file).is_ok());
    }

    #[test]
    fn test_factory_failure_wraps_cause() {
        let mut registry = DecoderRegistry::new();
        registry
            .register_sound("wav", |_: &mut StreamPool, _: &FileHandle| {
                Err(Box::new(DecodeError::UnsupportedChannels(6)) as BoxError)
            })
            .unwrap();

        let mut pool = streams();
        let file = FileHandle::from_bytes("surround.wav", Vec::<u8>::new());
        match registry.create_sound(&mut pool, &file) {
            Err(AudioError::Creation {
                kind,
                decoder,
                file,
                source,
            }) => {
                assert_eq!(kind, DecoderKind::Sound);
                assert_eq!(file, "surround.wav");
                assert!(decoder.contains("registry"));
                assert!(source.downcast_ref::<DecodeError>().is_some());
            }
            other => panic!("expected creation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_sound_and_music_tables_are_independent() {
        let mut registry = DecoderRegistry::new();
        registry.register_sound("ogg", factory_a).unwrap();
        assert_eq!(registry.sound_extensions(), vec!["ogg"]);
        assert!(registry.music_extensions().is_empty());

        let mut pool = streams();
        let file = FileHandle::from_bytes("theme.ogg", Vec::<u8>::new());
        assert!(matches!(
            registry.create_music(&mut pool, &file),
            Err(AudioError::UnsupportedFormat { .. })
        ));
    }
}
