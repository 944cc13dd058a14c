//! Nether-Audio: voice pool, decoder registry and music streaming
//!
//! Sits on top of an OpenAL-style hardware binding (voices, buffers, a
//! listener) and manages the parts every game needs:
//!
//! - A fixed pool of voices shared between music (exclusive ownership) and
//!   sound effects (transient reuse)
//! - An extension-keyed registry of sound and music decoders, open to new
//!   formats
//! - A cooperative per-frame update that keeps streamed music fed
//!
//! Everything runs on the thread that owns the [`AudioSystem`]; there are no
//! locks and no background threads. Hardware state is polled, never pushed.
//!
//! # Usage
//!
//! ```ignore
//! use nether_audio::{AudioConfig, AudioSystem, FileHandle, HeadlessBackend};
//!
//! let mut audio = AudioSystem::new(HeadlessBackend::new(), &AudioConfig::load())?;
//!
//! let mut jump = audio.create_sound(&FileHandle::from_path("sfx/jump.wav"))?;
//! jump.play(audio.streams_mut(), 1.0);
//!
//! let theme = audio.create_music(&FileHandle::from_path("music/theme.ogg"))?;
//! if let Some(mut music) = audio.music(theme) {
//!     music.set_looping(true);
//!     music.play();
//! }
//!
//! loop {
//!     audio.update(); // once per frame
//! #   break;
//! }
//!
//! audio.dispose();
//! ```

pub mod backend;
pub mod config;
pub mod decoder;
#[cfg(feature = "pcm-device")]
pub mod device;
pub mod error;
pub mod file;
pub mod headless;
pub mod music;
pub mod registry;
pub mod sound;
pub mod streams;
pub mod system;

pub use backend::{AudioBackend, BufferId, Listener, PcmFormat, VoiceId, VoiceState};
pub use config::AudioConfig;
#[cfg(feature = "pcm-device")]
pub use device::{AudioDevice, AudioRecorder};
pub use error::{AudioError, BackendError, BoxError, ConfigError, DecodeError, DecoderKind};
pub use file::FileHandle;
pub use headless::HeadlessBackend;
pub use music::{MusicControl, MusicId};
pub use registry::{DecoderRegistry, MusicFactory, SoundFactory};
pub use sound::{Music, Sound};
pub use streams::{StreamOwnership, StreamPool};
pub use system::AudioSystem;
