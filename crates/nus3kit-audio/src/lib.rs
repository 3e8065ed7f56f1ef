//! nus3kit Audio Backend
//!
//! This crate produces .nus3audio stream containers for music mods and
//! reads the loop metadata the game needs to play them. The heavy lifting
//! is delegated to external tools; this crate owns the orchestration:
//!
//! - [`builder`] - container generation: passthrough copy for inputs that
//!   are containers already, conversion for decoder-only formats, and the
//!   two-step init/embed invocation of the container tool
//! - [`convert`] - codec conversion with a primary target and a one-shot
//!   fallback format
//! - [`metadata`] - cue-point probing with anomaly classification
//! - [`tool`] - the nus3audio container tool wrapper
//! - [`process`] - subprocess plumbing behind the [`ToolRunner`] capability
//! - [`error`] - error types
//!
//! # External tools
//!
//! Three executables are involved, each resolved through an explicit path,
//! the tools directory, an environment variable, then PATH:
//!
//! | Tool | Role | Env override |
//! |------|------|--------------|
//! | `nus3audio` | build/extend containers | `NUS3AUDIO_PATH` |
//! | `VGAudioCli` | codec conversion | `VGAUDIO_PATH` |
//! | `vgmstream-cli` | loop metadata probe | `VGMSTREAM_PATH` |
//!
//! Every invocation runs under a kill-on-expiry timeout, so a wedged tool
//! cannot wedge the caller.
//!
//! # Example
//!
//! ```no_run
//! use nus3kit_audio::builder::Nus3AudioBuilder;
//! use nus3kit_audio::convert::AudioConverter;
//! use nus3kit_audio::tool::{self, Nus3AudioTool};
//! use std::path::Path;
//!
//! let exe = tool::find_nus3audio(None, Some(Path::new("tools")))?;
//! let builder = Nus3AudioBuilder::new(
//!     Nus3AudioTool::new(exe),
//!     AudioConverter::new("tools/VGAudio/VGAudioCli", "lopus", "idsp"),
//!     std::env::temp_dir(),
//! );
//! builder.generate(
//!     "bgm_new_song",
//!     Path::new("inputs/new_song.brstm"),
//!     Path::new("out/bgm_new_song.nus3audio"),
//! )?;
//! # Ok::<(), nus3kit_audio::AudioError>(())
//! ```

pub mod builder;
pub mod convert;
pub mod error;
pub mod metadata;
pub mod process;
pub mod tool;

// Re-export main types at crate root
pub use builder::{embedded_tone_name, Nus3AudioBuilder, DEFAULT_CONVERSION_EXTENSIONS};
pub use convert::{find_converter, AudioConverter};
pub use error::{AudioError, AudioResult};
pub use metadata::{
    find_probe, read_cue_points, AudioCuePoints, CueAnomaly, CuePointReport, MetadataSource,
    VgmstreamProbe,
};
pub use process::{SystemRunner, ToolOutput, ToolRunner, DEFAULT_TIMEOUT_SECS};
pub use tool::{find_nus3audio, Nus3AudioTool};
