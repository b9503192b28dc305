//! Narrated story episode mixing: resolve and decode clips, composite them
//! by mixing mode onto one timeline, and export the result.

pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod manifest;
pub mod mix;
pub mod plan;
pub mod retry;
pub mod source;
pub mod types;

pub use audio::clip::AudioClip;
pub use config::MixConfig;
pub use error::{MixError, Result};
pub use mix::{MixOutcome, Mixer};
pub use source::{ClipSource, FileClipSource, SampleLibrary};
pub use types::{MixPlan, MixingMode};
