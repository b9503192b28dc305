//! The timeline mixer: mode dispatch, bed envelopes, and the background post-pass.

pub mod bed;
pub mod envelope;
pub mod mixer;
pub mod timeline;

pub use mixer::{MixOutcome, Mixer};
