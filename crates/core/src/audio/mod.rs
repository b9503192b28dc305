//! Audio buffers, sample-level effects, and codec I/O.

pub mod clip;
pub mod effects;
pub mod io;
