//! Mixer tunables. Defaults reproduce the house episode format.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MixError, Result};
use crate::mix::envelope::Envelope;

/// Environment variable naming the default sample library root.
pub const LIBRARY_DIR_ENV: &str = "FABMIX_LIBRARY_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Mixing and export sample rate; every clip is conformed to it.
    pub sample_rate: u32,
    /// MP3 bitrate in kbps.
    pub bitrate_kbps: u32,

    /// Lead-in skipped from the start of an opening clip.
    pub opening_skip_ms: f64,
    /// Trim applied to the whole opening bed before its envelope.
    pub opening_gain_db: f64,
    /// Full-volume section before a bed ducks (opening cold open, background intro).
    pub bed_lead_ms: f64,
    /// Level of a ducked bed relative to its full level.
    pub bed_reduced_db: f64,
    /// Length of each crossfade between full and reduced level.
    pub envelope_fade_ms: f64,
    /// Full-volume hold in the closing transition.
    pub closing_hold_ms: f64,
    /// Longest closing transition (fade up, hold, fade out).
    pub closing_ms: f64,

    pub title_lead_silence_ms: f64,
    pub title_tail_silence_ms: f64,

    /// Sound effects in exclusive mode are cut to this length.
    pub exclusive_max_ms: f64,
    /// Exclusive effects longer than this get a fade-out.
    pub exclusive_fade_threshold_ms: f64,
    pub exclusive_fade_ms: f64,

    /// Unducked sound-effect lead before the paired narration starts.
    pub overlay_lead_ms: f64,
    /// Longest stretch of effect laid under the narration.
    pub overlay_window_ms: f64,
    pub overlay_reduced_db: f64,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bitrate_kbps: 192,
            opening_skip_ms: 6000.0,
            opening_gain_db: -5.0,
            bed_lead_ms: 3000.0,
            bed_reduced_db: -15.0,
            envelope_fade_ms: 2000.0,
            closing_hold_ms: 2000.0,
            closing_ms: 6000.0,
            title_lead_silence_ms: 1000.0,
            title_tail_silence_ms: 3000.0,
            exclusive_max_ms: 5000.0,
            exclusive_fade_threshold_ms: 3000.0,
            exclusive_fade_ms: 2000.0,
            overlay_lead_ms: 3000.0,
            overlay_window_ms: 6000.0,
            overlay_reduced_db: -10.0,
        }
    }
}

impl MixConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| MixError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// The bed envelope shared by openings and background music.
    pub fn bed_envelope(&self) -> Envelope {
        Envelope {
            lead_ms: self.bed_lead_ms,
            fade_ms: self.envelope_fade_ms,
            reduced_db: self.bed_reduced_db,
            hold_ms: self.closing_hold_ms,
            closing_ms: self.closing_ms,
        }
    }
}

/// Library directory from `FABMIX_LIBRARY_DIR`, if set.
pub fn library_dir_from_env() -> Option<PathBuf> {
    std::env::var_os(LIBRARY_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
