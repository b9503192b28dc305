use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{MixError, Result};

/// How a clip is composited into the episode timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixingMode {
    /// Music bed: cold open, then ducked under the next (narration) clip.
    Opening,
    /// Silence-padded narration; the next clip is the spoken title.
    Title,
    /// Background bed declared at the current position, rendered after the main pass.
    BgMusic,
    /// Narration, appended verbatim.
    Story,
    /// Sound effect that plays alone, capped and faded.
    Exclusive,
    /// Sound effect that runs under the start of the next narration clip.
    Overlay,
}

impl MixingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixingMode::Opening => "opening",
            MixingMode::Title => "title",
            MixingMode::BgMusic => "bg_music",
            MixingMode::Story => "story",
            MixingMode::Exclusive => "exclusive",
            MixingMode::Overlay => "overlay",
        }
    }
}

impl fmt::Display for MixingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mixer's input: parallel lists of clip locators and mixing modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixPlan {
    pub audio_paths: Vec<String>,
    pub mixing_instructions: Vec<MixingMode>,
    /// Narration text, one entry per `story` clip produced from it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_segments: Vec<String>,
}

impl MixPlan {
    pub fn new(audio_paths: Vec<String>, mixing_instructions: Vec<MixingMode>) -> Self {
        Self {
            audio_paths,
            mixing_instructions,
            text_segments: Vec::new(),
        }
    }

    /// Parse a plan from JSON and check its shape.
    pub fn from_json(json: &str) -> Result<Self> {
        let plan: MixPlan =
            serde_json::from_str(json).map_err(|e| MixError::PlanParse(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio_paths.len() != self.mixing_instructions.len() {
            return Err(MixError::ShapeMismatch {
                audio_paths: self.audio_paths.len(),
                mixing_instructions: self.mixing_instructions.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.audio_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_paths.is_empty()
    }
}

/// One stretch of the output timeline attributed to a plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSegment {
    /// Plan index that produced this audio.
    pub index: usize,
    pub mode: MixingMode,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// Where and how long the background bed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedPlacement {
    pub index: usize,
    pub offset_ms: f64,
    pub duration_ms: f64,
    /// Number of times the source clip was tiled before trimming.
    pub loops: usize,
}
