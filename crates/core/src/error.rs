//! Error type for mixing, plan building, and export.

use std::path::PathBuf;

/// Result alias carrying [`MixError`].
pub type Result<T> = std::result::Result<T, MixError>;

/// Everything that can go wrong between reading a MixPlan and writing
/// the finished episode.
#[derive(Debug, thiserror::Error)]
pub enum MixError {
    /// `audio_paths` and `mixing_instructions` differ in length.
    #[error("audio_paths has {audio_paths} entries but mixing_instructions has {mixing_instructions}")]
    ShapeMismatch {
        audio_paths: usize,
        mixing_instructions: usize,
    },

    /// Both the primary and the fallback decoder rejected a clip.
    #[error("failed to load clip #{index} ({locator}): {primary}; fallback decoder: {fallback}")]
    ClipLoad {
        index: usize,
        locator: String,
        primary: String,
        fallback: String,
    },

    /// `opening` or `title` sits at the last index with nothing to pair.
    #[error("mode '{mode}' at index {index} needs a following narration clip")]
    MissingPairedClip { index: usize, mode: String },

    #[error("failed to write {}: {reason}", path.display())]
    Export { path: PathBuf, reason: String },

    #[error("invalid plan: {0}")]
    PlanParse(String),

    #[error("invalid annotated story: {0}")]
    StoryParse(String),

    #[error("invalid mixer config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// A story tag has no entry in the sound-effect table.
    #[error("tag <{0}> has no sound effect entry")]
    UnknownTag(String),

    /// A sound effect names a sample the library does not contain.
    #[error("sample '{name}' (tag <{tag}>) not found in sample library")]
    UnknownSample { tag: String, name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MixError {
    /// Whether an orchestrator may reasonably retry the whole operation.
    ///
    /// Only clip loads and raw I/O can be transient; malformed plans and
    /// pairing violations fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MixError::ClipLoad { .. } | MixError::Io(_))
    }

    pub(crate) fn export(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        MixError::Export {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}
