//! Mix manifest: a JSON record of what went into an episode and where
//! each piece landed, written next to the exported audio.
//!
//! Two mixes of byte-identical inputs produce identical manifests, which
//! makes re-runs easy to compare.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MixError, Result};
use crate::export::{write_atomically, write_bytes};
use crate::mix::MixOutcome;
use crate::source::FileClipSource;
use crate::types::{BedPlacement, MixPlan, PlacedSegment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDigest {
    pub locator: String,
    pub path: PathBuf,
    /// SHA-256 of the file contents, or `None` if it could not be read.
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixManifest {
    pub output: PathBuf,
    pub sample_rate: u32,
    pub duration_ms: f64,
    pub segments: Vec<PlacedSegment>,
    pub background: Option<BedPlacement>,
    pub sources: Vec<SourceDigest>,
}

impl MixManifest {
    pub fn new(output: &Path, plan: &MixPlan, outcome: &MixOutcome, source: &FileClipSource) -> Self {
        let sources = plan
            .audio_paths
            .iter()
            .map(|locator| {
                let path = source.resolve(locator);
                let sha256 = match file_hash(&path) {
                    Ok(h) => Some(h),
                    Err(e) => {
                        log::warn!("Could not hash {}: {}", path.display(), e);
                        None
                    }
                };
                SourceDigest {
                    locator: locator.clone(),
                    path,
                    sha256,
                }
            })
            .collect();

        Self {
            output: output.to_path_buf(),
            sample_rate: outcome.clip.sample_rate,
            duration_ms: outcome.clip.duration_ms(),
            segments: outcome.segments.clone(),
            background: outcome.background.clone(),
            sources,
        }
    }

    /// Where the manifest for `output` lives: `<output>.json`.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Write as pretty JSON beside the output. Returns the manifest path.
    pub fn write(&self) -> Result<PathBuf> {
        let path = Self::path_for(&self.output);
        let json = serde_json::to_vec_pretty(self).map_err(|e| MixError::export(&path, e))?;
        write_atomically(&path, |tmp| write_bytes(tmp, &path, &json))?;
        log::debug!("Wrote manifest {}", path.display());
        Ok(path)
    }
}

/// Hex SHA-256 digest of the file at `path`, streamed in fixed-size reads.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
