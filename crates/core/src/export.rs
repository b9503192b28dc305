//! Write the finished timeline to disk as MP3 (LAME) or 16-bit WAV.
//!
//! Output is written into a temporary file beside the target and renamed
//! over it only once encoding succeeded, so a failed export never leaves a
//! partial file at the requested path.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;

use crate::audio::clip::AudioClip;
use crate::audio::io::{to_i16, write_wav};
use crate::error::{MixError, Result};

/// Samples handed to the encoder per call.
const SAMPLES_PER_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Mp3,
    Wav,
}

impl ExportFormat {
    /// `.wav` targets get PCM WAV; everything else is encoded as MP3.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wav") => ExportFormat::Wav,
            _ => ExportFormat::Mp3,
        }
    }
}

/// Map a requested bitrate to the nearest supported LAME constant.
fn lame_bitrate(kbps: u32) -> mp3lame_encoder::Bitrate {
    use mp3lame_encoder::Bitrate;
    match kbps {
        0..=64 => Bitrate::Kbps64,
        65..=96 => Bitrate::Kbps96,
        97..=128 => Bitrate::Kbps128,
        129..=192 => Bitrate::Kbps192,
        193..=256 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

/// Encode a mono clip to an in-memory MP3 stream.
pub fn encode_mp3(clip: &AudioClip, bitrate_kbps: u32) -> anyhow::Result<Vec<u8>> {
    use mp3lame_encoder::{Builder, FlushNoGap, MonoPcm, Quality};

    let mut builder = Builder::new().context("Failed to create LAME encoder")?;
    builder
        .set_num_channels(1)
        .map_err(|e| anyhow!("Failed to set channels: {:?}", e))?;
    builder
        .set_sample_rate(clip.sample_rate)
        .map_err(|e| anyhow!("Failed to set sample rate {}: {:?}", clip.sample_rate, e))?;
    builder
        .set_brate(lame_bitrate(bitrate_kbps))
        .map_err(|e| anyhow!("Failed to set bitrate: {:?}", e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| anyhow!("Failed to set quality: {:?}", e))?;
    let mut encoder = builder
        .build()
        .map_err(|e| anyhow!("Failed to build encoder: {:?}", e))?;

    let mut mp3 = Vec::new();
    let mut pcm = Vec::with_capacity(SAMPLES_PER_CHUNK);

    for chunk in clip.samples.chunks(SAMPLES_PER_CHUNK) {
        pcm.clear();
        pcm.extend(chunk.iter().map(|&s| to_i16(s)));
        mp3.reserve(mp3lame_encoder::max_required_buffer_size(pcm.len()));
        encoder
            .encode_to_vec(MonoPcm(pcm.as_slice()), &mut mp3)
            .map_err(|e| anyhow!("Encoding failed: {:?}", e))?;
    }

    mp3.reserve(mp3lame_encoder::max_required_buffer_size(0));
    encoder
        .flush_to_vec::<FlushNoGap>(&mut mp3)
        .map_err(|e| anyhow!("Failed to flush encoder: {:?}", e))?;

    Ok(mp3)
}

/// Create `target` through a uniquely named temp file in its directory.
///
/// `fill` writes the content; the temp file replaces `target` only if it
/// returns `Ok`, and is removed otherwise.
pub(crate) fn write_atomically<F>(target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&NamedTempFile) -> Result<()>,
{
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| MixError::export(target, e))?;

    let tmp = tempfile::Builder::new()
        .prefix(".fabmix-")
        .suffix(".part")
        .tempfile_in(&dir)
        .map_err(|e| MixError::export(target, e))?;

    fill(&tmp)?;
    tmp.persist(target).map_err(|e| MixError::export(target, e.error))?;
    Ok(())
}

/// Write `bytes` to the temp file and flush them to disk.
pub(crate) fn write_bytes(tmp: &NamedTempFile, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tmp.as_file();
    file.write_all(bytes).map_err(|e| MixError::export(target, e))?;
    file.sync_all().map_err(|e| MixError::export(target, e))
}

/// Export `clip` to `path`, returning the path on success.
pub fn export_clip(clip: &AudioClip, path: &Path, bitrate_kbps: u32) -> Result<PathBuf> {
    let format = ExportFormat::from_path(path);
    write_atomically(path, |tmp| match format {
        ExportFormat::Wav => {
            write_wav(tmp.path(), clip).map_err(|e| MixError::export(path, format!("{:#}", e)))
        }
        ExportFormat::Mp3 => {
            let bytes =
                encode_mp3(clip, bitrate_kbps).map_err(|e| MixError::export(path, format!("{:#}", e)))?;
            write_bytes(tmp, path, &bytes)
        }
    })?;

    log::debug!("Exported {:?} ({:.0} ms) to {}", format, clip.duration_ms(), path.display());
    Ok(path.to_path_buf())
}
