//! Audio I/O: compressed-format decoding, PCM WAV read/write, resampling.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use super::clip::AudioClip;

/// Average interleaved frames down to one channel.
fn downmix(interleaved: &[f64], channels: usize, out: &mut Vec<f64>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        out.push(frame.iter().sum::<f64>() / channels as f64);
    }
}

/// Read a PCM WAV file with hound.
///
/// - Normalizes int formats to f64 in [-1, 1]
/// - Passes through float WAVs as f64
/// - Averages multi-channel audio to mono
pub fn read_wav(path: &Path) -> Result<AudioClip> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read WAV samples")?,
    };

    let mut samples = Vec::with_capacity(interleaved.len() / channels.max(1));
    downmix(&interleaved, channels, &mut samples);
    Ok(AudioClip::new(samples, spec.sample_rate))
}

/// Write a clip to a 16-bit PCM mono WAV file.
///
/// Clips values to [-1, 1] before conversion.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in &clip.samples {
        writer.write_sample(to_i16(sample))?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Clamp to [-1, 1] and quantize to 16 bits.
pub fn to_i16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f64) as i16
}

/// Resample audio from source sample rate to target sample rate.
///
/// Uses rubato's sinc resampler. The result is padded or trimmed to
/// exactly `round(len * to / from)` samples so clip durations survive
/// the conversion.
pub fn resample(samples: &[f64], from_sr: u32, to_sr: u32) -> Result<Vec<f64>> {
    if from_sr == to_sr {
        return Ok(samples.to_vec());
    }

    if samples.is_empty() {
        return Ok(vec![]);
    }

    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_sr as f64 / from_sr as f64;
    let mut resampler = SincFixedIn::<f64>::new(ratio, 2.0, params, samples.len(), 1)?;

    // The sinc filter lags its input; flush with silence until the tail
    // has come out, then drop the leading delay.
    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let mut output: Vec<f64> = Vec::with_capacity(delay + expected);
    let first = resampler.process(&[samples], None)?;
    output.extend(first.into_iter().next().unwrap_or_default());

    while output.len() < delay + expected {
        let flushed = resampler.process_partial(None::<&[Vec<f64>]>, None)?;
        let chunk = flushed.into_iter().next().unwrap_or_default();
        if chunk.is_empty() {
            break;
        }
        output.extend(chunk);
    }

    let mut resampled: Vec<f64> = output.into_iter().skip(delay).collect();
    resampled.resize(expected, 0.0);
    Ok(resampled)
}

/// Bring a decoded clip to the mixing sample rate.
pub fn conform_rate(clip: AudioClip, target_sr: u32) -> Result<AudioClip> {
    if clip.sample_rate == target_sr {
        return Ok(clip);
    }
    log::debug!("Resampling clip {} Hz -> {} Hz", clip.sample_rate, target_sr);
    let samples = resample(&clip.samples, clip.sample_rate, target_sr)?;
    Ok(AudioClip::new(samples, target_sr))
}

/// Decode any supported container/codec (WAV, MP3, AAC/MP4, ADPCM) to mono.
///
/// The file extension is passed to symphonia's probe as a hint.
pub fn decode_file(path: &Path) -> Result<AudioClip> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unsupported format: {}", path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported codec")?;

    let mut samples: Vec<f64> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                let mut sample_buf = SampleBuffer::<f64>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                downmix(sample_buf.samples(), spec.channels.count(), &mut samples);
            }
            Err(SymphError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if samples.is_empty() {
        anyhow::bail!("No audio decoded from {}", path.display());
    }

    Ok(AudioClip::new(samples, sample_rate))
}
