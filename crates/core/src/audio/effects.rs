//! Sample-level effects: silence, gain, linear fades, overlay, tiling.
//!
//! Everything here works on mono `f64` buffers and returns new buffers;
//! [`AudioClip`](super::clip::AudioClip) wraps these with a sample rate.

/// Convert a millisecond duration to a sample count at `sr`.
pub fn ms_to_samples(ms: f64, sr: u32) -> usize {
    if ms <= 0.0 {
        return 0;
    }
    (ms / 1000.0 * sr as f64).round() as usize
}

/// Convert a sample count at `sr` to milliseconds.
pub fn samples_to_ms(n: usize, sr: u32) -> f64 {
    if sr == 0 {
        return 0.0;
    }
    n as f64 * 1000.0 / sr as f64
}

/// Linear amplitude factor for a gain in dB.
pub fn db_to_gain(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}

/// Generate silence of given duration.
pub fn generate_silence(duration_ms: f64, sr: u32) -> Vec<f64> {
    vec![0.0; ms_to_samples(duration_ms, sr)]
}

/// Adjust volume by dB amount. Modifies samples in place.
pub fn adjust_volume(samples: &mut [f64], db: f64) {
    if db.abs() < 1e-9 {
        return;
    }
    let gain = db_to_gain(db);
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

/// Linear fade from silence over the first `fade_samples` samples.
///
/// The ramp is shortened to the buffer when the buffer is shorter.
pub fn fade_in(samples: &mut [f64], fade_samples: usize) {
    let n = fade_samples.min(samples.len());
    for (i, sample) in samples[..n].iter_mut().enumerate() {
        *sample *= i as f64 / n as f64;
    }
}

/// Linear fade to silence over the last `fade_samples` samples.
pub fn fade_out(samples: &mut [f64], fade_samples: usize) {
    let n = fade_samples.min(samples.len());
    let start = samples.len() - n;
    for (i, sample) in samples[start..].iter_mut().enumerate() {
        *sample *= 1.0 - (i + 1) as f64 / n as f64;
    }
}

/// Sum `top` onto `base` starting at sample `offset`.
///
/// Output length is always `base.len()`; whatever part of `top` runs past
/// the end of `base` is dropped.
pub fn overlay_at(base: &[f64], top: &[f64], offset: usize) -> Vec<f64> {
    let mut result = base.to_vec();
    if offset >= result.len() {
        return result;
    }
    for (dst, &src) in result[offset..].iter_mut().zip(top.iter()) {
        *dst += src;
    }
    result
}

/// Concatenate `samples` with itself `times` times.
pub fn tile(samples: &[f64], times: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(samples.len() * times);
    for _ in 0..times {
        result.extend_from_slice(samples);
    }
    result
}
