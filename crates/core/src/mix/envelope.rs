//! The bed loudness envelope: full → duck → hold reduced → swell → hold full → fade out.
//!
//! Openings and background beds use the same shape, so both call
//! [`build_envelope`] with a different body length.

use crate::audio::clip::AudioClip;
use crate::audio::effects::{db_to_gain, ms_to_samples};

/// Envelope timing and depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Full-volume section before the duck.
    pub lead_ms: f64,
    /// Length of every level crossfade.
    pub fade_ms: f64,
    /// Ducked level relative to full, in dB (negative).
    pub reduced_db: f64,
    /// Full-volume hold between swell and fade-out.
    pub hold_ms: f64,
    /// Whole closing transition: swell + hold + fade-out.
    pub closing_ms: f64,
}

/// One piece of the envelope: a linear amplitude ramp over `len` samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSegment {
    pub start: usize,
    pub len: usize,
    pub from_gain: f64,
    pub to_gain: f64,
}

impl EnvelopeSegment {
    fn gain_at(&self, offset: usize) -> f64 {
        if self.len == 0 {
            return self.to_gain;
        }
        let t = offset as f64 / self.len as f64;
        self.from_gain + (self.to_gain - self.from_gain) * t
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

impl Envelope {
    /// Lay the envelope out for a body of `body` samples at `sr`.
    ///
    /// The duck ramp sits at the head of the body and is cut short (at
    /// whatever level it reached) when the body is shorter than a fade.
    pub fn segments(&self, body: usize, sr: u32) -> Vec<EnvelopeSegment> {
        let lead = ms_to_samples(self.lead_ms, sr);
        let fade = ms_to_samples(self.fade_ms, sr);
        let hold = ms_to_samples(self.hold_ms, sr);
        let closing = ms_to_samples(self.closing_ms, sr);
        let reduced = db_to_gain(self.reduced_db);

        let mut segments = Vec::with_capacity(6);
        let mut push = |start: usize, len: usize, from_gain: f64, to_gain: f64| {
            if len > 0 {
                segments.push(EnvelopeSegment { start, len, from_gain, to_gain });
            }
        };

        push(0, lead, 1.0, 1.0);

        let duck = fade.min(body);
        let duck_to = if fade == 0 {
            reduced
        } else {
            1.0 + (reduced - 1.0) * duck as f64 / fade as f64
        };
        push(lead, duck, 1.0, duck_to);
        push(lead + duck, body - duck, reduced, reduced);

        let close = lead + body;
        let swell = fade.min(closing);
        let held = hold.min(closing - swell);
        push(close, swell, reduced, 1.0);
        push(close + swell, held, 1.0, 1.0);
        push(close + swell + held, closing - swell - held, 1.0, 0.0);

        segments
    }
}

/// Apply `env` to `source`, with `body_samples` of ducked bed between the
/// lead and the closing transition.
///
/// The output is `source` truncated to `lead + body + closing` samples, or
/// shorter when the source runs out first.
pub fn build_envelope(source: &AudioClip, env: &Envelope, body_samples: usize) -> AudioClip {
    let segments = env.segments(body_samples, source.sample_rate);
    let total = segments.last().map(|s| s.end()).unwrap_or(0);
    let out_len = total.min(source.len());

    let mut samples = Vec::with_capacity(out_len);
    for seg in &segments {
        if seg.start >= out_len {
            break;
        }
        let end = seg.end().min(out_len);
        for (offset, &s) in source.samples[seg.start..end].iter().enumerate() {
            samples.push(s * seg.gain_at(offset));
        }
    }

    AudioClip::new(samples, source.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 kHz makes samples and milliseconds interchangeable.
    const SR: u32 = 1000;

    fn house() -> Envelope {
        Envelope {
            lead_ms: 3000.0,
            fade_ms: 2000.0,
            reduced_db: -15.0,
            hold_ms: 2000.0,
            closing_ms: 6000.0,
        }
    }

    fn ones(n: usize) -> AudioClip {
        AudioClip::new(vec![1.0; n], SR)
    }

    #[test]
    fn test_segments_are_contiguous() {
        let segs = house().segments(10_000, SR);
        assert_eq!(segs.len(), 6);
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start);
        }
        assert_eq!(segs.last().unwrap().end(), 3000 + 10_000 + 6000);
    }

    #[test]
    fn test_full_shape() {
        let reduced = db_to_gain(-15.0);
        let out = build_envelope(&ones(30_000), &house(), 10_000);
        assert_eq!(out.len(), 19_000);

        // lead at full volume
        assert_eq!(out.samples[0], 1.0);
        assert_eq!(out.samples[2999], 1.0);
        // halfway through the duck
        assert!((out.samples[4000] - (1.0 + reduced) / 2.0).abs() < 1e-9);
        // ducked hold
        assert!((out.samples[5000] - reduced).abs() < 1e-12);
        assert!((out.samples[12_999] - reduced).abs() < 1e-12);
        // swell back to full, then hold
        assert!((out.samples[13_000] - reduced).abs() < 1e-12);
        assert_eq!(out.samples[15_000], 1.0);
        assert_eq!(out.samples[16_999], 1.0);
        // fade out reaches silence at the very end
        assert!((out.samples[18_000] - 0.5).abs() < 1e-9);
        assert!(out.samples[18_999] < 0.001);
    }

    #[test]
    fn test_truncated_by_short_source() {
        let out = build_envelope(&ones(4000), &house(), 10_000);
        assert_eq!(out.len(), 4000);
        assert_eq!(out.samples[2999], 1.0);
        assert!(out.samples[3999] < 1.0);
    }

    #[test]
    fn test_body_shorter_than_fade_cuts_ramp() {
        let reduced = db_to_gain(-15.0);
        let segs = house().segments(1000, SR);
        let duck = segs[1];
        assert_eq!(duck.len, 1000);
        assert!((duck.to_gain - (1.0 + reduced) / 2.0).abs() < 1e-9);
        // swell still starts from the reduced level
        assert!((segs[2].from_gain - reduced).abs() < 1e-12);
    }

    #[test]
    fn test_zero_body() {
        let segs = house().segments(0, SR);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs.last().unwrap().end(), 9000);
    }

    #[test]
    fn test_source_untouched_and_rate_kept() {
        let src = ones(20_000);
        let out = build_envelope(&src, &house(), 5000);
        assert_eq!(out.sample_rate, SR);
        assert!(src.samples.iter().all(|&s| s == 1.0));
    }
}
