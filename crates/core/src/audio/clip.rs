//! Decoded mono audio buffer with a fixed sample rate.

use super::effects;

/// An immutable decoded clip.
///
/// Every transformation returns a new clip; nothing mutates in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Mono samples, nominally in [-1, 1].
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn silent(duration_ms: f64, sample_rate: u32) -> Self {
        Self::new(effects::generate_silence(duration_ms, sample_rate), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        effects::samples_to_ms(self.samples.len(), self.sample_rate)
    }

    pub fn ms_to_samples(&self, ms: f64) -> usize {
        effects::ms_to_samples(ms, self.sample_rate)
    }

    /// Samples `[start, end)`, clamped to the clip.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        Self::new(self.samples[start..end].to_vec(), self.sample_rate)
    }

    pub fn slice_ms(&self, start_ms: f64, end_ms: f64) -> Self {
        self.slice(self.ms_to_samples(start_ms), self.ms_to_samples(end_ms))
    }

    /// The first `ms` milliseconds (or the whole clip if shorter).
    pub fn head_ms(&self, ms: f64) -> Self {
        self.slice(0, self.ms_to_samples(ms))
    }

    /// Everything after the first `ms` milliseconds.
    pub fn skip_ms(&self, ms: f64) -> Self {
        self.slice(self.ms_to_samples(ms), self.samples.len())
    }

    pub fn gain(&self, db: f64) -> Self {
        let mut samples = self.samples.clone();
        effects::adjust_volume(&mut samples, db);
        Self::new(samples, self.sample_rate)
    }

    pub fn fade_in(&self, ms: f64) -> Self {
        let mut samples = self.samples.clone();
        effects::fade_in(&mut samples, self.ms_to_samples(ms));
        Self::new(samples, self.sample_rate)
    }

    pub fn fade_out(&self, ms: f64) -> Self {
        let mut samples = self.samples.clone();
        effects::fade_out(&mut samples, self.ms_to_samples(ms));
        Self::new(samples, self.sample_rate)
    }

    /// Sum `other` onto this clip from its start. Length stays `self.len()`.
    pub fn overlay(&self, other: &AudioClip) -> Self {
        self.overlay_at(other, 0)
    }

    /// Sum `other` onto this clip starting at sample `offset`.
    pub fn overlay_at(&self, other: &AudioClip, offset: usize) -> Self {
        Self::new(
            effects::overlay_at(&self.samples, &other.samples, offset),
            self.sample_rate,
        )
    }

    pub fn concat(&self, other: &AudioClip) -> Self {
        let mut samples = Vec::with_capacity(self.len() + other.len());
        samples.extend_from_slice(&self.samples);
        samples.extend_from_slice(&other.samples);
        Self::new(samples, self.sample_rate)
    }

    /// This clip repeated back to back `times` times.
    pub fn looped(&self, times: usize) -> Self {
        Self::new(effects::tile(&self.samples, times), self.sample_rate)
    }

    /// Peak absolute amplitude.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0f64, |acc, s| acc.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, sr: u32) -> AudioClip {
        AudioClip::new((0..n).map(|i| i as f64).collect(), sr)
    }

    #[test]
    fn test_silent_duration() {
        let clip = AudioClip::silent(250.0, 16000);
        assert_eq!(clip.len(), 4000);
        assert!((clip.duration_ms() - 250.0).abs() < 1e-9);
        assert_eq!(clip.peak(), 0.0);
    }

    #[test]
    fn test_slice_ms_clamped() {
        let clip = ramp(1000, 1000);
        let s = clip.slice_ms(200.0, 300.0);
        assert_eq!(s.len(), 100);
        assert_eq!(s.samples[0], 200.0);

        assert_eq!(clip.slice_ms(900.0, 5000.0).len(), 100);
        assert!(clip.slice_ms(2000.0, 3000.0).is_empty());
        assert!(clip.slice(500, 100).is_empty());
    }

    #[test]
    fn test_head_and_skip() {
        let clip = ramp(1000, 1000);
        assert_eq!(clip.head_ms(300.0).len(), 300);
        let rest = clip.skip_ms(300.0);
        assert_eq!(rest.len(), 700);
        assert_eq!(rest.samples[0], 300.0);
        assert_eq!(clip.head_ms(5000.0).len(), 1000);
    }

    #[test]
    fn test_transformations_leave_source_untouched() {
        let clip = AudioClip::new(vec![0.5; 100], 1000);
        let quieter = clip.gain(-6.0);
        let faded = clip.fade_out(50.0);
        assert!(quieter.samples[0] < 0.5);
        assert_eq!(faded.samples[99], 0.0);
        assert_eq!(clip.samples, vec![0.5; 100]);
    }

    #[test]
    fn test_overlay_and_concat() {
        let a = AudioClip::new(vec![0.25; 10], 1000);
        let b = AudioClip::new(vec![0.5; 4], 1000);
        let mixed = a.overlay(&b);
        assert_eq!(mixed.len(), 10);
        assert_eq!(mixed.samples[3], 0.75);
        assert_eq!(mixed.samples[4], 0.25);

        let joined = a.concat(&b);
        assert_eq!(joined.len(), 14);
        assert_eq!(joined.samples[10], 0.5);
    }

    #[test]
    fn test_looped() {
        let clip = ramp(3, 1000);
        let looped = clip.looped(3);
        assert_eq!(looped.samples, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    }
}
