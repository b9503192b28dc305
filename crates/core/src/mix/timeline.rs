//! Append-only output timeline with placement bookkeeping.

use crate::audio::clip::AudioClip;
use crate::audio::effects::samples_to_ms;
use crate::types::{MixingMode, PlacedSegment};

/// A background clip waiting for the post-pass.
#[derive(Debug, Clone)]
pub struct BackgroundBed {
    /// Plan index of the `bg_music` entry.
    pub index: usize,
    pub clip: AudioClip,
    /// Timeline cursor (in samples) when the bed was declared.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Timeline {
    samples: Vec<f64>,
    sample_rate: u32,
    segments: Vec<PlacedSegment>,
    background: Option<BackgroundBed>,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            segments: Vec::new(),
            background: None,
        }
    }

    /// Current length in samples.
    pub fn cursor(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Append `clip` at the cursor, attributing it to plan entry `index`.
    pub fn append(&mut self, index: usize, mode: MixingMode, clip: &AudioClip) {
        debug_assert_eq!(clip.sample_rate, self.sample_rate);
        if clip.is_empty() {
            return;
        }
        self.segments.push(PlacedSegment {
            index,
            mode,
            start_ms: samples_to_ms(self.cursor(), self.sample_rate),
            duration_ms: clip.duration_ms(),
        });
        self.samples.extend_from_slice(&clip.samples);
    }

    /// Record a background bed at the current cursor. A later declaration replaces an earlier one.
    pub fn declare_background(&mut self, index: usize, clip: AudioClip) {
        if let Some(previous) = &self.background {
            log::warn!(
                "bg_music at index {} replaces the one declared at index {}",
                index,
                previous.index
            );
        }
        self.background = Some(BackgroundBed {
            index,
            clip,
            offset: self.cursor(),
        });
    }

    pub fn take_background(&mut self) -> Option<BackgroundBed> {
        self.background.take()
    }

    /// Sum `bed` onto the timeline from `offset`; the timeline length never changes.
    pub fn overlay_from(&mut self, offset: usize, bed: &AudioClip) {
        if offset >= self.samples.len() {
            return;
        }
        for (dst, &src) in self.samples[offset..].iter_mut().zip(bed.samples.iter()) {
            *dst += src;
        }
    }

    pub fn segments(&self) -> &[PlacedSegment] {
        &self.segments
    }

    /// Finish the timeline into a clip plus its placement report.
    pub fn into_parts(self) -> (AudioClip, Vec<PlacedSegment>) {
        (AudioClip::new(self.samples, self.sample_rate), self.segments)
    }
}
