//! Mode dispatch: walk the plan once, compositing each entry (and its
//! paired narration where the mode takes one) onto the timeline.

use std::path::{Path, PathBuf};

use crate::audio::clip::AudioClip;
use crate::config::MixConfig;
use crate::error::{MixError, Result};
use crate::export::export_clip;
use crate::source::ClipSource;
use crate::types::{BedPlacement, MixPlan, MixingMode, PlacedSegment};

use super::bed::apply_background;
use super::envelope::build_envelope;
use super::timeline::Timeline;

/// A rendered mix and how it was put together.
#[derive(Debug, Clone)]
pub struct MixOutcome {
    pub clip: AudioClip,
    pub segments: Vec<PlacedSegment>,
    pub background: Option<BedPlacement>,
}

pub struct Mixer<'a, S: ClipSource + ?Sized> {
    config: &'a MixConfig,
    source: &'a S,
}

impl<'a, S: ClipSource + ?Sized> Mixer<'a, S> {
    pub fn new(config: &'a MixConfig, source: &'a S) -> Self {
        Self { config, source }
    }

    /// Render `plan` to a single clip at the configured sample rate.
    pub fn render(&self, plan: &MixPlan) -> Result<MixOutcome> {
        plan.validate()?;

        let paths = &plan.audio_paths;
        let modes = &plan.mixing_instructions;
        let mut timeline = Timeline::new(self.config.sample_rate);

        let mut i = 0;
        while i < paths.len() {
            let mode = modes[i];
            let current = self.source.load(i, &paths[i])?;
            let before = timeline.cursor();

            let consumed = match mode {
                MixingMode::Opening => {
                    let narration = self.paired(plan, i)?;
                    self.opening(&mut timeline, i, &current, &narration);
                    2
                }
                MixingMode::Title => {
                    let narration = self.paired(plan, i)?;
                    self.title(&mut timeline, i, &narration);
                    2
                }
                MixingMode::BgMusic => {
                    timeline.declare_background(i, current);
                    1
                }
                MixingMode::Story => {
                    timeline.append(i, mode, &current);
                    1
                }
                MixingMode::Exclusive => {
                    timeline.append(i, mode, &self.exclusive(&current));
                    1
                }
                MixingMode::Overlay => {
                    if modes.get(i + 1) == Some(&MixingMode::Story) {
                        let narration = self.paired(plan, i)?;
                        self.overlay(&mut timeline, i, &current, &narration);
                        2
                    } else {
                        log::debug!("overlay at index {} has no narration to pair with, playing it alone", i);
                        timeline.append(i, mode, &self.exclusive(&current));
                        1
                    }
                }
            };

            log::debug!(
                "#{} {} ({}): +{:.0} ms{}",
                i,
                mode,
                paths[i],
                current_ms(&timeline, before),
                if consumed == 2 { " (paired with next)" } else { "" }
            );
            i += consumed;
        }

        let background = apply_background(&mut timeline, self.config);
        let (clip, segments) = timeline.into_parts();

        Ok(MixOutcome {
            clip,
            segments,
            background,
        })
    }

    /// Render `plan` and export it to `out_path`.
    pub fn mix_to_file(&self, plan: &MixPlan, out_path: &Path) -> Result<(PathBuf, MixOutcome)> {
        let outcome = self.render(plan)?;
        let path = export_clip(&outcome.clip, out_path, self.config.bitrate_kbps)?;
        log::info!(
            "Mixed {} clips into {:.1}s: {}",
            plan.len(),
            outcome.clip.duration_ms() / 1000.0,
            path.display()
        );
        Ok((path, outcome))
    }

    /// Load the clip following `index`, which the mode at `index` pairs with.
    fn paired(&self, plan: &MixPlan, index: usize) -> Result<AudioClip> {
        let next = index + 1;
        match plan.audio_paths.get(next) {
            Some(locator) => self.source.load(next, locator),
            None => Err(MixError::MissingPairedClip {
                index,
                mode: plan.mixing_instructions[index].to_string(),
            }),
        }
    }

    /// Cold open, narration over the ducked bed, then the closing swell.
    fn opening(&self, timeline: &mut Timeline, index: usize, music: &AudioClip, narration: &AudioClip) {
        let cfg = self.config;
        let bed_source = music.skip_ms(cfg.opening_skip_ms).gain(cfg.opening_gain_db);
        let bed = build_envelope(&bed_source, &cfg.bed_envelope(), narration.len());

        let lead = bed.ms_to_samples(cfg.bed_lead_ms);
        let body_end = lead + narration.len();

        timeline.append(index, MixingMode::Opening, &bed.slice(0, lead));
        timeline.append(
            index + 1,
            MixingMode::Story,
            &narration.overlay(&bed.slice(lead, body_end)),
        );
        timeline.append(index, MixingMode::Opening, &bed.slice(body_end, bed.len()));
    }

    fn title(&self, timeline: &mut Timeline, index: usize, narration: &AudioClip) {
        let sr = self.config.sample_rate;
        timeline.append(index, MixingMode::Title, &AudioClip::silent(self.config.title_lead_silence_ms, sr));
        timeline.append(index + 1, MixingMode::Story, narration);
        timeline.append(index, MixingMode::Title, &AudioClip::silent(self.config.title_tail_silence_ms, sr));
    }

    /// Cap to the exclusive length, fading the tail when long enough to need it.
    fn exclusive(&self, clip: &AudioClip) -> AudioClip {
        let cfg = self.config;
        let capped = clip.head_ms(cfg.exclusive_max_ms);
        if capped.len() > capped.ms_to_samples(cfg.exclusive_fade_threshold_ms) {
            capped.fade_out(cfg.exclusive_fade_ms)
        } else {
            capped
        }
    }

    /// Effect lead at full volume, then the effect ducked under the narration's start.
    fn overlay(&self, timeline: &mut Timeline, index: usize, effect: &AudioClip, narration: &AudioClip) {
        let cfg = self.config;
        let lead = effect.ms_to_samples(cfg.overlay_lead_ms);
        let window = narration.len().min(narration.ms_to_samples(cfg.overlay_window_ms));

        timeline.append(index, MixingMode::Overlay, &effect.slice(0, lead));

        if window > 0 {
            let under = effect.slice(lead, lead + window).gain(cfg.overlay_reduced_db);
            timeline.append(index + 1, MixingMode::Story, &narration.slice(0, window).overlay(&under));
        }
        timeline.append(index + 1, MixingMode::Story, &narration.slice(window, narration.len()));
    }
}

fn current_ms(timeline: &Timeline, before: usize) -> f64 {
    crate::audio::effects::samples_to_ms(timeline.cursor() - before, timeline.sample_rate())
}
