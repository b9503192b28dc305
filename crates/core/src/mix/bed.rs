//! Background-music post-pass: loop, envelope, and lay the bed under the
//! timeline from the point where it was declared.

use crate::audio::clip::AudioClip;
use crate::audio::effects::samples_to_ms;
use crate::config::MixConfig;
use crate::types::BedPlacement;

use super::envelope::build_envelope;
use super::timeline::Timeline;

/// Build a bed of exactly `total` samples from `clip`.
///
/// The clip is tiled `floor(total / len) + 1` times before trimming, which
/// can overshoot by a whole clip; the count is kept because it fixes where
/// the loop seams land. Returns the bed and the loop count, or `None` for
/// an empty clip or empty span.
pub fn render_bed(clip: &AudioClip, total: usize, config: &MixConfig) -> Option<(AudioClip, usize)> {
    if clip.is_empty() || total == 0 {
        return None;
    }

    let loops = total / clip.len() + 1;
    let looped = clip.looped(loops).slice(0, total);

    let body = total.saturating_sub(clip.ms_to_samples(config.closing_ms));
    let bed = build_envelope(&looped, &config.bed_envelope(), body);
    debug_assert_eq!(bed.len(), total);

    Some((bed, loops))
}

/// Run the post-pass on `timeline` if a background bed was declared.
pub fn apply_background(timeline: &mut Timeline, config: &MixConfig) -> Option<BedPlacement> {
    let declared = timeline.take_background()?;
    let total = timeline.cursor().saturating_sub(declared.offset);

    let Some((bed, loops)) = render_bed(&declared.clip, total, config) else {
        log::warn!(
            "Skipping background bed from index {}: nothing to cover ({} samples of music, {} of timeline)",
            declared.index,
            declared.clip.len(),
            total
        );
        return None;
    };

    log::debug!(
        "Background bed: {} loops of {:.0} ms, {:.0} ms from offset {:.0} ms",
        loops,
        declared.clip.duration_ms(),
        bed.duration_ms(),
        samples_to_ms(declared.offset, timeline.sample_rate())
    );

    timeline.overlay_from(declared.offset, &bed);

    Some(BedPlacement {
        index: declared.index,
        offset_ms: samples_to_ms(declared.offset, timeline.sample_rate()),
        duration_ms: bed.duration_ms(),
        loops,
    })
}
