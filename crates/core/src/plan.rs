//! Turn an annotated story (text with `<tag>` markers plus a tag table)
//! into a [`MixPlan`] with one narration slot per text segment.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MixError, Result};
use crate::source::SampleLibrary;
use crate::types::{MixPlan, MixingMode};

/// One entry of the annotation's sound-effect table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEffect {
    /// Library sample to play; the tag name itself when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mode: MixingMode,
}

/// Story text annotated with inline tags, as produced by the annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedStory {
    pub text: String,
    pub sound_effects: HashMap<String, TagEffect>,
}

/// Library samples used to frame every episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Theme played under the opening narration.
    pub opening_sample: String,
    /// Sting marking the title card.
    pub title_sample: String,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            opening_sample: "toy-symphony".to_string(),
            title_sample: "quirky-quest".to_string(),
        }
    }
}

impl AnnotatedStory {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| MixError::StoryParse(e.to_string()))
    }

    /// Wrap the story in the episode frame: opening theme under
    /// `opening_text`, the title card, then the story over `bg_music`.
    ///
    /// The frame's `opening`, `title` and `bg_music` entries replace any
    /// effects of the same name. The `<bg_music>` tag also separates the
    /// title narration from the story's first segment.
    pub fn framed(&self, title: &str, opening_text: &str, bg_music: &str, framing: &FramingConfig) -> Self {
        let mut sound_effects = self.sound_effects.clone();
        sound_effects.insert(
            "opening".to_string(),
            TagEffect {
                name: Some(framing.opening_sample.clone()),
                mode: MixingMode::Opening,
            },
        );
        sound_effects.insert(
            "title".to_string(),
            TagEffect {
                name: Some(framing.title_sample.clone()),
                mode: MixingMode::Title,
            },
        );

        sound_effects.insert(
            "bg_music".to_string(),
            TagEffect {
                name: Some(bg_music.to_string()),
                mode: MixingMode::BgMusic,
            },
        );

        Self {
            text: format!("<opening> {} <title> {} <bg_music> {}", opening_text, title, self.text),
            sound_effects,
        }
    }
}

/// Piece of annotated text: either narration or a tag.
#[derive(Debug, Clone, PartialEq)]
enum Part<'a> {
    Text(&'a str),
    Tag(&'a str),
}

lazy_static::lazy_static! {
    /// Inline tag such as `<bark>` or `<bg_music>`.
    static ref TAG: Regex = Regex::new(r"<([\w-]+)>").unwrap();
}

fn split_tags(text: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for caps in TAG.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            parts.push(Part::Text(&text[last..whole.start()]));
        }
        parts.push(Part::Tag(name.as_str()));
        last = whole.end();
    }
    if last < text.len() {
        parts.push(Part::Text(&text[last..]));
    }
    parts
}

/// Build a MixPlan from `story`.
///
/// Text between tags is accumulated, trimmed, and, when non-empty,
/// becomes narration segment `k` with locator `<narration_dir>/<k>.mp3`.
/// Each tag resolves through its effect entry to a library sample path.
pub fn build_plan(story: &AnnotatedStory, library: &SampleLibrary, narration_dir: &Path) -> Result<MixPlan> {
    let mut plan = MixPlan::default();
    let mut pending = String::new();

    let flush = |pending: &mut String, plan: &mut MixPlan| {
        let segment = pending.trim();
        if !segment.is_empty() {
            let k = plan.text_segments.len();
            plan.audio_paths
                .push(narration_dir.join(format!("{}.mp3", k)).to_string_lossy().into_owned());
            plan.mixing_instructions.push(MixingMode::Story);
            plan.text_segments.push(segment.to_string());
        }
        pending.clear();
    };

    for part in split_tags(&story.text) {
        match part {
            Part::Text(text) => pending.push_str(text),
            Part::Tag(tag) => {
                flush(&mut pending, &mut plan);

                let effect = story
                    .sound_effects
                    .get(tag)
                    .ok_or_else(|| MixError::UnknownTag(tag.to_string()))?;
                let name = effect.name.as_deref().unwrap_or(tag);
                let path = library.get(name).ok_or_else(|| MixError::UnknownSample {
                    tag: tag.to_string(),
                    name: name.to_string(),
                })?;

                plan.audio_paths.push(path.to_string_lossy().into_owned());
                plan.mixing_instructions.push(effect.mode);
            }
        }
    }
    flush(&mut pending, &mut plan);

    log::info!(
        "Built plan: {} entries, {} narration segments",
        plan.len(),
        plan.text_segments.len()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> SampleLibrary {
        let mut lib = SampleLibrary::new();
        lib.insert("toy-symphony", "/lib/misc/toy-symphony.mp3");
        lib.insert("quirky-quest", "/lib/misc/quirky-quest.mp3");
        lib.insert("forest-walk", "/lib/bg_music/forest-walk.mp3");
        lib.insert("bark", "/lib/sfx/bark.wav");
        lib.insert("patter", "/lib/sfx/patter.wav");
        lib
    }

    fn effect(name: Option<&str>, mode: MixingMode) -> TagEffect {
        TagEffect {
            name: name.map(str::to_string),
            mode,
        }
    }

    #[test]
    fn test_split_tags() {
        let parts = split_tags("<bark> The dog ran. <patter>");
        assert_eq!(
            parts,
            vec![Part::Tag("bark"), Part::Text(" The dog ran. "), Part::Tag("patter")]
        );
        assert_eq!(split_tags("no tags"), vec![Part::Text("no tags")]);
        assert_eq!(split_tags("a < b > c"), vec![Part::Text("a < b > c")]);
    }

    #[test]
    fn test_build_full_episode_plan() {
        let mut effects = HashMap::new();
        effects.insert("opening".into(), effect(Some("toy-symphony"), MixingMode::Opening));
        effects.insert("title".into(), effect(Some("quirky-quest"), MixingMode::Title));
        effects.insert("bg_music".into(), effect(Some("forest-walk"), MixingMode::BgMusic));
        effects.insert("bark".into(), effect(None, MixingMode::Overlay));
        effects.insert("patter".into(), effect(None, MixingMode::Exclusive));
        let story = AnnotatedStory {
            text: "<opening> Once upon a time. <title> The Dog <bg_music> <bark> The dog barked. <patter>"
                .into(),
            sound_effects: effects,
        };

        let plan = build_plan(&story, &library(), Path::new("out/dog")).unwrap();
        assert_eq!(
            plan.mixing_instructions,
            vec![
                MixingMode::Opening,
                MixingMode::Story,
                MixingMode::Title,
                MixingMode::Story,
                MixingMode::BgMusic,
                MixingMode::Overlay,
                MixingMode::Story,
                MixingMode::Exclusive,
            ]
        );
        assert_eq!(plan.audio_paths[0], "/lib/misc/toy-symphony.mp3");
        assert_eq!(plan.audio_paths[1], Path::new("out/dog").join("0.mp3").to_string_lossy());
        assert_eq!(plan.audio_paths[6], Path::new("out/dog").join("2.mp3").to_string_lossy());
        assert_eq!(plan.audio_paths[7], "/lib/sfx/patter.wav");
        assert_eq!(plan.text_segments, vec!["Once upon a time.", "The Dog", "The dog barked."]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_framed_story_builds_episode_plan() {
        let mut effects = HashMap::new();
        effects.insert("bark".into(), effect(None, MixingMode::Overlay));
        let story = AnnotatedStory {
            text: "<bark> The dog barked.".into(),
            sound_effects: effects,
        };

        let framed = story.framed(
            "The Dog",
            "Today we meet a dog.",
            "forest-walk",
            &FramingConfig::default(),
        );
        assert_eq!(
            framed.text,
            "<opening> Today we meet a dog. <title> The Dog <bg_music> <bark> The dog barked."
        );

        let plan = build_plan(&framed, &library(), Path::new("n")).unwrap();
        assert_eq!(
            plan.mixing_instructions,
            vec![
                MixingMode::Opening,
                MixingMode::Story,
                MixingMode::Title,
                MixingMode::Story,
                MixingMode::BgMusic,
                MixingMode::Overlay,
                MixingMode::Story,
            ]
        );
        assert_eq!(plan.audio_paths[0], "/lib/misc/toy-symphony.mp3");
        assert_eq!(plan.audio_paths[2], "/lib/misc/quirky-quest.mp3");
        assert_eq!(plan.audio_paths[4], "/lib/bg_music/forest-walk.mp3");
        assert_eq!(plan.text_segments, vec!["Today we meet a dog.", "The Dog", "The dog barked."]);
    }

    #[test]
    fn test_framed_custom_samples_override_story_entries() {
        let mut effects = HashMap::new();
        effects.insert("title".into(), effect(Some("bark"), MixingMode::Exclusive));
        let story = AnnotatedStory {
            text: "Once upon a time.".into(),
            sound_effects: effects,
        };
        let framing = FramingConfig {
            opening_sample: "quirky-quest".into(),
            title_sample: "toy-symphony".into(),
        };

        let framed = story.framed("Tale", "Hello.", "forest-walk", &framing);
        assert_eq!(framed.sound_effects["title"].mode, MixingMode::Title);

        let plan = build_plan(&framed, &library(), Path::new("n")).unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.audio_paths[0], "/lib/misc/quirky-quest.mp3");
        assert_eq!(plan.audio_paths[2], "/lib/misc/toy-symphony.mp3");
        assert_eq!(plan.text_segments, vec!["Hello.", "Tale", "Once upon a time."]);
    }

    #[test]
    fn test_whitespace_between_tags_is_not_narration() {
        let mut effects = HashMap::new();
        effects.insert("bark".into(), effect(None, MixingMode::Exclusive));
        let story = AnnotatedStory {
            text: "<bark>   \n <bark>".into(),
            sound_effects: effects,
        };
        let plan = build_plan(&story, &library(), Path::new("n")).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.text_segments.is_empty());
    }

    #[test]
    fn test_unknown_tag() {
        let story = AnnotatedStory {
            text: "Hello <meow> there".into(),
            sound_effects: HashMap::new(),
        };
        let err = build_plan(&story, &library(), Path::new("n")).unwrap_err();
        assert!(matches!(err, MixError::UnknownTag(ref t) if t == "meow"));
    }

    #[test]
    fn test_unknown_sample() {
        let mut effects = HashMap::new();
        effects.insert("meow".into(), effect(Some("cat-meow"), MixingMode::Overlay));
        let story = AnnotatedStory {
            text: "<meow> Hello".into(),
            sound_effects: effects,
        };
        let err = build_plan(&story, &library(), Path::new("n")).unwrap_err();
        assert!(matches!(err, MixError::UnknownSample { ref name, .. } if name == "cat-meow"));
    }

    #[test]
    fn test_story_json_shape() {
        let story: AnnotatedStory = serde_json::from_str(
            r#"{
                "text": "<bark> Woof.",
                "sound_effects": {"bark": {"mode": "overlay"}}
            }"#,
        )
        .unwrap();
        assert_eq!(story.sound_effects["bark"].mode, MixingMode::Overlay);
        assert!(story.sound_effects["bark"].name.is_none());
    }
}
