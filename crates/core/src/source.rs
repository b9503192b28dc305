//! Clip resolution: sample-library lookup and decoding with fallback.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::audio::clip::AudioClip;
use crate::audio::io::{conform_rate, decode_file, read_wav};
use crate::error::{MixError, Result};

/// Anything that can turn a plan locator into a decoded clip.
pub trait ClipSource {
    /// Load the clip for plan entry `index`, at the mixing sample rate.
    fn load(&self, index: usize, locator: &str) -> Result<AudioClip>;
}

/// Canonical sample name: lowercase, with `_` and spaces turned into `-`.
///
/// Annotators emit tags like `toy-symphony`; files on disk may be named
/// `Toy_Symphony.mp3` or `toy symphony.mp3`.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Read-only table of named samples (sound effects, music beds, stings).
#[derive(Debug, Clone, Default)]
pub struct SampleLibrary {
    entries: BTreeMap<String, PathBuf>,
}

impl SampleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every file in `dirs` by its normalized name up to the first `.`.
    ///
    /// Later directories override earlier ones on name clashes.
    pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let mut library = Self::new();
        for dir in dirs {
            let dir = dir.as_ref();
            let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            for path in files {
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let name = normalize_name(file_name.split('.').next().unwrap_or(file_name));
                if name.is_empty() {
                    continue;
                }
                if let Some(previous) = library.entries.insert(name.clone(), path.clone()) {
                    log::debug!(
                        "Sample '{}' from {} overrides {}",
                        name,
                        path.display(),
                        previous.display()
                    );
                }
            }
            log::debug!("Indexed sample directory {}", dir.display());
        }
        log::info!("Sample library: {} entries", library.len());
        Ok(library)
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        let name: String = name.into();
        self.entries.insert(normalize_name(&name), path.into());
    }

    /// Look up a sample; `name` is normalized the same way as on scan.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(&normalize_name(name)).map(|p| p.as_path())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decodes the file at a path to a mono clip at its native rate.
pub type DecodeFn = fn(&Path) -> anyhow::Result<AudioClip>;

/// Resolves locators against a sample library and the filesystem, then
/// decodes with two independent readers.
///
/// The primary is symphonia's probe, which handles every compressed format
/// the library ships. The fallback is hound's PCM reader: it shares no code
/// with symphonia's WAV demuxer, so a plain PCM WAV that trips a symphonia
/// demuxer or decoder error still loads.
#[derive(Debug, Clone)]
pub struct FileClipSource {
    library: SampleLibrary,
    base_dir: Option<PathBuf>,
    sample_rate: u32,
    primary: DecodeFn,
    fallback: DecodeFn,
}

impl FileClipSource {
    pub fn new(library: SampleLibrary, sample_rate: u32) -> Self {
        Self {
            library,
            base_dir: None,
            sample_rate,
            primary: decode_file,
            fallback: read_wav,
        }
    }

    /// Swap the primary and fallback readers.
    pub fn with_decoders(mut self, primary: DecodeFn, fallback: DecodeFn) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    /// Resolve relative locators against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn library(&self) -> &SampleLibrary {
        &self.library
    }

    /// Library name first, then a filesystem path.
    pub fn resolve(&self, locator: &str) -> PathBuf {
        if let Some(path) = self.library.get(locator) {
            return path.to_path_buf();
        }
        let path = PathBuf::from(locator);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

impl ClipSource for FileClipSource {
    fn load(&self, index: usize, locator: &str) -> Result<AudioClip> {
        let path = self.resolve(locator);

        let decoded = match (self.primary)(&path) {
            Ok(clip) => clip,
            Err(primary) => {
                log::warn!(
                    "Primary decode failed for {} ({:#}), trying PCM WAV reader",
                    path.display(),
                    primary
                );
                (self.fallback)(&path).map_err(|fallback| MixError::ClipLoad {
                    index,
                    locator: locator.to_string(),
                    primary: format!("{:#}", primary),
                    fallback: format!("{:#}", fallback),
                })?
            }
        };

        conform_rate(decoded, self.sample_rate).map_err(|e| MixError::ClipLoad {
            index,
            locator: locator.to_string(),
            primary: format!("resampling failed: {:#}", e),
            fallback: "not attempted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::io::write_wav;

    #[test]
    fn test_scan_names_and_override() {
        let root = tempfile::tempdir().unwrap();
        let sfx = root.path().join("sfx");
        let bgm = root.path().join("bg_music");
        std::fs::create_dir_all(&sfx).unwrap();
        std::fs::create_dir_all(&bgm).unwrap();
        std::fs::write(sfx.join("hop.wav"), b"x").unwrap();
        std::fs::write(sfx.join("toy-symphony.mp3"), b"x").unwrap();
        std::fs::write(bgm.join("toy-symphony.final.wav"), b"x").unwrap();
        std::fs::create_dir_all(sfx.join("nested")).unwrap();

        let library = SampleLibrary::scan(&[&sfx, &bgm]).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("hop"), Some(sfx.join("hop.wav").as_path()));
        assert_eq!(
            library.get("toy-symphony"),
            Some(bgm.join("toy-symphony.final.wav").as_path())
        );
        assert!(library.get("nested").is_none());
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["hop", "toy-symphony"]);
    }

    #[test]
    fn test_scan_normalizes_file_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Toy_Symphony.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("quirky quest.wav"), b"x").unwrap();

        let library = SampleLibrary::scan(&[dir.path()]).unwrap();
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["quirky-quest", "toy-symphony"]);
        assert_eq!(
            library.get("toy-symphony"),
            Some(dir.path().join("Toy_Symphony.mp3").as_path())
        );
        assert!(library.get("Quirky_Quest").is_some());
        assert!(library.get("toy symphony").is_some());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Forest_Walk"), "forest-walk");
        assert_eq!(normalize_name("rain on roof"), "rain-on-roof");
        assert_eq!(normalize_name("bark"), "bark");
    }

    #[test]
    fn test_scan_missing_dir_errors() {
        assert!(SampleLibrary::scan(&["/nonexistent/fabmix/samples"]).is_err());
    }

    #[test]
    fn test_resolve_prefers_library() {
        let mut library = SampleLibrary::new();
        library.insert("growl", "/lib/sfx/growl.wav");
        let source = FileClipSource::new(library, 44100).with_base_dir("/episodes/alice");

        assert_eq!(source.resolve("growl"), PathBuf::from("/lib/sfx/growl.wav"));
        assert_eq!(source.resolve("0.mp3"), PathBuf::from("/episodes/alice/0.mp3"));
        assert_eq!(source.resolve("/abs/1.mp3"), PathBuf::from("/abs/1.mp3"));
    }

    #[test]
    fn test_load_resamples_to_mix_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f64> = (0..8000)
            .map(|i| (i as f64 / 8000.0 * 220.0 * std::f64::consts::TAU).sin() * 0.3)
            .collect();
        write_wav(&path, &AudioClip::new(samples, 8000)).unwrap();

        let source = FileClipSource::new(SampleLibrary::new(), 16000);
        let clip = source.load(0, path.to_str().unwrap()).unwrap();
        assert_eq!(clip.sample_rate, 16000);
        assert_eq!(clip.len(), 16000);
    }

    fn reject(_: &Path) -> anyhow::Result<AudioClip> {
        anyhow::bail!("unsupported codec")
    }

    #[test]
    fn test_fallback_decoder_loads_when_primary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm.wav");
        write_wav(&path, &AudioClip::new(vec![0.25; 1000], 8000)).unwrap();

        let source = FileClipSource::new(SampleLibrary::new(), 8000).with_decoders(reject, read_wav);
        let clip = source.load(3, path.to_str().unwrap()).unwrap();
        assert_eq!(clip.len(), 1000);
        assert!((clip.samples[999] - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_fallback_output_is_conformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm.wav");
        write_wav(&path, &AudioClip::new(vec![0.25; 8000], 8000)).unwrap();

        let source = FileClipSource::new(SampleLibrary::new(), 16000).with_decoders(reject, read_wav);
        let clip = source.load(0, path.to_str().unwrap()).unwrap();
        assert_eq!(clip.sample_rate, 16000);
        assert_eq!(clip.len(), 16000);
    }

    #[test]
    fn test_load_failure_reports_both_decoders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let source = FileClipSource::new(SampleLibrary::new(), 44100);
        let err = source.load(7, path.to_str().unwrap()).unwrap_err();
        match err {
            MixError::ClipLoad { index, locator, primary, fallback } => {
                assert_eq!(index, 7);
                assert!(locator.ends_with("garbage.wav"));
                assert!(!primary.is_empty());
                assert!(!fallback.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
