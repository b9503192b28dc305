//! fabmix CLI: build mix plans from annotated stories and mix episodes.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use fabmix_core::config::{LIBRARY_DIR_ENV, MixConfig, library_dir_from_env};
use fabmix_core::manifest::MixManifest;
use fabmix_core::plan::{AnnotatedStory, FramingConfig, build_plan};
use fabmix_core::retry::RetryPolicy;
use fabmix_core::{FileClipSource, MixPlan, Mixer, SampleLibrary};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "fabmix",
    about = "Mix narration, sound effects, and music beds into story episodes",
    version
)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a mix plan to a single audio file
    Mix(MixArgs),
    /// Build a mix plan from an annotated story
    Plan(PlanArgs),
    /// List the samples in the sample library
    Library(LibraryArgs),
}

#[derive(Parser, Debug)]
struct LibraryDirs {
    /// Sample directories, later ones override earlier ones
    /// (default: $FABMIX_LIBRARY_DIR)
    #[arg(long = "library")]
    dirs: Vec<PathBuf>,
}

// ─── Mix ─────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(allow_negative_numbers = true)]
struct MixArgs {
    /// Mix plan JSON ({"audio_paths": [...], "mixing_instructions": [...]})
    plan: PathBuf,

    /// Output file (.mp3, or .wav for uncompressed)
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    library: LibraryDirs,

    /// Resolve relative clip paths against this directory
    /// (default: the working directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Mixer settings JSON; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mixing and output sample rate (Hz)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// MP3 bitrate (kbps)
    #[arg(long)]
    bitrate: Option<u32>,

    /// Ducked music bed level (dB)
    #[arg(long)]
    bed_db: Option<f64>,

    /// Ducked overlay effect level (dB)
    #[arg(long)]
    overlay_db: Option<f64>,

    /// Attempts for transient clip-load failures
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Skip writing <output>.json
    #[arg(long, default_value_t = false)]
    no_manifest: bool,
}

// ─── Plan ────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Annotated story JSON ({"text": ..., "sound_effects": {...}})
    story: PathBuf,

    /// Directory holding the narration clips (0.mp3, 1.mp3, ...)
    #[arg(long)]
    narration_dir: PathBuf,

    #[command(flatten)]
    library: LibraryDirs,

    /// Frame the story as an episode with this title
    #[arg(long, requires_all = ["opening_text", "bg_music"])]
    title: Option<String>,

    /// Narration read over the opening theme
    #[arg(long, requires = "title")]
    opening_text: Option<String>,

    /// Library sample looped under the story
    #[arg(long, requires = "title")]
    bg_music: Option<String>,

    /// Opening theme sample (default: toy-symphony)
    #[arg(long)]
    opening_sample: Option<String>,

    /// Title sting sample (default: quirky-quest)
    #[arg(long)]
    title_sample: Option<String>,

    /// Write the plan here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct LibraryArgs {
    #[command(flatten)]
    library: LibraryDirs,
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Mix(args) => run_mix(args),
        Command::Plan(args) => run_plan(args),
        Command::Library(args) => run_library(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Explicit `--library` dirs, else the environment default, else none.
fn library_dirs(args: &LibraryDirs) -> Vec<PathBuf> {
    if !args.dirs.is_empty() {
        return args.dirs.clone();
    }
    library_dir_from_env().into_iter().collect()
}

fn load_library(args: &LibraryDirs) -> Result<SampleLibrary> {
    let dirs = library_dirs(args);
    for d in &dirs {
        if !d.is_dir() {
            bail!("Sample directory not found: {}", d.display());
        }
    }
    SampleLibrary::scan(&dirs).context("Failed to index sample library")
}

fn mix_config(args: &MixArgs) -> Result<MixConfig> {
    let mut config = match &args.config {
        Some(path) => MixConfig::load(path)
            .with_context(|| format!("Failed to read mixer config {}", path.display()))?,
        None => MixConfig::default(),
    };
    if let Some(sr) = args.sample_rate {
        config.sample_rate = sr;
    }
    if let Some(kbps) = args.bitrate {
        config.bitrate_kbps = kbps;
    }
    if let Some(db) = args.bed_db {
        config.bed_reduced_db = db;
    }
    if let Some(db) = args.overlay_db {
        config.overlay_reduced_db = db;
    }
    if config.sample_rate == 0 {
        bail!("Sample rate must be positive");
    }
    Ok(config)
}

// ─── Runners ─────────────────────────────────────────────────────

fn run_mix(args: MixArgs) -> Result<()> {
    if !args.plan.exists() {
        bail!("Plan not found: {}", args.plan.display());
    }
    let plan = MixPlan::load(&args.plan)
        .with_context(|| format!("Failed to load plan {}", args.plan.display()))?;
    let config = mix_config(&args)?;
    let library = load_library(&args.library)?;

    let mut source = FileClipSource::new(library, config.sample_rate);
    if let Some(dir) = &args.base_dir {
        source = source.with_base_dir(dir);
    }

    log::info!(
        "Mixing {} clips at {} Hz -> {}",
        plan.len(),
        config.sample_rate,
        args.output.display()
    );

    let mixer = Mixer::new(&config, &source);
    let (path, outcome) = RetryPolicy::attempts(args.retries).run(
        |attempt| {
            if attempt > 1 {
                log::info!("Retrying mix (attempt {})", attempt);
            }
            mixer.mix_to_file(&plan, &args.output)
        },
        |e| e.is_retryable(),
    )?;

    if !args.no_manifest {
        let manifest_path = MixManifest::new(&path, &plan, &outcome, &source).write()?;
        log::info!("Manifest: {}", manifest_path.display());
    }

    if let Some(bed) = &outcome.background {
        println!(
            "Background bed: {:.1}s from {:.1}s ({} loops)",
            bed.duration_ms / 1000.0,
            bed.offset_ms / 1000.0,
            bed.loops
        );
    }
    println!("Duration: {:.1}s", outcome.clip.duration_ms() / 1000.0);
    println!("Output: {}", path.display());

    Ok(())
}

fn framing(args: &PlanArgs) -> FramingConfig {
    let mut framing = FramingConfig::default();
    if let Some(name) = &args.opening_sample {
        framing.opening_sample = name.clone();
    }
    if let Some(name) = &args.title_sample {
        framing.title_sample = name.clone();
    }
    framing
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let mut story = AnnotatedStory::load(&args.story)
        .with_context(|| format!("Failed to load story {}", args.story.display()))?;

    if let (Some(title), Some(opening), Some(bed)) = (&args.title, &args.opening_text, &args.bg_music) {
        if opening.trim().is_empty() || title.trim().is_empty() {
            bail!("--title and --opening-text must not be empty");
        }
        story = story.framed(title, opening, bed, &framing(&args));
        log::info!("Framed story as \"{}\" over {}", title, bed);
    }

    let library = load_library(&args.library)?;
    if library.is_empty() {
        log::warn!("Sample library is empty; pass --library or set {}", LIBRARY_DIR_ENV);
    }

    let plan = build_plan(&story, &library, &args.narration_dir)?;
    let json = serde_json::to_string_pretty(&plan)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Plan: {} entries -> {}", plan.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn run_library(args: LibraryArgs) -> Result<()> {
    let library = load_library(&args.library)?;
    if library.is_empty() {
        println!("No samples found (pass --library or set {})", LIBRARY_DIR_ENV);
        return Ok(());
    }
    for (name, path) in library.iter() {
        println!("{:<32} {}", name, path.display());
    }
    println!("{} samples", library.len());
    Ok(())
}
