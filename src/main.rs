use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sprite_forge::config::{ForgeConfig, PresetStore};
use sprite_forge::generator::MockGenerator;
use sprite_forge::job::{AnimationRequest, JobRequest, JobRunnerBuilder};
use sprite_forge::{HasRecoverySuggestion, SpriteError, init_logging};

/// Turn a character prompt into game-ready sprite sheets, GIF previews and engine metadata.
#[derive(Parser, Debug)]
#[command(name = "spriteforge")]
#[command(about = "🎮 Generate multi-animation sprite sheets from a text prompt")]
#[command(long_about = "Generate a sprite sheet per animation from a text prompt, strip the background,
normalize every frame onto the preset canvas and write sheets, GIFs, a combined sheet and
Phaser/Unity metadata into a per-job output directory.")]
struct Args {
    /// Character description
    #[arg(required_unless_present = "list_presets")]
    prompt: Option<String>,

    /// Style preset
    #[arg(short, long, default_value = "anime_action")]
    preset: String,

    /// Animations to generate, in order
    #[arg(
        short,
        long,
        help = "Comma-separated animations, optionally with frame counts: idle,run=6 (default: every animation of the preset)"
    )]
    animations: Option<String>,

    /// Output root directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Generation seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Extra instructions appended to every sheet prompt
    #[arg(short, long)]
    refine: Option<String>,

    /// Directory of preset override files
    #[arg(long)]
    presets_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Matting service endpoint
    #[arg(long)]
    matting_url: Option<String>,

    /// Use the offline mock generator even when an API key is configured
    #[arg(long)]
    mock: bool,

    /// List available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.logging);

    if args.list_presets {
        list_presets(&PresetStore::new(config.presets_dir.clone()));
        return Ok(());
    }

    let mut builder = JobRunnerBuilder::from_config(&config).map_err(report)?;
    if args.mock {
        builder = builder.with_generator(Arc::new(MockGenerator::new()));
    }
    let runner = builder.build().map_err(report)?;

    let mut request = JobRequest::new(args.prompt.unwrap_or_default(), args.preset);
    if let Some(list) = &args.animations {
        request = request.with_animations(AnimationRequest::parse_list(list).map_err(report)?);
    }
    if let Some(seed) = args.seed {
        request = request.with_seed(seed);
    }
    if let Some(refinement) = args.refine {
        request = request.with_refinement(refinement);
    }

    let summary = runner.generate(request).await.map_err(report)?;

    println!("Job {} {}", summary.job_id, summary.status);
    println!("  Preset: {} ({}x{})", summary.preset, summary.frame_size.0, summary.frame_size.1);
    for (name, anim) in &summary.animations {
        println!("  {:<10} {:>2} frames  {}  {}", name, anim.frame_count, anim.sprite_sheet, anim.gif);
    }
    println!("  Combined: {}", summary.combined_sheet);
    println!("  Metadata: {}", summary.metadata);
    Ok(())
}

/// Config file, then environment, then command-line flags.
fn load_config(args: &Args) -> Result<ForgeConfig> {
    let mut config = match &args.config {
        Some(path) => ForgeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ForgeConfig::default(),
    }
    .from_env();

    if let Some(output) = &args.output {
        config.output_root = output.clone();
    }
    if let Some(dir) = &args.presets_dir {
        config.presets_dir = Some(dir.clone());
    }
    if let Some(url) = &args.matting_url {
        config.background.matting_url = Some(url.clone());
    }
    if args.json_logs {
        config.logging.json = true;
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    Ok(config)
}

fn list_presets(store: &PresetStore) {
    for preset in store.all() {
        let animations: Vec<String> = preset
            .animations
            .iter()
            .map(|(name, count)| format!("{}={}", name, count))
            .collect();
        println!(
            "{:<22} {:>4}x{:<4} {:>2} fps  {}",
            preset.name,
            preset.canvas.0,
            preset.canvas.1,
            preset.frame_rate,
            animations.join(",")
        );
    }
}

/// Print the recovery suggestion, if any, before the error itself is reported.
fn report(error: SpriteError) -> anyhow::Error {
    if let Some(hint) = error.recovery_suggestion() {
        eprintln!("hint: {}", hint);
    }
    anyhow::Error::new(error)
}
