use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use chalkmotion::renderer::{FrameFormat, ManimRenderer, RenderEngine, VideoEncoder};
use chalkmotion::storyboard::{self, Resolution, Storyboard, StoryboardKind};
use chalkmotion::{AppConfig, Language, SimulationReport, StoryboardParser};

#[derive(Parser)]
#[command(name = "chalkmotion")]
#[command(about = "Educational CS Animation Engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an animation to frames and encode the video
    Render {
        /// Built-in animation to render
        #[arg(value_enum)]
        animation: Option<StoryboardKind>,

        /// Render a saved storyboard file instead of a built-in animation
        #[arg(long)]
        script: Option<PathBuf>,

        /// On-screen label language
        #[arg(long, value_enum)]
        language: Option<Language>,

        /// Seed for the simulated run; drawn from entropy when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Frame output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Rendering backend ("native" or "manim")
        #[arg(long)]
        renderer: Option<String>,

        /// Disable the GPU path of the native renderer
        #[arg(long)]
        force_cpu: bool,

        /// Frame size, e.g. 1280x720
        #[arg(long)]
        resolution: Option<String>,

        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Frame file format for the native renderer
        #[arg(long, value_enum, default_value_t = FrameFormat::Ppm)]
        format: FrameFormat,

        /// Export simulation statistics to a file (supports .json, .md)
        #[arg(long)]
        export_report: Option<PathBuf>,
    },

    /// Generate a storyboard and print it as JSON
    Storyboard {
        /// Built-in animation to generate
        #[arg(value_enum)]
        animation: StoryboardKind,

        #[arg(long, value_enum)]
        language: Option<Language>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        resolution: Option<String>,

        #[arg(long)]
        fps: Option<u32>,
    },

    /// Validate a storyboard file
    Validate {
        /// Path to the storyboard JSON
        script: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration, using defaults: {e}");
        AppConfig::default()
    });

    match cli.command {
        Commands::Render {
            animation,
            script,
            language,
            seed,
            output,
            renderer,
            force_cpu,
            resolution,
            fps,
            format,
            export_report,
        } => {
            let language = language.unwrap_or_else(|| default_language(&config));
            let seed = resolve_seed(seed);
            let resolution =
                Resolution::Named(resolution.unwrap_or(config.video.default_resolution.clone()));
            let fps = fps.unwrap_or(config.video.default_fps);

            let board = match (&script, animation) {
                (Some(path), _) => {
                    println!("Parsing storyboard: {}", path.display());
                    StoryboardParser::parse_json(path)?
                }
                (None, Some(kind)) => storyboard::build(kind, language, seed, resolution, fps),
                (None, None) => {
                    anyhow::bail!("Specify an animation (clock, pipeline, network) or --script")
                }
            };

            println!("\n📋 Storyboard Summary:");
            println!("{}", StoryboardParser::summarize(&board));

            if let Some(path) = export_report {
                match animation {
                    Some(kind) if script.is_none() => export_simulation_report(kind, seed, &path)?,
                    _ => println!("ℹ️  No simulation behind this storyboard; report skipped."),
                }
            }

            let output_dir = output.unwrap_or(config.renderer.output_dir.clone());
            let backend = renderer.unwrap_or(config.renderer.engine.clone());
            render_storyboard(board, &output_dir, &backend, force_cpu, format)?;
        }

        Commands::Storyboard {
            animation,
            language,
            seed,
            resolution,
            fps,
        } => {
            let language = language.unwrap_or_else(|| default_language(&config));
            let seed = resolve_seed(seed);
            let resolution =
                Resolution::Named(resolution.unwrap_or(config.video.default_resolution.clone()));
            let fps = fps.unwrap_or(config.video.default_fps);

            let board = storyboard::build(animation, language, seed, resolution, fps);
            println!("{}", serde_json::to_string_pretty(&board)?);
        }

        Commands::Validate { script } => {
            let board = StoryboardParser::parse_json(&script)?;
            println!("{}", StoryboardParser::summarize(&board));
            println!("✅ Validation complete");
        }
    }

    Ok(())
}

fn default_language(config: &AppConfig) -> Language {
    match config.video.default_language.as_str() {
        "tr" => Language::Tr,
        _ => Language::En,
    }
}

/// Pin the run to a seed so a storyboard can be regenerated exactly.
fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => seed,
        None => {
            let seed = rand::thread_rng().gen();
            tracing::info!(seed, "no seed given; drew one from entropy");
            seed
        }
    }
}

/// Re-run the simulation behind a built-in animation and export its stats.
fn export_simulation_report(kind: StoryboardKind, seed: u64, path: &Path) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let report = match kind {
        StoryboardKind::Pipeline => {
            Some(SimulationReport::from_pipeline(&chalkmotion::sim::pipeline::run(&mut rng)))
        }
        StoryboardKind::Network => {
            Some(SimulationReport::from_network(&chalkmotion::sim::network::run(&mut rng)))
        }
        StoryboardKind::Clock => None,
    };
    match report {
        Some(report) => {
            report.export(path)?;
            println!("📄 Report exported to: {}", path.display());
        }
        None => println!("ℹ️  The clock animation has no queue statistics to report."),
    }
    Ok(())
}

fn render_storyboard(
    board: Storyboard,
    output_dir: &Path,
    backend: &str,
    force_cpu: bool,
    format: FrameFormat,
) -> Result<()> {
    println!("\n🎬 Rendering frames...");
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)?;
    }

    if backend == "manim" {
        println!("🎨 Using external manim backend");
        let renderer = ManimRenderer::new(board, output_dir.to_path_buf());
        let video = renderer.render()?;
        println!("✨ Video created successfully: {}", video.display());
        return Ok(());
    }

    println!("🎨 Using Native Engine (CPU/GPU)");
    let fps = board.metadata.fps;
    let (width, height) = board.metadata.resolution.dimensions();
    let mut engine = RenderEngine::new(board, !force_cpu);
    engine.render(output_dir, format)?;

    if VideoEncoder::is_available() {
        let output_video = output_dir.join("output.mp4");
        let frame_pattern = output_dir.join(format.pattern());
        VideoEncoder::encode(
            frame_pattern
                .to_str()
                .context("Output path is not valid UTF-8")?,
            &output_video,
            fps,
            width,
            height,
        )?;
        println!("✨ Video created successfully: {}", output_video.display());
    } else {
        println!("⚠️  FFmpeg not found. Skipping video encoding.");
        println!("   Frames are saved in: {}", output_dir.display());
        println!("\n💡 To enable video generation, install FFmpeg:");
        if cfg!(target_os = "macos") {
            println!("   brew install ffmpeg");
        } else if cfg!(target_os = "windows") {
            println!("   choco install ffmpeg");
        } else if cfg!(target_os = "linux") {
            println!("   sudo apt-get install ffmpeg");
        } else {
            println!("   Install FFmpeg from https://ffmpeg.org/download.html");
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
