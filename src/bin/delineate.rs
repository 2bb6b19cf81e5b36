use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use delineate::{
    DeliveryError, DeliverySink, NullSegmenter, ObserverError, Pipeline, PipelineOptions,
    ProgressObserver, probe_duration, probe_frame_rate,
};

const CLI_AFTER_HELP: &str = "Examples:\n  delineate probe input.mp4 --json\n  delineate annotate input.mp4 --out annotated.mp4 --progress\n  delineate annotate input.mp4 --out annotated.mp4 --workers 4 --keep-workspace\n  delineate completions zsh > _delineate";

#[derive(Debug, Parser)]
#[command(
    name = "delineate",
    version,
    about = "Draw segmentation-derived object outlines onto every frame of a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// Path to the ffmpeg binary (defaults to `ffmpeg` from PATH).
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Path to the ffprobe binary (defaults to `ffprobe` from PATH).
    #[arg(long)]
    ffprobe: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a video's duration and frame rate (alias: info).
    #[command(
        about = "Print video metadata",
        visible_alias = "info",
        after_help = "Examples:\n  delineate probe input.mp4\n  delineate probe input.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the full annotation pipeline on a video.
    #[command(
        about = "Annotate a video with segmentation outlines",
        after_help = "Examples:\n  delineate annotate input.mp4 --out annotated.mp4 --progress\n  delineate annotate input.mp4 --out annotated.mp4 --quality 5 --workers 2\n\nWithout a model plugged in, the built-in background-only segmenter is\nused: the output is the darkened source with no outlines, which is\nuseful for validating the pipeline itself."
    )]
    Annotate {
        /// Input video path.
        input: PathBuf,

        /// Output video path.
        #[arg(long, default_value = "annotated.mp4")]
        out: PathBuf,

        /// Frame extraction quality (`-q:v`, lower is better).
        #[arg(long, default_value_t = 2)]
        quality: u32,

        /// Worker threads for per-frame overlay work.
        #[arg(long)]
        workers: Option<usize>,

        /// Keep the job workspace on disk for inspection.
        #[arg(long)]
        keep_workspace: bool,

        /// Create the job workspace under this directory.
        #[arg(long)]
        workspace_root: Option<PathBuf>,

        /// Allow overwriting an existing output file.
        #[arg(long)]
        overwrite: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Silent when --progress is off.
enum TerminalProgress {
    Quiet,
    Bar(ProgressBar),
}

impl TerminalProgress {
    fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::Quiet;
        }
        let bar = ProgressBar::new(100);
        bar.set_style(ProgressStyle::default_bar());
        Self::Bar(bar)
    }

    fn finish(&self) {
        if let Self::Bar(bar) = self {
            bar.finish_and_clear();
        }
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_progress(&self, percent: u8) -> Result<(), ObserverError> {
        if let Self::Bar(bar) = self {
            bar.set_position(u64::from(percent));
        }
        Ok(())
    }
}

// Delivery for the CLI is just a file write.
struct FileSink {
    path: PathBuf,
}

#[async_trait]
impl DeliverySink for FileSink {
    async fn deliver(&self, video: &[u8]) -> Result<(), DeliveryError> {
        tokio::fs::write(&self.path, video)
            .await
            .map_err(|error| DeliveryError::Rejected(error.to_string()))
    }
}

fn probe_programs(global: &GlobalOptions) -> (String, String) {
    (
        global.ffmpeg.clone().unwrap_or_else(|| "ffmpeg".to_string()),
        global.ffprobe.clone().unwrap_or_else(|| "ffprobe".to_string()),
    )
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (ffmpeg, ffprobe) = probe_programs(&cli.global);

    match cli.command {
        Commands::Probe { input, json } => {
            let duration = probe_duration(&ffprobe, &input).await?;
            let frame_rate = probe_frame_rate(&ffprobe, &input).await?;

            if json {
                let payload = json!({
                    "duration_seconds": duration,
                    "frame_rate": {
                        "numerator": frame_rate.numerator,
                        "denominator": frame_rate.denominator,
                        "fps": frame_rate.as_f64(),
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Duration: {} ({duration:.3}s)", format_duration(duration));
                println!("Frame rate: {frame_rate} ({:.3} fps)", frame_rate.as_f64());
            }
        }
        Commands::Annotate {
            input,
            out,
            quality,
            workers,
            keep_workspace,
            workspace_root,
            overwrite,
        } => {
            ensure_writable_path(&out, overwrite)?;

            let video = tokio::fs::read(&input).await?;

            let mut options = PipelineOptions::new()
                .with_ffmpeg_program(ffmpeg)
                .with_ffprobe_program(ffprobe)
                .with_frame_quality(quality)
                .with_keep_workspace(keep_workspace);
            if let Some(workers) = workers {
                options = options.with_workers(workers);
            }
            if let Some(root) = workspace_root {
                options = options.with_workspace_root(root);
            }

            let observer = TerminalProgress::new(cli.global.progress);
            let sink = FileSink { path: out.clone() };

            let pipeline = Pipeline::new(options);
            pipeline
                .run(&video, Arc::new(NullSegmenter), &observer, &sink)
                .await?;
            observer.finish();

            println!("{} {}", "saved".green().bold(), out.display());
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "delineate", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
