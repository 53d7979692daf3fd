use std::{path::PathBuf, sync::Arc};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use facecap::{
    AcceptedFace, CaptureConfig, CaptureJob, FfmpegLogLevel, OperationType, ProgressCallback,
    ProgressInfo, deepface::DeepFaceClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::{EnvFilter, prelude::*};

const CLI_AFTER_HELP: &str = "Examples:\n  facecap -c conf/face_capture.conf\n  facecap -i episode01.mp4 -s episode01.srt -o avatars/episode01 --progress\n  facecap --dry-run --json\n  facecap completions zsh > _facecap";

const DEFAULT_CONFIGURATION_PATH: &str = "conf/face_capture.conf";

#[derive(Debug, Parser)]
#[command(
    name = "facecap",
    version,
    about = "Capture character avatars from a video at its subtitle timings",
    after_help = CLI_AFTER_HELP,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args, Clone, Default)]
struct RunArgs {
    /// Configuration file.
    #[arg(short = 'c', long = "conf", default_value = DEFAULT_CONFIGURATION_PATH)]
    conf: PathBuf,

    /// Input video (overrides `video_path`).
    #[arg(short = 'i', long)]
    video: Option<PathBuf>,

    /// Subtitle file (overrides `sub_path`).
    #[arg(short = 's', long)]
    subtitles: Option<PathBuf>,

    /// Avatar output directory (overrides `avatar_output_path`).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Face-analysis service base URL (overrides `analysis_endpoint`).
    #[arg(long)]
    endpoint: Option<String>,

    /// Only list the keyframes that would be analyzed.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Debug logging, including per-face attribute confidences.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Frames of padding around each subtitle interval.
    #[arg(long)]
    frame_redundancy: Option<u64>,

    /// Avatar width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Avatar height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Minimum horizontal eye distance for a frontal face, in pixels.
    #[arg(long)]
    eye_diff_threshold: Option<f64>,

    /// Minimum face detector confidence (inclusive).
    #[arg(long)]
    min_confidence: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Layer command-line overrides on top of the file configuration.
fn apply_overrides(args: &RunArgs, mut config: CaptureConfig) -> CaptureConfig {
    if let Some(video) = &args.video {
        config.video_path = Some(video.clone());
    }
    if let Some(subtitles) = &args.subtitles {
        config.subtitle_path = Some(subtitles.clone());
    }
    if let Some(output) = &args.output {
        config.output_directory = Some(output.clone());
    }
    if let Some(endpoint) = &args.endpoint {
        config.analysis_endpoint = Some(endpoint.clone());
    }
    if let Some(frames) = args.frame_redundancy {
        config.frame_redundancy = frames;
    }
    if let Some(width) = args.width {
        config.image_width = width;
    }
    if let Some(height) = args.height {
        config.image_height = height;
    }
    if let Some(threshold) = args.eye_diff_threshold {
        config.eye_diff_threshold = threshold;
    }
    if let Some(confidence) = args.min_confidence {
        config.min_face_confidence = confidence;
    }
    config.dry_run |= args.dry_run;
    config
}

fn required(value: Option<PathBuf>, key: &str, flag: &str) -> Result<PathBuf, String> {
    value.ok_or_else(|| format!("no {key} configured (set it in the config file or pass {flag})"))
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,facecap=debug"
    } else {
        "warn,facecap=info"
    }
}

fn init_logging(verbose: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(verbose)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Ctrl-C logs a warning and exits with status 1 instead of dying silently.
fn install_interrupt_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        log::warn!("Interrupted, exiting");
        std::process::exit(1);
    })
}

fn operation_label(operation: OperationType) -> &'static str {
    match operation {
        OperationType::KeyframeScan => "scanning keyframes",
        OperationType::FaceCapture => "capturing faces",
        _ => "working",
    }
}

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(operation_label(info.operation));
    }
}

fn print_faces(faces: &[AcceptedFace], as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(faces)?);
        return Ok(());
    }

    for face in faces {
        println!(
            "{} {} age={} gender={} race={} emotion={}",
            "saved".green().bold(),
            face.image_path.display(),
            face.age,
            face.gender,
            face.race,
            face.emotion,
        );
    }
    println!("{} face(s) captured", faces.len());
    Ok(())
}

fn print_keyframes(keyframes: &[u64], as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "dry_run": true,
            "keyframes": keyframes,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} {} keyframe(s) would be analyzed: {keyframes:?}",
            "dry run:".yellow().bold(),
            keyframes.len()
        );
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "facecap", &mut std::io::stdout());
        return Ok(());
    }

    let args = cli.run;
    init_logging(args.verbose);
    install_interrupt_handler()?;

    if let Some(level) = &args.log_level {
        facecap::set_ffmpeg_log_level(level.parse::<FfmpegLogLevel>()?);
    }

    let config = apply_overrides(&args, CaptureConfig::load(&args.conf)?);
    let video_path = required(config.video_path.clone(), "video_path", "--video")?;
    let subtitle_path = required(config.subtitle_path.clone(), "sub_path", "--subtitles")?;

    let mut options = config.capture_options();
    let progress_bar = if args.progress {
        let progress = Arc::new(BarProgress::new()?);
        options = options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    if config.dry_run {
        let output_directory = config.output_directory.clone().unwrap_or_default();
        let job = CaptureJob::new(video_path, subtitle_path, output_directory).with_options(options);
        let keyframes = job.plan()?;
        if let Some(progress) = &progress_bar {
            progress.bar.finish_and_clear();
        }
        return print_keyframes(&keyframes, args.json);
    }

    let output_directory = required(
        config.output_directory.clone(),
        "avatar_output_path",
        "--output",
    )?;
    let endpoint = config
        .analysis_endpoint
        .clone()
        .unwrap_or_else(|| facecap::deepface::DEFAULT_ENDPOINT.to_string());

    let job = CaptureJob::new(video_path, subtitle_path, output_directory).with_options(options);
    let mut analyzer = DeepFaceClient::new(endpoint)?;
    let faces = job.run(&mut analyzer)?;

    if let Some(progress) = &progress_bar {
        progress.bar.finish_and_clear();
    }
    print_faces(&faces, args.json)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
