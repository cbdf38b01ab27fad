use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use deepcheck::{
    ClientOptions, DEFAULT_BASE_URL, DecoderLogLevel, ExtractOptions, ExtractionOutcome,
    ExtractionReport, FfmpegDecoder, Frame, FrameDecoder, MediaKind, MediaSource, Notification,
    Notifier, PredictionClient, PredictionRequest, PredictionResult, Predictor, ProgressCallback,
    ProgressInfo, Session, SessionConfig, SnapshotFormat, extract_frames,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  deepcheck metadata clip.mp4 --json\n  deepcheck frames clip.mp4 --out frames --progress\n  deepcheck predict face.jpg --base-url http://localhost:8000\n  deepcheck analyze clip.mp4 --out frames\n  deepcheck completions zsh > _deepcheck";

#[derive(Debug, Parser)]
#[command(
    name = "deepcheck",
    version,
    about = "Preview videos frame by frame and check them with a deepfake-detection service",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Prediction service root.
    #[arg(long, env = "DEEPCHECK_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Prediction request timeout in seconds.
    #[arg(long, default_value_t = 60, global = true)]
    timeout: u64,

    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while extracting frames.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow writing into existing output directories and files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print video metadata.
    #[command(
        about = "Print video metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  deepcheck metadata clip.mp4\n  deepcheck metadata clip.mp4 --json"
    )]
    Metadata {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Capture one frame per second into a directory.
    #[command(
        about = "Extract one frame per second",
        after_help = "Examples:\n  deepcheck frames clip.mp4 --out frames\n  deepcheck frames clip.mp4 --out frames --format jpg --max-frames 120"
    )]
    Frames {
        /// Input video path.
        input: PathBuf,
        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,
        /// Snapshot encoding (png, jpg).
        #[arg(long, default_value = "png")]
        format: String,
        /// Stop after this many frames (0 = no limit).
        #[arg(long, default_value_t = 0)]
        max_frames: u64,
    },

    /// Upload a file to the prediction service.
    #[command(
        about = "Ask the service for a verdict",
        after_help = "Examples:\n  deepcheck predict face.jpg\n  deepcheck predict clip.bin --kind video --json"
    )]
    Predict {
        /// Input video or image path.
        input: PathBuf,
        /// Media kind (video, image). Guessed from the extension when omitted.
        #[arg(long)]
        kind: Option<MediaKind>,
        /// Output the verdict as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Preview and predict in one go, like the web page.
    #[command(
        about = "Extract preview frames and predict",
        after_help = "Examples:\n  deepcheck analyze clip.mp4\n  deepcheck analyze clip.mp4 --out frames"
    )]
    Analyze {
        /// Input video or image path.
        input: PathBuf,
        /// Media kind (video, image). Guessed from the extension when omitted.
        #[arg(long)]
        kind: Option<MediaKind>,
        /// Optional directory to save preview frames into.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_snapshot_format(value: &str) -> Option<SnapshotFormat> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => Some(SnapshotFormat::Png),
        "jpg" | "jpeg" => Some(SnapshotFormat::Jpeg),
        _ => None,
    }
}

fn resolve_kind(
    input: &Path,
    kind: Option<MediaKind>,
) -> Result<MediaKind, Box<dyn std::error::Error>> {
    kind.or_else(|| MediaKind::from_path(input))
        .ok_or_else(|| {
            format!(
                "cannot tell whether {} is a video or an image (use --kind)",
                input.display()
            )
            .into()
        })
}

fn prepare_output_directory(out: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if out.exists() {
        if !overwrite {
            return Err(format!(
                "output directory already exists: {} (use --overwrite)",
                out.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("writing into existing directory {}", out.display()).yellow()
        );
    }
    fs::create_dir_all(out)?;
    Ok(())
}

fn save_frames(
    frames: &[Frame],
    out: &Path,
    verbose: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    for frame in frames {
        let path = out.join(format!(
            "second_{:06}.{}",
            frame.index(),
            frame.format().extension()
        ));
        frame.save(&path)?;
        if verbose {
            eprintln!("saved {:?} -> {}", frame.timestamp(), path.display());
        }
    }
    Ok(frames.len())
}

fn describe_outcome(report: &ExtractionReport) -> String {
    match &report.outcome {
        ExtractionOutcome::Completed => format!("{} frame(s)", report.captured),
        ExtractionOutcome::Truncated { at, reason } => format!(
            "{} frame(s), stopped at {:?}: {reason}",
            report.captured, at
        ),
        ExtractionOutcome::Abandoned => format!("{} frame(s), abandoned", report.captured),
        ExtractionOutcome::Unreadable { reason } => format!("no frames: {reason}"),
        ExtractionOutcome::Capped => format!("{} frame(s), capped", report.captured),
        other => format!("{} frame(s), {other:?}", report.captured),
    }
}

fn print_verdict(result: PredictionResult) {
    let label = match result {
        PredictionResult::Real => result.label().green().bold(),
        PredictionResult::Fake => result.label().red().bold(),
        PredictionResult::NoFaceDetected => result.label().dimmed().bold(),
    };
    println!("Prediction Result: {label}");
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if let Some(timestamp) = info.current_timestamp {
            self.bar.set_message(format!("{}s", timestamp.as_secs()));
        }
    }
}

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::Success(message) => eprintln!("{}", message.green()),
            Notification::Error(message) => eprintln!("{}", message.red().bold()),
        }
    }
}

fn extract_options(
    global: &GlobalOptions,
    format: SnapshotFormat,
    max_frames: u64,
) -> Result<(ExtractOptions, Option<ProgressBar>), Box<dyn std::error::Error>> {
    let mut options = ExtractOptions::new()
        .with_snapshot_format(format)
        .with_max_frames(max_frames);
    let mut bar = None;

    if global.progress {
        let progress = TerminalProgress::new()?;
        bar = Some(progress.bar.clone());
        options = options.with_progress(Arc::new(progress));
    }

    Ok((options, bar))
}

fn client_options(global: &GlobalOptions) -> ClientOptions {
    ClientOptions::new(global.base_url.clone()).with_timeout(Duration::from_secs(global.timeout))
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed =
            DecoderLogLevel::parse(level).ok_or(format!("unsupported --log-level: {level}"))?;
        deepcheck::set_decoder_log_level(parsed);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Metadata { input, json } => {
            let decoder = FfmpegDecoder::open(&input)?;
            let metadata = decoder.metadata();
            if json {
                let payload = json!({
                    "width": metadata.width,
                    "height": metadata.height,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "fps": metadata.frames_per_second,
                    "codec": metadata.codec,
                    "preview_frames": metadata.expected_frame_count(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec
                );
                println!("Duration: {:?}", metadata.duration);
                println!("Preview frames: {}", metadata.expected_frame_count());
            }
        }
        Commands::Frames {
            input,
            out,
            format,
            max_frames,
        } => {
            let format =
                parse_snapshot_format(&format).ok_or(format!("unsupported --format: {format}"))?;
            prepare_output_directory(&out, cli.global.overwrite)?;

            let (options, bar) = extract_options(&cli.global, format, max_frames)?;
            let mut decoder = FfmpegDecoder::open(&input)?;
            let (frames, report) = extract_frames(&mut decoder, &options);

            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            let saved = save_frames(&frames, &out, cli.global.verbose)?;
            if cli.global.verbose || !report.is_complete() {
                eprintln!("{} {}", "extraction:".cyan().bold(), describe_outcome(&report));
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Saved {saved} frame(s) to {}", out.display()).green()
            );
        }
        Commands::Predict { input, kind, json } => {
            let kind = resolve_kind(&input, kind)?;
            let bytes = fs::read(&input)?;
            let file_name = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| kind.field_name().to_string());

            let client = PredictionClient::new(&client_options(&cli.global))?;
            if cli.global.verbose {
                eprintln!("uploading to {}", client.endpoint_url(kind));
            }

            let runtime = tokio::runtime::Runtime::new()?;
            let result =
                runtime.block_on(client.predict(PredictionRequest::new(kind, file_name, bytes)))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&json!({ "result": result }))?);
            } else {
                print_verdict(result);
            }
        }
        Commands::Analyze { input, kind, out } => {
            let kind = resolve_kind(&input, kind)?;
            if let Some(out) = &out {
                prepare_output_directory(out, cli.global.overwrite)?;
            }

            let (options, bar) = extract_options(&cli.global, SnapshotFormat::Png, 0)?;
            let config = SessionConfig::new(client_options(&cli.global)).with_extract_options(options);
            let runtime = tokio::runtime::Runtime::new()?;
            let session = Session::builder(config)
                .with_notifier(Arc::new(TerminalNotifier))
                .with_runtime(runtime.handle().clone())
                .build()?;

            let (report, verdict) = runtime.block_on(async {
                let source = MediaSource::from_path(kind, &input).await?;
                if kind == MediaKind::Image {
                    let image = source.decode_image()?;
                    if cli.global.verbose {
                        eprintln!("image: {}x{}", image.width(), image.height());
                    }
                }

                let task = session.select(Some(source));
                let verdict = session.predict().await;
                let report = match task {
                    Some(task) => Some(task.await?),
                    None => None,
                };
                Ok::<_, deepcheck::DeepcheckError>((report, verdict))
            })?;

            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            if let Some(report) = &report {
                eprintln!("{} {}", "preview:".cyan().bold(), describe_outcome(report));
            }
            if let Some(out) = &out {
                let saved = save_frames(&session.frames().frames(), out, cli.global.verbose)?;
                println!("{} {saved} frame(s) -> {}", "saved".green().bold(), out.display());
            }

            print_verdict(verdict?);
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "deepcheck", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
