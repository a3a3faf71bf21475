use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

use carcolors::detection::coco;
use carcolors::{Pipeline, PipelineConfig, ProgressEvent, YoloDetector, YoloParams, render, sink};

#[derive(Parser)]
#[command(name = "carcolors")]
#[command(about = "Find vehicles in image folders and extract their dominant colors")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by commands that run the detector
#[derive(clap::Args)]
struct ModelArgs {
    /// Path to a YOLO model in .rten format [default: ~/.cache/carcolors/yolov5s.rten]
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of dominant colors
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Vehicle classes, by COCO label or id (repeatable)
    #[arg(long = "class", value_name = "LABEL")]
    classes: Vec<String>,

    /// Fixed seed for reproducible clustering
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory, write the CSV ledger and copy vehicle images
    Batch {
        #[arg(value_name = "INPUT_DIR")]
        input_dir: PathBuf,

        #[command(flatten)]
        model: ModelArgs,

        /// Directory receiving copies of vehicle images
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// CSV ledger path
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,

        /// Images per detector call
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Detect and extract dominant colors for a single image
    Inspect {
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        #[command(flatten)]
        model: ModelArgs,

        /// Save the image with vehicle boxes drawn
        #[arg(long, value_name = "FILE")]
        annotate_out: Option<PathBuf>,

        /// Save a swatch image of the dominant colors
        #[arg(long, value_name = "FILE")]
        palette_out: Option<PathBuf>,
    },
    /// List vehicle images recorded in a ledger
    Results {
        #[arg(value_name = "SUMMARY")]
        summary: PathBuf,

        /// Directory the ledger was produced from
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn default_model_path() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/carcolors/yolov5s.rten"))
}

fn load_config(args: &ModelArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(k) = args.clusters {
        config.cluster_count = k;
    }
    if !args.classes.is_empty() {
        config = config.with_target_labels(&args.classes)?;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

fn build_pipeline(args: &ModelArgs, config: PipelineConfig) -> anyhow::Result<Pipeline> {
    let model_path = match &args.model {
        Some(path) => path.clone(),
        None => default_model_path()?,
    };
    let detector = YoloDetector::load(&model_path, YoloParams::default())?;
    Ok(Pipeline::new(Arc::new(detector), config)?)
}

async fn run_batch(
    input_dir: PathBuf,
    args: ModelArgs,
    output_dir: Option<PathBuf>,
    summary: Option<PathBuf>,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = load_config(&args)?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(path) = summary {
        config.summary_path = path;
    }
    if let Some(size) = batch_size {
        config.detect_batch_size = size;
    }

    let pipeline = Arc::new(build_pipeline(&args, config)?);
    let summary_path = pipeline.config().summary_path.clone();
    let output_dir = pipeline.config().output_dir.clone();

    let mut handle = pipeline.spawn_batch(input_dir);
    let cancel = handle.cancel_token();
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(ProgressEvent::Advanced { processed, total, fraction }) => {
                    println!("Progress: {:>3}% ({}/{})", (fraction * 100.0).round() as u32, processed, total);
                }
                Some(ProgressEvent::Skipped { file_name, reason }) => {
                    println!("  Skipped {}: {}", file_name, reason);
                }
                Some(ProgressEvent::Finished { .. }) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                eprintln!("Stopping after the current image...");
                cancel.cancel();
            }
        }
    }

    let report = handle.wait().await?;

    println!("\n=== Batch Results ===");
    println!("Images processed: {}/{}", report.processed, report.total);
    println!("Images with vehicles: {}", report.vehicles);
    if !report.failures.is_empty() {
        println!("Unreadable images: {}", report.failures.len());
    }
    if report.cancelled {
        println!("Batch was cancelled; the ledger holds the rows written so far.");
    }
    println!("Ledger: {}", summary_path.display());
    println!("Vehicle images copied to: {}", output_dir.display());
    println!(
        "Elapsed: {:.1}s",
        (report.finished_at - report.started_at).as_seconds_f64()
    );

    Ok(())
}

fn run_inspect(
    image_path: PathBuf,
    args: ModelArgs,
    annotate_out: Option<PathBuf>,
    palette_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let pipeline = build_pipeline(&args, config)?;

    let analysis = pipeline.inspect(&image_path)?;
    let record = &analysis.record;
    println!(
        "{} ({}, {:.1} MB)",
        record.file_name(),
        record.resolution(),
        record.size_mb()
    );

    println!("\nDetections: {}", analysis.detections.len());
    for detection in &analysis.detections {
        let b = detection.bbox;
        println!(
            "  {} ({:.2}) at ({}, {})-({}, {})",
            coco::label(detection.class_id).unwrap_or("unknown"),
            detection.confidence,
            b.x1,
            b.y1,
            b.x2,
            b.y2
        );
    }
    println!("Vehicle present: {}", analysis.has_vehicle);

    if let Some(colors) = &analysis.colors {
        println!("\nDominant colors ({:?}, {} pixels):", colors.path, colors.sampled);
        for cluster in &colors.clusters {
            let [r, g, b] = cluster.to_rgb();
            println!(
                "  RGB: {}, {}, {}  {}  ({} pixels)",
                r,
                g,
                b,
                cluster.hex(),
                cluster.member_count
            );
        }
    }

    if let Some(path) = annotate_out {
        render::annotate(
            &image::open(&image_path)?,
            &analysis.detections,
            &pipeline.config().target_classes,
        )
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to save annotated image: {}", e))?;
        println!("\nAnnotated image saved to {}", path.display());
    }

    if let Some(path) = palette_out {
        render::palette(analysis.clusters(), 100)
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save palette: {}", e))?;
        println!("Palette saved to {}", path.display());
    }

    Ok(())
}

fn run_results(summary: PathBuf, input_dir: PathBuf) -> anyhow::Result<()> {
    let records = sink::vehicle_records(&summary, &input_dir)?;

    println!("=== Vehicle Images ===");
    if records.is_empty() {
        println!("No vehicle images recorded.");
        return Ok(());
    }
    for record in &records {
        println!(
            "  {:<40} {:>11}  {:>6.1} MB",
            record.file_name(),
            record.resolution(),
            record.size_mb()
        );
    }
    println!("\nTotal: {}", records.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Batch {
            input_dir,
            model,
            output_dir,
            summary,
            batch_size,
        } => run_batch(input_dir, model, output_dir, summary, batch_size).await,
        Command::Inspect {
            image_path,
            model,
            annotate_out,
            palette_out,
        } => run_inspect(image_path, model, annotate_out, palette_out),
        Command::Results { summary, input_dir } => run_results(summary, input_dir),
    }
}
