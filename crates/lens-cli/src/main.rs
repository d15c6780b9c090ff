use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lens_core::gesture::GESTURE_RULES;
use lens_core::pipeline::{DetectionAdapter, FramePipeline};
use lens_core::{builtin_tables, Adjustments, ClassLabel, FilterName, LensTables, Mapper};
use lens_io::source;
use lens_io::{
    ColorSegmenter, ImageSequence, JsonDetections, RecommendationStore, Session, SessionOptions,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

mod config;

use config::LensConfig;

#[derive(Parser)]
#[command(
    name = "healthy-lens",
    about = "Label-driven image filters for detected products, faces and hands"
)]
struct Cli {
    /// Table file overriding the built-in tables (also LENS_TABLES_PATH)
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DetectionArgs {
    /// Recorded detections (JSON keyed by frame file name, "*" for every frame)
    #[arg(long, conflicts_with = "segment")]
    detections: Option<PathBuf>,
    /// Detect red/green/blue colour blobs instead of reading recorded detections
    #[arg(long)]
    segment: bool,
}

#[derive(clap::Args)]
struct SliderArgs {
    /// Brightness slider, 0-100 (50 = unchanged)
    #[arg(long, default_value_t = 50)]
    brightness: u8,
    /// Blur slider, 0-20
    #[arg(long, default_value_t = 0)]
    blur: u8,
    /// Hue slider, 0-179
    #[arg(long, default_value_t = 0)]
    hue: u8,
}

impl SliderArgs {
    fn adjustments(&self) -> Adjustments {
        Adjustments::new(self.brightness, self.blur, self.hue)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Filter and annotate a single frame
    Process {
        /// Input image
        #[arg(long)]
        frame: PathBuf,
        #[command(flatten)]
        source: DetectionArgs,
        /// Output image
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        sliders: SliderArgs,
    },
    /// Process every image in a directory until done or Ctrl-C
    Run {
        /// Directory of frames, processed in file-name order
        #[arg(long)]
        frames: PathBuf,
        #[command(flatten)]
        source: DetectionArgs,
        /// Output directory (default: LENS_OUTPUT_DIR or ./lens-out)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Stop after this many frames (default: LENS_MAX_FRAMES, 0 = all)
        #[arg(long)]
        max_frames: Option<usize>,
        #[command(flatten)]
        sliders: SliderArgs,
    },
    /// Show which health band and filter a score falls into
    Score {
        /// Health score, nominally 0-100
        value: f32,
    },
    /// Print the gesture decision table and the filter each gesture selects
    Gestures,
    /// Print the effective lookup tables as TOML
    Tables,
    /// List recommendations for a product
    Recommend {
        /// Product key (e.g. "instant_noodle")
        product: String,
        /// Recommendation database (default: LENS_RECOMMENDATIONS_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print a JSON status summary
    Status,
}

fn load_tables(cli_path: Option<&Path>, cfg: &LensConfig) -> Result<LensTables> {
    match cli_path.or(cfg.tables_path.as_deref()) {
        Some(path) => LensTables::load(path)
            .with_context(|| format!("loading tables from {}", path.display())),
        None => Ok(builtin_tables().clone()),
    }
}

fn make_adapter(args: &DetectionArgs) -> Result<Box<dyn DetectionAdapter>> {
    if let Some(path) = &args.detections {
        let adapter = JsonDetections::load(path)
            .with_context(|| format!("loading detections from {}", path.display()))?;
        return Ok(Box::new(adapter));
    }
    if args.segment {
        return Ok(Box::new(ColorSegmenter::default()));
    }
    bail!("one of --detections or --segment is required")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn tristate(v: Option<bool>) -> &'static str {
    match v {
        Some(true) => "up",
        Some(false) => "down",
        None => "any",
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = LensConfig::from_env();
    let tables = load_tables(cli.tables.as_deref(), &cfg)?;

    match cli.command {
        Commands::Process {
            frame,
            source: detection_args,
            out,
            sliders,
        } => {
            let mut adapter = make_adapter(&detection_args)?;
            let mut image = source::load_frame(&frame)
                .with_context(|| format!("reading frame {}", frame.display()))?;

            let mut pipeline = FramePipeline::new(tables);
            adapter.begin_frame(&file_name(&frame));
            let report = pipeline.run_frame(
                adapter.as_mut(),
                &mut image,
                cfg.confidence_threshold,
                &sliders.adjustments(),
            );
            source::save_frame(&out, &image)
                .with_context(|| format!("writing {}", out.display()))?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Run {
            frames,
            source: detection_args,
            out,
            max_frames,
            sliders,
        } => {
            let mut adapter = make_adapter(&detection_args)?;
            let sequence = ImageSequence::open(&frames)
                .with_context(|| format!("opening frames in {}", frames.display()))?;
            let output_dir = out.unwrap_or_else(|| cfg.output_dir.clone());

            let options = SessionOptions {
                confidence_threshold: cfg.confidence_threshold,
                max_frames: max_frames.unwrap_or(cfg.max_frames),
                output_dir: Some(output_dir.clone()),
                adjustments: sliders.adjustments(),
            };
            let mut session = Session::new(FramePipeline::new(tables), options);

            let stop = session.stop_handle();
            ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
                .context("installing Ctrl-C handler")?;

            let summary = session.run(sequence, adapter.as_mut(), |frame, report| {
                tracing::debug!(
                    frame = %frame.name,
                    applied = report.applied.len(),
                    skipped = report.skipped.len(),
                    "frame done"
                );
            })?;

            println!(
                "{} frame(s) processed, {} filter(s) applied, {} unreadable -> {}{}",
                summary.frames,
                summary.filters_applied,
                summary.unreadable,
                output_dir.display(),
                if summary.stopped_early { " (stopped early)" } else { "" },
            );
        }
        Commands::Score { value } => {
            let bands = &tables.health_bands;
            let index = bands.band_index(value);
            let rows = bands.describe();
            let (range, filter) = &rows[index.min(rows.len() - 1)];
            println!("score {value}: band {} ({range}) -> {filter}", index + 1);
        }
        Commands::Gestures => {
            let mapper = Mapper::new(tables);
            println!(
                "{:<10} {:>5} {:>5} {:>6} {:>5} {:>5}  filter",
                "gesture", "thumb", "index", "middle", "ring", "pinky"
            );
            for rule in &GESTURE_RULES {
                let filter = mapper.map_label(&ClassLabel::Gesture(rule.gesture));
                println!(
                    "{:<10} {:>5} {:>5} {:>6} {:>5} {:>5}  {filter}",
                    rule.gesture.display_name(),
                    tristate(rule.thumb),
                    tristate(rule.index),
                    tristate(rule.middle),
                    tristate(rule.ring),
                    tristate(rule.pinky),
                );
            }
            println!("(any other finger state: no gesture)");
        }
        Commands::Tables => {
            print!("{}", tables.to_toml_string()?);
        }
        Commands::Recommend { product, db } => {
            let path = db.unwrap_or_else(|| cfg.recommendations_path.clone());
            let store = RecommendationStore::load(&path)
                .with_context(|| format!("loading recommendations from {}", path.display()))?;
            let recs = store.lookup(&product);
            if recs.is_empty() {
                println!("No recommendations for {product}");
            } else {
                for rec in recs {
                    println!("- {rec}");
                }
            }
        }
        Commands::Status => {
            let status = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "table_version": tables.version,
                "tables": cli
                    .tables
                    .as_deref()
                    .or(cfg.tables_path.as_deref())
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "builtin".to_string()),
                "filters": FilterName::ALL.len(),
                "gestures": tables.gestures.len(),
                "emotions": tables.emotions.len(),
                "health_bands": tables.health_bands.len(),
                "confidence_threshold": cfg.confidence_threshold,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
