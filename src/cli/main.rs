//! Background Compositing CLI Tool
//!
//! Command-line interface for placing a cut-out foreground onto a solid
//! color or a background image using the unified processor.

use super::config::{parse_background_mode, parse_canvas_size, parse_placement_mode, CliConfigBuilder};
use crate::{
    config::{BackgroundMode, CompositeConfig, PlacementMode},
    processor::CompositeProcessor,
    services::{ImageIOService, OutputFormatHandler},
    tracing_config::{events, init_cli_tracing, spans},
    types::CompositeResult,
    PassthroughSegmenter,
};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, Instrument};

/// Background compositing CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-bgcomposite")]
pub struct Cli {
    /// Foreground image whose alpha channel marks the subject (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Background image to composite onto (implies --mode image)
    #[arg(short, long, value_name = "BACKGROUND")]
    pub background: Option<PathBuf>,

    /// Background mode: cutout, color or image [default: inferred from --background / --color]
    #[arg(long, value_parser = parse_background_mode)]
    pub mode: Option<BackgroundMode>,

    /// Solid background color as #RRGGBB or #RGB (implies --mode color)
    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    /// Canvas size for color mode as WIDTHxHEIGHT [default: twice the foreground]
    #[arg(long, value_name = "WxH", value_parser = parse_canvas_size)]
    pub canvas_size: Option<(u32, u32)>,

    /// Foreground scale relative to its original size [default: 0.5]
    #[arg(short, long)]
    pub scale: Option<f64>,

    /// Placement: center, random, thirds (rule-of-thirds) or corners [default: center]
    #[arg(short, long, value_parser = parse_placement_mode)]
    pub placement: Option<PlacementMode>,

    /// Edge margin for random and corner placement, in percent of the shorter canvas side (0-20) [default: 5]
    #[arg(long, value_name = "PERCENT")]
    pub margin: Option<f64>,

    /// Jitter around thirds intersections, in percent of the shorter canvas side (0-10) [default: 2]
    #[arg(long, value_name = "PERCENT")]
    pub jitter: Option<f64>,

    /// Seed for reproducible placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Make alpha below this percentage fully transparent (0-90) [default: 0]
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u8).range(0..=90))]
    pub alpha_threshold: Option<u8>,

    /// JPEG quality for composited output (0-100) [default: 90]
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub jpeg_quality: Option<u8>,

    /// Output file. Use "-" for stdout [default: <input>_composite.<ext>, stdout for stdin input]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Also save the refined alpha mask as a grayscale PNG
    #[arg(long, value_name = "PATH")]
    pub mask_output: Option<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let session = spans::session(
        &session_id,
        &config.background_mode.to_string(),
        &config.placement_policy().to_string(),
    );

    let outcome = run(&cli, config).instrument(session).await;
    if let Err(e) = &outcome {
        events::error_with_context(&**e, "compositing");
    }
    outcome
}

async fn run(cli: &Cli, config: CompositeConfig) -> Result<()> {
    info!("Starting background compositing CLI");
    info!(
        "Mode: {}, placement: {}, scale: {}",
        config.background_mode,
        config.placement_policy(),
        config.scale_factor
    );

    let foreground = read_input(&cli.input).await?;
    let background = match &cli.background {
        Some(path) => Some(read_background(path).await?),
        None => None,
    };

    let mut processor = CompositeProcessor::with_segmenter(config.clone(), PassthroughSegmenter)?;
    let mut result = processor
        .process_bytes(&foreground, background.as_deref())
        .context("Failed to composite image")?;

    if let Some(mask_path) = &cli.mask_output {
        result
            .mask
            .save_png(mask_path)
            .with_context(|| format!("Failed to save mask to {}", mask_path.display()))?;
        info!("Mask saved to: {}", mask_path.display());
    }

    let destination = write_output(cli, &mut result, config.jpeg_quality).await?;
    log_breakdown(&result);
    events::request_completed(&result.timing_summary(), &destination);

    Ok(())
}

/// Read the foreground from a file or stdin
async fn read_input(input: &str) -> Result<Vec<u8>> {
    let span = spans::file_processing(input, "foreground");
    async {
        let data = if input == "-" {
            info!("Reading foreground from stdin");
            let mut buffer = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buffer)
                .await
                .context("Failed to read image data from stdin")?;
            buffer
        } else {
            let path = Path::new(input);
            if !ImageIOService::is_supported_format(path) {
                log::warn!("{} has an unrecognized extension, relying on content detection", path.display());
            }
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read foreground {}", path.display()))?
        };

        if data.is_empty() {
            anyhow::bail!("No foreground data received from {}", input);
        }
        debug!(bytes = data.len(), "Foreground read");
        Ok::<_, anyhow::Error>(data)
    }
    .instrument(span)
    .await
}

async fn read_background(path: &Path) -> Result<Vec<u8>> {
    let span = spans::file_processing(&path.display().to_string(), "background");
    tokio::fs::read(path)
        .instrument(span)
        .await
        .with_context(|| format!("Failed to read background {}", path.display()))
}

/// Write the result and return a description of where it went
async fn write_output(cli: &Cli, result: &mut CompositeResult, jpeg_quality: u8) -> Result<String> {
    let format = result.output_format();

    match output_target(cli.input.as_str(), cli.output.as_deref(), format) {
        OutputTarget::Stdout => {
            let written = ImageIOService::save_to_writer(&result.image, tokio::io::stdout(), format, jpeg_quality)
                .await
                .context("Failed to write image data to stdout")?;
            info!("Wrote {} bytes of {} to stdout", written, format);
            Ok(String::from("stdout"))
        },
        OutputTarget::File(path) => {
            result
                .save(&path, jpeg_quality)
                .with_context(|| format!("Failed to save result to {}", path.display()))?;
            info!("Image saved to: {}", path.display());
            Ok(path.display().to_string())
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Explicit `-o` wins; stdin input defaults to stdout, files to `<stem>_composite.<ext>`
fn output_target(input: &str, output: Option<&str>, format: crate::OutputFormat) -> OutputTarget {
    match output {
        Some("-") => OutputTarget::Stdout,
        Some(path) => OutputTarget::File(PathBuf::from(path)),
        None if input == "-" => OutputTarget::Stdout,
        None => OutputTarget::File(generate_output_path(Path::new(input), format)),
    }
}

/// Generate output path next to the input with the format's extension
fn generate_output_path(input_path: &Path, format: crate::OutputFormat) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = input_path.parent().unwrap_or(Path::new("."));

    dir.join(format!(
        "{}_composite.{}",
        stem.to_string_lossy(),
        OutputFormatHandler::get_extension(format)
    ))
}

fn log_breakdown(result: &CompositeResult) {
    let metadata = &result.metadata;
    let timings = &metadata.timings;

    info!("Processing breakdown ({}):", metadata.segmenter);
    info!("  ├─ Decode: {}ms", timings.image_decode_ms);
    info!("  ├─ Segmentation: {}ms", timings.segmentation_ms);
    info!("  ├─ Refine: {}ms", timings.refine_ms);
    if metadata.background_mode != BackgroundMode::Cutout {
        info!("  ├─ Canvas: {}ms", timings.canvas_ms);
        info!("  ├─ Resize: {}ms", timings.resize_ms);
        info!("  ├─ Composite: {}ms", timings.composite_ms);
    }
    if let Some(encode_ms) = timings.image_encode_ms {
        info!("  ├─ Encode: {}ms", encode_ms);
    }
    info!("  └─ Total: {}ms", timings.total_ms);

    if let (Some(canvas), Some(placed), Some(offset)) = (metadata.canvas_size, metadata.placed_size, metadata.offset) {
        info!(
            "Placed {}x{} foreground at {} on {}x{} canvas ({})",
            placed.0, placed.1, offset, canvas.0, canvas.1, metadata.placement
        );
    }
    if let Some(seed) = metadata.seed {
        debug!(seed, "Placement seed");
    }
}
