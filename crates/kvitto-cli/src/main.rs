//! kvitto CLI — rectify a receipt photo and write size-targeted
//! JPEG and PDF artifacts.

use std::path::{Path, PathBuf};

use clap::Parser;
use kvitto_export::{TargetConfig, process_receipt};
use kvitto_pipeline::{FallbackReason, PipelineConfig, Rectification};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "kvitto")]
#[command(about = "Auto-crop, flatten, and clean a receipt photo, then export JPEG and PDF")]
#[command(version)]
struct Cli {
    /// Path to the input photo (JPEG, PNG, BMP, TIFF).
    input: PathBuf,

    /// Path for the JPEG artifact. Defaults to `<input>_cleaned.jpg`.
    #[arg(long)]
    jpeg: Option<PathBuf>,

    /// Path for the PDF artifact. Defaults to `<input>.pdf`.
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Byte budget for each artifact, in kilobytes.
    #[arg(long, default_value = "200")]
    budget_kb: u32,

    /// Print run diagnostics as JSON to stderr.
    #[arg(long)]
    debug: bool,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let image_bytes = std::fs::read(&cli.input)
        .map_err(|e| -> CliError { format!("failed to read {}: {e}", cli.input.display()).into() })?;

    let pipeline = PipelineConfig::default();
    let target = TargetConfig {
        budget_kb: cli.budget_kb,
        ..TargetConfig::default()
    };

    let artifacts = process_receipt(&image_bytes, &pipeline, &target)?;

    match &artifacts.rectification {
        Rectification::Warped { .. } => {
            println!(
                "receipt detected, rectified to {}x{}",
                artifacts.final_dimensions.width, artifacts.final_dimensions.height,
            );
        }
        Rectification::Original { reason } => {
            println!("using original image: {}", describe_fallback(reason));
        }
    }

    if cli.debug {
        eprintln!("{}", serde_json::to_string_pretty(&artifacts.diagnostics)?);
    }

    let jpeg_path = cli
        .jpeg
        .unwrap_or_else(|| derived_path(&cli.input, "_cleaned.jpg"));
    let pdf_path = cli.pdf.unwrap_or_else(|| derived_path(&cli.input, ".pdf"));

    write_artifact(&jpeg_path, &artifacts.jpeg)?;
    write_artifact(&pdf_path, &artifacts.pdf)?;

    println!(
        "wrote {} ({:.1} KB) and {} ({:.1} KB)",
        jpeg_path.display(),
        kb(artifacts.jpeg.len()),
        pdf_path.display(),
        kb(artifacts.pdf.len()),
    );

    Ok(())
}

fn describe_fallback(reason: &FallbackReason) -> String {
    match reason {
        FallbackReason::NotFound => "no receipt boundary found".to_owned(),
        FallbackReason::TooSmall { area_ratio } => {
            format!("detected boundary too small ({:.1}% of frame)", area_ratio * 100.0)
        }
        FallbackReason::DegenerateWarp { width, height } => {
            format!("rectified image too small ({width}x{height})")
        }
    }
}

fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "receipt".into(), |s| s.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}{suffix}"))
}

fn write_artifact(path: &Path, bytes: &[u8]) -> CliResult<()> {
    std::fs::write(path, bytes)
        .map_err(|e| -> CliError { format!("failed to write {}: {e}", path.display()).into() })
}

#[allow(clippy::cast_precision_loss)]
fn kb(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}
