use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tablestitch::{
    DEFAULT_ALIGN_TOLERANCE, DEFAULT_EDGE_MARGIN, DEFAULT_HEADER_SIMILARITY,
    DEFAULT_LINE_TOLERANCE, DetectedBox, ExportReport, StitchOptions, detect_pdf_page,
    export_pdf_to_dir, export_pdf_to_xlsx,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdf2sheets",
    version,
    about = "Extract tables from PDFs, stitching tables split across pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Merge continued tables and write one sheet per logical table.
    Export(ExportArgs),
    /// Show detected tables and continuation decisions for one page.
    Detect(DetectArgs),
}

#[derive(Debug, Args)]
struct Thresholds {
    /// Maximum left/right edge difference for two fragments of one table.
    #[arg(long, default_value_t = DEFAULT_ALIGN_TOLERANCE)]
    align_tolerance: f64,

    /// Distance from the page edge that counts as touching it.
    #[arg(long, default_value_t = DEFAULT_EDGE_MARGIN)]
    edge_margin: f64,

    /// Similarity above which a leading row is treated as a repeated header.
    #[arg(long, default_value_t = DEFAULT_HEADER_SIMILARITY)]
    header_similarity: f64,

    /// Vertical distance under which words share a text line.
    #[arg(long, default_value_t = DEFAULT_LINE_TOLERANCE)]
    line_tolerance: f64,

    /// Minimum cells required per table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One workbook file with a worksheet per table.
    Xlsx,
    /// A directory with one CSV file per table.
    Csv,
}

impl OutputFormat {
    fn infer(output: &Path) -> Self {
        let is_xlsx = output
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("xlsx"));
        if is_xlsx { Self::Xlsx } else { Self::Csv }
    }
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output workbook (`.xlsx`) or directory for CSV sheets.
    #[arg(short, long)]
    output: PathBuf,

    /// Output format; inferred from the output path when omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Delimiter for CSV output.
    #[arg(long, default_value = ",")]
    delimiter: char,

    #[command(flatten)]
    thresholds: Thresholds,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct DetectArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// 1-based page number.
    #[arg(short, long)]
    page: u32,

    /// Print JSON instead of one line per table.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    thresholds: Thresholds,
}

fn parse_options(thresholds: &Thresholds, delimiter: char) -> Result<StitchOptions> {
    if !delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let options = StitchOptions {
        align_tolerance: thresholds.align_tolerance,
        edge_margin: thresholds.edge_margin,
        header_similarity: thresholds.header_similarity,
        line_tolerance: thresholds.line_tolerance,
        min_cols: thresholds.min_cols,
        delimiter: delimiter as u8,
    };
    options.validate()?;
    Ok(options)
}

fn log_report(report: &ExportReport, verbose: bool) {
    eprintln!(
        "{} table(s) in {} chain(s); wrote {} sheet(s), {} row(s)",
        report.table_count, report.chain_count, report.sheet_count, report.row_count
    );
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} region={:?}: {}",
                warning.code, warning.region, warning.message
            );
        }
    }
}

fn run_export(args: &ExportArgs) -> Result<ExportReport> {
    let options = parse_options(&args.thresholds, args.delimiter)?;
    let format = args
        .format
        .unwrap_or_else(|| OutputFormat::infer(&args.output));
    let report = match format {
        OutputFormat::Xlsx => export_pdf_to_xlsx(&args.input, &args.output, &options),
        OutputFormat::Csv => export_pdf_to_dir(&args.input, &args.output, &options),
    };
    report.with_context(|| format!("failed to export tables from '{}'", args.input.display()))
}

fn print_boxes(page: u32, boxes: &[DetectedBox], as_json: bool) -> Result<()> {
    if as_json {
        let records = boxes
            .iter()
            .map(|detected| {
                json!({
                    "x0": detected.x0,
                    "y0": detected.y0,
                    "x1": detected.x1,
                    "y1": detected.y1,
                    "page_width": detected.page_width,
                    "page_height": detected.page_height,
                    "header_label": detected.header_label,
                    "is_continuation": detected.is_continuation,
                    "continued_from": detected.continued_from.map(|key| json!({
                        "page": key.page + 1,
                        "table_index": key.index,
                    })),
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for (index, detected) in boxes.iter().enumerate() {
        let continued = detected.continued_from.map_or_else(
            || "-".to_string(),
            |key| format!("page {} table {}", key.page + 1, key.index + 1),
        );
        println!(
            "page {page} table {}: ({:.1}, {:.1}, {:.1}, {:.1}) label={:?} continues={continued}",
            index + 1,
            detected.x0,
            detected.y0,
            detected.x1,
            detected.y1,
            detected.header_label,
        );
    }
    Ok(())
}

fn run_detect(args: &DetectArgs) -> Result<()> {
    let options = parse_options(&args.thresholds, ',')?;
    let boxes = detect_pdf_page(&args.input, args.page, &options).with_context(|| {
        format!(
            "failed to detect tables on page {} of '{}'",
            args.page,
            args.input.display()
        )
    })?;
    print_boxes(args.page, &boxes, args.json)
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tablestitch=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Export(args) => match run_export(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.sheet_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Detect(args) => match run_detect(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
