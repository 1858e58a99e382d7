//! vmrk CLI - Command-line interface for VMRK summaries
//!
//! Commands:
//! - summarize: Summarize marker files into one table (batch mode)
//! - inspect: Show how a marker file is segmented into blocks
//! - config: Print the effective analysis configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vmrk_summary::segmenter::SegmentReport;
use vmrk_summary::{
    session_id, AnalysisConfig, OutputFormat, Summary, SummaryEncoder, TrialFilter, VmrkError,
    VmrkProcessor, VMRK_VERSION,
};

/// vmrk - Behavioral summary statistics from flanker-task marker logs
#[derive(Parser)]
#[command(name = "vmrk")]
#[command(version = VMRK_VERSION)]
#[command(about = "Summarize VMRK marker files", long_about = None)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct AnalysisArgs {
    /// Load analysis configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower response time bound in ms (outliers below are dropped)
    #[arg(long)]
    low: Option<f64>,

    /// Upper response time bound in ms (outliers above are dropped)
    #[arg(long)]
    high: Option<f64>,

    /// Delta degrees of freedom for standard deviations
    #[arg(long)]
    ddof: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize marker files into one row per file (batch mode)
    Summarize {
        /// VMRK marker files
        files: Vec<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: Format,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Show the block segmentation of one marker file
    Inspect {
        /// VMRK marker file
        file: PathBuf,

        /// Output report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Print the effective analysis configuration as JSON
    Config {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Clone, ValueEnum)]
enum Format {
    /// Comma-separated table with a header row
    Csv,
    /// Newline-delimited JSON (one record per file)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Ndjson => OutputFormat::Ndjson,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .target(env_logger::Target::Stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), VmrkCliError> {
    match command {
        Commands::Summarize {
            files,
            output,
            format,
            analysis,
        } => cmd_summarize(&files, &output, format.into(), &analysis),

        Commands::Inspect {
            file,
            json,
            analysis,
        } => cmd_inspect(&file, json, &analysis),

        Commands::Config { analysis } => {
            let config = load_config(&analysis)?;
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

fn load_config(args: &AnalysisArgs) -> Result<AnalysisConfig, VmrkCliError> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };

    if let Some(low) = args.low {
        config.low_ms = low;
    }
    if let Some(high) = args.high {
        config.high_ms = high;
    }
    if let Some(ddof) = args.ddof {
        config.ddof = ddof;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_summarize(
    files: &[PathBuf],
    output: &Path,
    format: OutputFormat,
    analysis: &AnalysisArgs,
) -> Result<(), VmrkCliError> {
    if files.is_empty() {
        println!("no files");
        return Ok(());
    }

    let processor = VmrkProcessor::new(load_config(analysis)?)?;

    let mut summaries: Vec<Summary> = Vec::new();
    for (name, result) in processor.process_files(files) {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => log::error!("Skipping {}: {}", name, e),
        }
    }

    if summaries.is_empty() {
        return Err(VmrkCliError::AllFilesFailed(files.len()));
    }

    let output_data = SummaryEncoder::new().encode(&summaries, format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_inspect(file: &Path, json: bool, analysis: &AnalysisArgs) -> Result<(), VmrkCliError> {
    let processor = VmrkProcessor::new(load_config(analysis)?)?;
    let segmentation = processor.segment_str(&fs::read_to_string(file)?)?;

    let correct = TrialFilter::new().correct(true);
    let blocks = segmentation
        .dataset
        .blocks()
        .iter()
        .enumerate()
        .map(|(i, block)| BlockSummary {
            index: i + 1,
            trials: block.len(),
            correct: block.query(&correct).len(),
            extra_responses: block
                .records()
                .iter()
                .filter(|r| r.has_extra_responses())
                .count(),
        })
        .collect();

    let report = InspectReport {
        sid: session_id(file),
        blocks,
        trailing_trials: segmentation.trailing.len(),
        markers: segmentation.report,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Segmentation Report: {}", report.sid);
        println!("====================");
        println!("Skipped rows:         {}", report.markers.skipped_rows);
        println!("Stimulus markers:     {}", report.markers.stimulus_markers);
        println!("Practice markers:     {}", report.markers.practice_markers);
        println!("Comment markers:      {}", report.markers.comment_markers);
        println!("Unrecognized markers: {}", report.markers.unrecognized_markers);
        println!("Trials assembled:     {}", report.markers.trials_assembled);
        println!("Windows dropped:      {}", report.markers.windows_dropped);
        println!("Outliers removed:     {}", report.markers.outliers_removed);
        println!("\nBlocks:");
        for block in &report.blocks {
            println!(
                "  {:>3}: {} trials, {} correct, {} with extra responses",
                block.index, block.trials, block.correct, block.extra_responses
            );
        }
        if report.trailing_trials > 0 {
            println!(
                "\n{} trials after the last block boundary are not scored",
                report.trailing_trials
            );
        }
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum VmrkCliError {
    Io(io::Error),
    Compute(VmrkError),
    Json(serde_json::Error),
    AllFilesFailed(usize),
}

impl From<io::Error> for VmrkCliError {
    fn from(e: io::Error) -> Self {
        VmrkCliError::Io(e)
    }
}

impl From<VmrkError> for VmrkCliError {
    fn from(e: VmrkError) -> Self {
        VmrkCliError::Compute(e)
    }
}

impl From<serde_json::Error> for VmrkCliError {
    fn from(e: serde_json::Error) -> Self {
        VmrkCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VmrkCliError> for CliError {
    fn from(e: VmrkCliError) -> Self {
        match e {
            VmrkCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VmrkCliError::Compute(e) => {
                let (code, hint) = match &e {
                    VmrkError::InvalidStimulusCode { .. } | VmrkError::InvalidTimestamp { .. } => {
                        ("PARSE_ERROR", "Ensure input is a BrainVision marker file")
                    }
                    VmrkError::EmptySample(_) | VmrkError::UndefinedRatio(_) => (
                        "UNDEFINED_STATISTIC",
                        "The session has too few trials in some condition",
                    ),
                    VmrkError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'vmrk config' to see the defaults")
                    }
                    VmrkError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    VmrkError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            VmrkCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VmrkCliError::AllFilesFailed(count) => CliError {
                code: "ALL_FILES_FAILED".to_string(),
                message: format!("None of the {} input files could be summarized", count),
                hint: Some("See the per-file errors logged above".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    sid: String,
    blocks: Vec<BlockSummary>,
    trailing_trials: usize,
    markers: SegmentReport,
}

#[derive(serde::Serialize)]
struct BlockSummary {
    index: usize,
    trials: usize,
    correct: usize,
    extra_responses: usize,
}
