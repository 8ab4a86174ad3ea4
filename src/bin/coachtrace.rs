//! Coachtrace CLI - Command-line interface for the coaching derivation core
//!
//! Commands:
//! - kpi: Print the headline KPI tiles for a bundle
//! - series: Build the daily series for one metric
//! - decisions: Print the unified decision timeline
//! - ask: Answer a free-text question against a bundle
//! - validate: Validate a bundle and its chat transcript
//! - demo: Emit the embedded demo bundle

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use coachtrace::assistant;
use coachtrace::decisions::{build_decisions, filter_decisions};
use coachtrace::demo::demo_dataset;
use coachtrace::kpi::kpi_snapshot;
use coachtrace::score::segment;
use coachtrace::series::build_series;
use coachtrace::{CoreError, MetricId, Snapshot, COACHTRACE_VERSION, PRODUCER_NAME};

/// Coachtrace - Derive dashboard views from a member coaching bundle
#[derive(Parser)]
#[command(name = "coachtrace")]
#[command(version = COACHTRACE_VERSION)]
#[command(about = "Derive series, scores and timelines from a coaching bundle", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the headline KPI tiles for a bundle
    Kpi {
        /// Bundle JSON path (use - for stdin; omit for the embedded demo)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Build the daily series for one metric
    Series {
        /// Metric wire name (e.g. HRV_ms, LDL_C, HRV_7d)
        metric: String,

        /// Bundle JSON path (use - for stdin; omit for the embedded demo)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Split each point by the metric's target range for coloring
        #[arg(long)]
        segmented: bool,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Print the unified decision timeline
    Decisions {
        /// Bundle JSON path (use - for stdin; omit for the embedded demo)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Free-text filter over label, kind, owner and date
        #[arg(short, long, default_value = "")]
        query: String,

        /// Restrict to these owners (repeatable)
        #[arg(long)]
        owner: Vec<String>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Answer a free-text question against a bundle
    Ask {
        /// The question (read from stdin when omitted and piped)
        question: Option<String>,

        /// Bundle JSON path (omit for the embedded demo)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Validate a bundle and its chat transcript
    Validate {
        /// Bundle JSON path (use - for stdin; omit for the embedded demo)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Emit the embedded demo bundle
    Demo {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
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

fn run(cli: Cli) -> Result<(), CoachCliError> {
    match cli.command {
        Commands::Kpi {
            input,
            output_format,
        } => cmd_kpi(input.as_deref(), output_format),

        Commands::Series {
            metric,
            input,
            segmented,
            output_format,
        } => cmd_series(&metric, input.as_deref(), segmented, output_format),

        Commands::Decisions {
            input,
            query,
            owner,
            output_format,
        } => cmd_decisions(input.as_deref(), &query, &owner, output_format),

        Commands::Ask { question, input } => cmd_ask(question.as_deref(), input.as_deref()),

        Commands::Validate { input, json } => cmd_validate(input.as_deref(), json),

        Commands::Demo { output } => cmd_demo(&output),
    }
}

fn load_snapshot(input: Option<&Path>) -> Result<Snapshot, CoachCliError> {
    let Some(path) = input else {
        return Ok(Snapshot::new(demo_dataset()?));
    };
    let data = if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)?
    };
    Ok(Snapshot::from_json(&data)?)
}

fn cmd_kpi(input: Option<&Path>, output_format: OutputFormat) -> Result<(), CoachCliError> {
    let snapshot = load_snapshot(input)?;
    let tiles = kpi_snapshot(&snapshot.dataset);
    print!("{}", format_output(&tiles, &output_format)?);
    Ok(())
}

fn cmd_series(
    metric: &str,
    input: Option<&Path>,
    segmented: bool,
    output_format: OutputFormat,
) -> Result<(), CoachCliError> {
    let metric = MetricId::from_str(metric)?;
    let snapshot = load_snapshot(input)?;
    let ds = &snapshot.dataset;
    let series = build_series(metric, &ds.wearable_daily, &ds.diagnostics);

    if segmented {
        let (lo, hi) = metric.band(ds.member.gender);
        let points = segment(&series, lo, hi, metric.direction());
        print!("{}", format_output(&points, &output_format)?);
    } else {
        print!("{}", format_output(&series, &output_format)?);
    }
    Ok(())
}

fn cmd_decisions(
    input: Option<&Path>,
    query: &str,
    owners: &[String],
    output_format: OutputFormat,
) -> Result<(), CoachCliError> {
    let snapshot = load_snapshot(input)?;
    let ds = &snapshot.dataset;
    let decisions = build_decisions(&ds.interventions, &ds.diagnostics);
    let filtered = filter_decisions(&decisions, query, owners);
    print!("{}", format_output(&filtered, &output_format)?);
    Ok(())
}

fn cmd_ask(question: Option<&str>, input: Option<&Path>) -> Result<(), CoachCliError> {
    let question = match question {
        Some(q) => q.to_string(),
        // With piped stdin the question can arrive on it.
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CoachCliError::MissingQuestion),
    };

    let snapshot = load_snapshot(input)?;
    let reply = assistant::answer(question.trim(), &snapshot);
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn cmd_validate(input: Option<&Path>, json: bool) -> Result<(), CoachCliError> {
    let snapshot = load_snapshot(input)?;
    let ds = &snapshot.dataset;

    let report = ValidationReport {
        producer: PRODUCER_NAME.to_string(),
        version: COACHTRACE_VERSION.to_string(),
        member_id: ds.member.member_id.clone(),
        wearable_days: ds.wearable_daily.len(),
        diagnostics: ds.diagnostics.len(),
        interventions: ds.interventions.len(),
        rationales: ds.rationales.len(),
        chat_messages: snapshot.chat.messages.len(),
        chat_skipped_lines: snapshot.chat_skipped_lines.clone(),
        rationale_skipped_lines: snapshot.rationale_skipped_lines.clone(),
        chat_rejected: snapshot
            .chat
            .rejected
            .iter()
            .map(|r| RejectedDetail {
                index: r.index,
                reason: r.reason.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Bundle Report");
        println!("=============");
        println!("Member:        {}", report.member_id);
        println!("Wearable days: {}", report.wearable_days);
        println!("Diagnostics:   {}", report.diagnostics);
        println!("Interventions: {}", report.interventions);
        println!("Rationales:    {}", report.rationales);
        println!("Chat messages: {}", report.chat_messages);
        println!("Chat rejected: {}", report.chat_rejected.len());

        if !report.chat_skipped_lines.is_empty() || !report.rationale_skipped_lines.is_empty() {
            println!(
                "JSONL skipped: chat {:?}, rationales {:?}",
                report.chat_skipped_lines, report.rationale_skipped_lines
            );
        }

        if !report.chat_rejected.is_empty() {
            println!("\nRejected chat records:");
            for r in &report.chat_rejected {
                println!("  - record {}: {}", r.index, r.reason);
            }
        }
    }

    if report.chat_rejected.is_empty() {
        Ok(())
    } else {
        Err(CoachCliError::ValidationFailed(report.chat_rejected.len()))
    }
}

fn cmd_demo(output: &Path) -> Result<(), CoachCliError> {
    let dataset = demo_dataset()?;
    let json = serde_json::to_string_pretty(&dataset)?;

    if output.to_string_lossy() == "-" {
        println!("{}", json);
    } else {
        fs::write(output, json)?;
    }
    Ok(())
}

// Helper functions

fn format_output<T: serde::Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, CoachCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

// Error types

#[derive(Debug)]
enum CoachCliError {
    Io(io::Error),
    Core(CoreError),
    Json(serde_json::Error),
    MissingQuestion,
    ValidationFailed(usize),
}

impl From<io::Error> for CoachCliError {
    fn from(e: io::Error) -> Self {
        CoachCliError::Io(e)
    }
}

impl From<CoreError> for CoachCliError {
    fn from(e: CoreError) -> Self {
        CoachCliError::Core(e)
    }
}

impl From<serde_json::Error> for CoachCliError {
    fn from(e: serde_json::Error) -> Self {
        CoachCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CoachCliError> for CliError {
    fn from(e: CoachCliError) -> Self {
        match e {
            CoachCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CoachCliError::Core(e) => CliError {
                code: "BUNDLE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the bundle against the demo output".to_string()),
            },
            CoachCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CoachCliError::MissingQuestion => CliError {
                code: "MISSING_QUESTION".to_string(),
                message: "No question given".to_string(),
                hint: Some("Pass a question argument or pipe one on stdin".to_string()),
            },
            CoachCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} chat records failed normalization", count),
                hint: Some("Fix the rejected records and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    producer: String,
    version: String,
    member_id: String,
    wearable_days: usize,
    diagnostics: usize,
    interventions: usize,
    rationales: usize,
    chat_messages: usize,
    chat_skipped_lines: Vec<usize>,
    rationale_skipped_lines: Vec<usize>,
    chat_rejected: Vec<RejectedDetail>,
}

#[derive(serde::Serialize)]
struct RejectedDetail {
    index: usize,
    reason: String,
}
