//! CLI binary for layout-review.
//!
//! A thin shim over the library crate that maps subcommands to
//! [`ReviewService`] operations against a file-backed data directory and
//! prints their JSON payloads.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use layout_review::{
    CheckpointRequest, CorrectionRequest, LayoutSnapshot, ReviewConfig, ReviewError,
    ReviewService, SaveMarkdownRequest, SubmitRequest,
};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Load the layout model's output for a job
  layout-review import-layout invoice-42 layout.json

  # Show the anchored Markdown the reviewer edits
  layout-review markdown invoice-42

  # Correct the second block, then reject and correct again
  layout-review correct invoice-42 --block-id block_002 --text "Total: 42.00 EUR"
  layout-review submit invoice-42 --status rejected
  layout-review correct invoice-42 --index 1 --text "Total: 24.00 EUR"
  layout-review state invoice-42

STORAGE:
  Records live under --data-dir (default ./review-data), one JSON file per job
  and record kind: layouts/, markdown/, corrections/, checkpoints/, results/.

LOGGING:
  RUST_LOG overrides --verbose / --quiet, e.g. RUST_LOG=layout_review=debug.
"#;

/// Review machine-extracted document layouts.
#[derive(Parser, Debug)]
#[command(
    name = "layout-review",
    version,
    about = "Review machine-extracted document layouts: anchored Markdown, corrections, checkpoints, submission",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory holding the review records.
    #[arg(
        long,
        global = true,
        env = "LAYOUT_REVIEW_DATA_DIR",
        default_value = "./review-data"
    )]
    data_dir: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LAYOUT_REVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, global = true, env = "LAYOUT_REVIEW_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a layout snapshot (JSON file, or - for stdin) for a job.
    ImportLayout { job: String, file: PathBuf },

    /// Print the job's blocks with corrections applied.
    Layout { job: String },

    /// Print the job's Markdown (saved copy if any, else rendered).
    Markdown {
        job: String,
        /// Print the full view (anchors, source, savedAt) as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Save edited Markdown (file, or - for stdin).
    SaveMarkdown { job: String, file: PathBuf },

    /// Insert or replace the correction of one block.
    Correct(CorrectArgs),

    /// List the job's corrections ordered by block index.
    Corrections { job: String },

    /// Replace the job's checkpoint results (JSON file, or - for stdin).
    CheckpointSave { job: String, file: PathBuf },

    /// Print the job's checkpoint results.
    Checkpoint { job: String },

    /// Confirm or reject the job.
    Submit(SubmitArgs),

    /// Print the job's latest submission.
    #[command(name = "result")]
    FinalResult { job: String },

    /// Print the job's current review state.
    State { job: String },
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["index", "block_id"])))]
struct CorrectArgs {
    job: String,

    /// 0-based block index.
    #[arg(long)]
    index: Option<i64>,

    /// Block ID such as block_003.
    #[arg(long)]
    block_id: Option<String>,

    /// Corrected text.
    #[arg(long)]
    text: String,

    /// Text as originally detected.
    #[arg(long)]
    original: Option<String>,

    /// Corrected table as HTML.
    #[arg(long)]
    table_html: Option<String>,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    job: String,

    /// confirmed or rejected.
    #[arg(long)]
    status: String,

    /// Original document file name.
    #[arg(long)]
    filename: Option<String>,

    /// JSON file with the extracted data.
    #[arg(long)]
    data: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Validation errors are the caller's to fix: print the structured
            // body. Everything else is reported with its cause chain.
            if let Some(review) = err.chain().find_map(|e| e.downcast_ref::<ReviewError>()) {
                if review.is_validation() {
                    let body = serde_json::to_string_pretty(&review.to_body())
                        .unwrap_or_else(|_| review.to_string());
                    eprintln!("{body}");
                    return ExitCode::from(2);
                }
            }
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ReviewConfig::builder()
        .data_dir(cli.data_dir.clone())
        .build()
        .context("Invalid configuration")?;
    let service = ReviewService::new(config);

    match cli.command {
        Command::ImportLayout { job, file } => {
            let snapshot: LayoutSnapshot = read_json(&file)?;
            let regions = snapshot.regions.len();
            service.ingest_layout(&job, snapshot).await?;
            print_json(&serde_json::json!({ "jobId": job, "regions": regions }))?;
        }
        Command::Layout { job } => print_json(&service.layout(&job).await?)?,
        Command::Markdown { job, json } => {
            let view = service.markdown(&job).await?;
            if json {
                print_json(&view)?;
            } else {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(view.markdown.as_bytes())
                    .context("Failed to write to stdout")?;
                if !view.markdown.ends_with('\n') {
                    writeln!(stdout).context("Failed to write to stdout")?;
                }
            }
        }
        Command::SaveMarkdown { job, file } => {
            let markdown = read_input(&file)?;
            let request = SaveMarkdownRequest {
                markdown: Some(markdown),
            };
            print_json(&service.save_markdown(&job, request).await?)?;
        }
        Command::Correct(args) => {
            let request = CorrectionRequest {
                block_index: args.index,
                block_id: args.block_id,
                original_text: args.original,
                corrected_text: Some(args.text),
                table_html: args.table_html,
            };
            print_json(&service.upsert_correction(&args.job, request).await?)?;
        }
        Command::Corrections { job } => print_json(&service.corrections(&job).await?)?,
        Command::CheckpointSave { job, file } => {
            let request = checkpoint_request(read_json(&file)?)?;
            print_json(&service.save_checkpoints(&job, request).await?)?;
        }
        Command::Checkpoint { job } => print_json(&service.checkpoints(&job).await?)?,
        Command::Submit(args) => {
            let extracted_data = match &args.data {
                Some(path) => Some(read_json::<Value>(path)?),
                None => None,
            };
            let request = SubmitRequest {
                status: Some(args.status),
                extracted_data,
                checkpoint_results: None,
                corrections: None,
                filename: args.filename,
            };
            print_json(&service.submit(&args.job, request).await?)?;
        }
        Command::FinalResult { job } => print_json(&service.final_result(&job).await?)?,
        Command::State { job } => print_json(&service.state(&job).await?)?,
    }
    Ok(())
}

/// Accept either `{"results": [...]}` or a bare result array.
fn checkpoint_request(value: Value) -> Result<CheckpointRequest> {
    let value = match value {
        Value::Array(items) => serde_json::json!({ "results": items }),
        other => other,
    };
    serde_json::from_value(value).context("Checkpoint file is not a results list")
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}
