//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lexforge_collection::SourceFormat;
use lexforge_core::pipeline::PipelineConfig;
use lexforge_core::run::{ProgressReporter, RunConfig, RunSummary};
use lexforge_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LexForge — curate raw text into training-ready corpora.
#[derive(Parser)]
#[command(
    name = "lexforge",
    version,
    about = "Clean, score, filter, and deduplicate text corpora for model training.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process an input file into a cleaned, deduplicated corpus.
    Process {
        /// Input file (JSONL or CSV).
        #[arg(short, long)]
        input: String,

        /// Input format: jsonl or csv.
        #[arg(short, long, default_value = "jsonl")]
        format: String,

        /// Source name recorded on every document (defaults to the input
        /// file stem).
        #[arg(long)]
        source: Option<String>,

        /// Output root directory (defaults to the configured output dir).
        #[arg(short, long)]
        out: Option<String>,

        /// Sub-batch size for batch-scoped stages.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Process at most this many documents.
        #[arg(long)]
        limit: Option<usize>,

        /// Run per-document stages on a worker pool.
        #[arg(long)]
        parallel: bool,

        /// Pipeline configuration file (TOML). Defaults to the standard
        /// legal-corpus pipeline.
        #[arg(long)]
        pipeline: Option<String>,
    },

    /// Process a small sample and print a readable digest per document.
    Sample {
        /// Input file (JSONL or CSV).
        #[arg(short, long)]
        input: String,

        /// Input format: jsonl or csv.
        #[arg(short, long, default_value = "jsonl")]
        format: String,

        /// Number of documents to sample.
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Pipeline configuration file (TOML).
        #[arg(long)]
        pipeline: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process {
            input,
            format,
            source,
            out,
            batch_size,
            limit,
            parallel,
            pipeline,
        } => cmd_process(
            &input,
            &format,
            source.as_deref(),
            out.as_deref(),
            batch_size,
            limit,
            parallel,
            pipeline.as_deref(),
        ),
        Command::Sample {
            input,
            format,
            count,
            pipeline,
        } => cmd_sample(&input, &format, count, pipeline.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Load a pipeline config from a TOML file, or the default lineup.
fn load_pipeline_config(path: Option<&str>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| eyre!("cannot read pipeline config '{path}': {e}"))?;
            toml::from_str(&content)
                .map_err(|e| eyre!("invalid pipeline config '{path}': {e}"))
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Derive a source name from an explicit flag or the input file stem.
fn source_name(input: &str, explicit: Option<&str>) -> String {
    explicit.map(String::from).unwrap_or_else(|| {
        PathBuf::from(input)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string())
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_process(
    input: &str,
    format: &str,
    source: Option<&str>,
    out: Option<&str>,
    batch_size: Option<usize>,
    limit: Option<usize>,
    parallel: bool,
    pipeline_path: Option<&str>,
) -> Result<()> {
    let app_config = load_config()?;
    let format: SourceFormat = format.parse()?;

    let mut pipeline = load_pipeline_config(pipeline_path)?;
    if parallel {
        pipeline.parallel = true;
    }

    let output_root = match out {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(&app_config.defaults.output_dir),
    };

    let run_config = RunConfig {
        input: PathBuf::from(input),
        format,
        source_name: source_name(input, source),
        output_root,
        batch_size: batch_size.unwrap_or(app_config.processing.batch_size),
        limit,
        pipeline,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        input,
        source = %run_config.source_name,
        batch_size = run_config.batch_size,
        "processing corpus"
    );

    let reporter = CliProgress::new();
    let summary = lexforge_core::run::run(&run_config, &reporter)?;

    // Print summary
    println!();
    println!("  Corpus written successfully!");
    println!("  Run ID:      {}", summary.run_id);
    println!("  Collected:   {}", summary.counts.collected);
    println!("  Kept:        {}", summary.counts.kept);
    println!("  Flagged:     {}", summary.counts.flagged);
    println!("  Duplicates:  {}", summary.counts.duplicates_removed);
    println!("  Dropped:     {}", summary.counts.dropped);
    println!("  Failed:      {}", summary.counts.failed);
    println!("  Output:      {}", summary.corpus_path.display());
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_sample(input: &str, format: &str, count: usize, pipeline_path: Option<&str>) -> Result<()> {
    let format: SourceFormat = format.parse()?;
    let pipeline_config = load_pipeline_config(pipeline_path)?;
    let pipeline = pipeline_config.build()?;

    let source = lexforge_collection::open_source(format, input, source_name(input, None));
    let documents = source.collect(Some(count))?;

    if documents.is_empty() {
        return Err(eyre!("no documents collected from '{input}'"));
    }

    info!(count = documents.len(), "processing sample");

    for doc in documents {
        let id = doc.id.clone();
        match pipeline.process_document(doc) {
            Ok(Some(record)) => {
                let preview: String = record.text.chars().take(120).collect();
                println!("── {id}");
                println!("   text:     {preview}");
                println!(
                    "   tokens:   {}",
                    record
                        .token_count
                        .map_or("n/a".to_string(), |n| n.to_string())
                );
                println!(
                    "   quality:  {}",
                    record
                        .quality_score
                        .map_or("n/a".to_string(), |q| format!("{q:.3}"))
                );
                println!(
                    "   filtered: {}",
                    if record.is_filtered() { "yes" } else { "no" }
                );
                println!("   history:  {}", record.processing_history.join(" → "));
            }
            Ok(None) => println!("── {id}: dropped by filter"),
            Err(e) => println!("── {id}: failed ({e})"),
        }
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn batch_processed(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing batch [{current}/{total}]"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
