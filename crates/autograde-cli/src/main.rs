//! Autograde - LLM-graded evaluation of project submissions
//!
//! The `autograde` command grades a parsed submission against the criteria of
//! a TOML configuration file.
//!
//! ## Commands
//!
//! - `grade`: Grade a submission and write the result and cost report
//! - `fingerprint`: Print the content fingerprint of a file
//! - `check-config`: Validate a configuration file and list its criteria
//! - `cache show`: Describe a cached parse result

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use autograde_core::{
    get_or_parse, render_grading_summary_md, write_grading_result_json, write_usage_summary_json,
    AnthropicClient, CacheError, DocumentCache, Fingerprint, FsDocumentCache, Grader,
    GradingConfig, GradingRequest, ParsedDocument,
};

#[derive(Parser)]
#[command(name = "autograde")]
#[command(author = "Autograde Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluation orchestration and adaptive scoring for project submissions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission against the configured criteria
    Grade {
        /// Grading configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Submission file; its content fingerprint is the cache key
        #[arg(short, long)]
        submission: PathBuf,

        /// Parsed document (JSON) to use when the submission is not cached yet
        #[arg(long)]
        parsed: Option<PathBuf>,

        /// The student's self-assessed grade (0-100)
        #[arg(long)]
        self_grade: i32,

        /// Submission identifier (default: submission file stem)
        #[arg(long)]
        submission_id: Option<String>,

        /// Write the grading result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the cost report as JSON
        #[arg(long)]
        cost_report: Option<PathBuf>,

        /// Anthropic API key
        #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Print the content fingerprint of a file
    Fingerprint {
        /// File to fingerprint
        file: PathBuf,
    },

    /// Validate a configuration file and list its criteria
    CheckConfig {
        /// Grading configuration (TOML)
        config: PathBuf,
    },

    /// Inspect the document cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Describe the cached parse of a fingerprint
    Show {
        /// Fingerprint (64 hex chars)
        fingerprint: String,

        /// Grading configuration (TOML) naming the cache directory
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    autograde_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Grade {
            config,
            submission,
            parsed,
            self_grade,
            submission_id,
            output,
            cost_report,
            api_key,
        } => {
            cmd_grade(GradeArgs {
                config,
                submission,
                parsed,
                self_grade,
                submission_id,
                output,
                cost_report,
                api_key,
            })
            .await
        }
        Commands::Fingerprint { file } => cmd_fingerprint(&file),
        Commands::CheckConfig { config } => cmd_check_config(&config),
        Commands::Cache { action } => match action {
            CacheAction::Show {
                fingerprint,
                config,
            } => cmd_cache_show(&fingerprint, &config),
        },
    }
}

struct GradeArgs {
    config: PathBuf,
    submission: PathBuf,
    parsed: Option<PathBuf>,
    self_grade: i32,
    submission_id: Option<String>,
    output: Option<PathBuf>,
    cost_report: Option<PathBuf>,
    api_key: Option<String>,
}

fn load_config(path: &Path) -> Result<GradingConfig> {
    GradingConfig::load(path).with_context(|| format!("Failed to load config: {:?}", path))
}

/// Read the upstream parser's JSON output.
fn read_parsed_document(path: Option<&Path>) -> autograde_core::cache::Result<ParsedDocument> {
    let Some(path) = path else {
        return Err(CacheError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "submission is not cached; pass --parsed with the parsed document",
        )));
    };
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load the submission's parsed document through the cache.
fn load_document(config: &GradingConfig, submission: &Path, parsed: Option<&Path>) -> Result<ParsedDocument> {
    let fingerprint = Fingerprint::of_file(submission)
        .with_context(|| format!("Failed to read submission: {:?}", submission))?;
    let cache = FsDocumentCache::new(&config.cache_dir)
        .with_context(|| format!("Failed to open cache: {:?}", config.cache_dir))?;

    let lookup = get_or_parse(&cache, &fingerprint, || read_parsed_document(parsed))
        .context("Failed to load parsed document")?;
    info!(fingerprint = %fingerprint, cache_hit = lookup.hit, "document loaded");
    Ok(lookup.document)
}

async fn cmd_grade(args: GradeArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let document = load_document(&config, &args.submission, args.parsed.as_deref())?;

    let Some(api_key) = args.api_key else {
        bail!("No API key: pass --api-key or set ANTHROPIC_API_KEY");
    };
    let judge = AnthropicClient::new(api_key, config.judge.clone()).context("Failed to build judge client")?;

    let budget = config.budget_policy();
    let grader = Grader::new(config, Arc::new(judge)).context("Invalid grading configuration")?;

    let submission_id = args.submission_id.unwrap_or_else(|| {
        args.submission
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "submission".to_string())
    });

    let result = grader
        .grade(GradingRequest {
            submission_id,
            document: Arc::new(document),
            self_assessment: args.self_grade,
        })
        .await;

    println!("{}", render_grading_summary_md(&result));

    if let Some(path) = &args.output {
        write_grading_result_json(path, &result)?;
        println!("Grading result written to {:?}", path);
    }
    if let Some(path) = &args.cost_report {
        let usage = result.usage.clone().unwrap_or_default();
        write_usage_summary_json(path, &usage, &budget)?;
        println!("Cost report written to {:?}", path);
    }

    Ok(())
}

fn cmd_fingerprint(file: &Path) -> Result<()> {
    let fingerprint =
        Fingerprint::of_file(file).with_context(|| format!("Failed to read file: {:?}", file))?;
    println!("{}", fingerprint);
    Ok(())
}

fn cmd_check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let criteria = config.criterion_set()?;

    println!("Configuration OK: {:?}", path);
    println!(
        "  batch: max_concurrency={} timeout={}s",
        config.batch.max_concurrency, config.batch.timeout_secs
    );
    println!(
        "  retry: max_attempts={} base_delay={}ms max_delay={}ms",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
    );
    println!("  judge: {}", config.judge.model);
    match config.cost.budget_limit_usd {
        Some(limit) => println!("  budget: ${:.2} (warn at {:.0}%)", limit, config.cost.warn_threshold * 100.0),
        None => println!("  budget: unlimited"),
    }

    println!("\nCriteria ({}):", criteria.len());
    for criterion in criteria.iter() {
        println!(
            "  {:<24} {:>5.2}  {:<24} {}",
            criterion.id, criterion.weight, criterion.category, criterion.name
        );
    }

    let total = criteria.total_weight();
    println!("\nTotal weight: {:.2}", total);
    if !criteria.is_empty() && (total - 1.0).abs() > 1e-6 {
        println!("  note: weights are renormalized over evaluated criteria");
    }
    Ok(())
}

fn cmd_cache_show(fingerprint: &str, config_path: &Path) -> Result<()> {
    let fingerprint: Fingerprint = fingerprint
        .parse()
        .with_context(|| format!("Invalid fingerprint: {}", fingerprint))?;
    let config = load_config(config_path)?;
    let cache = FsDocumentCache::new(&config.cache_dir)
        .with_context(|| format!("Failed to open cache: {:?}", config.cache_dir))?;

    let Some(document) = cache.get(&fingerprint)? else {
        bail!("No cached document for {}", fingerprint);
    };

    println!("Fingerprint: {}", fingerprint);
    println!("Pages:       {}", document.total_pages);
    println!("Characters:  {}", document.full_text.chars().count());
    println!("Sections:    {}", document.sections.len());
    for section in &document.sections {
        println!("  p.{:<4} {}", section.page, section.title);
    }
    println!("Code blocks: {}", document.code_blocks.len());
    Ok(())
}
