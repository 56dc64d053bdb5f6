//! worklens - weekly work-log classifier and effort rollups
//!
//! Reads work-log CSV exports, classifies every entry by the nature of
//! the work, and writes per-record listings, nested rollup tables and a
//! summary report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input, undecodable file, bad config, etc.)

mod analysis;
mod classifier;
mod cli;
mod config;
mod loader;
mod models;
mod report;

use analysis::Rollup;
use anyhow::{Context, Result};
use chrono::Utc;
use classifier::Classifier;
use cli::Args;
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ClassifiedRecord, WorkRecord};
use report::table::{flatten, format_days, forward_fill, render_full, render_sparse, write_csv};
use report::{AnalysisReport, ReportMetadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Tolerance for rollup reconciliation checks.
const RECONCILE_TOLERANCE: f64 = 1e-6;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("worklens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .worklens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize columns, department aliases, keyword sets, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete pipeline.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let input = args
        .input
        .clone()
        .context("An --input file or directory is required")?;

    // Step 1: Load and normalize
    println!("📥 Loading work logs: {}", input.display());
    let loaded = loader::load_records(&input, &config.columns)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let records = analysis::normalize_departments(&loaded, &config.departments.aliases);
    info!("Loaded {} records", records.len());

    if args.dry_run {
        return handle_dry_run(&records, &config);
    }

    // Step 2: Classify
    println!("🔬 Classifying {} entries...", records.len());
    let classifier = Classifier::from_config(&config);
    debug!(
        "Using keyword sets version {}",
        classifier.lexicon().version()
    );
    let classified = classify_all(&classifier, &records, !args.quiet);

    // Step 3: Aggregate
    let policy = config.aggregation.missing_days;
    let mut rollup = analysis::aggregate(&classified, &config.aggregation.group_by, policy);
    rollup.sort(&config.aggregation.order);
    if !rollup.is_reconciled(RECONCILE_TOLERANCE) {
        warn!("Rollup totals do not reconcile across levels");
    }

    // Step 4: Write outputs
    println!("\n📝 Writing outputs...");
    let output_dir = PathBuf::from(&config.general.output_dir);
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            output_dir.display()
        )
    })?;

    write_file(
        &output_dir.join("records.json"),
        &report::generate_records_json(&classified)?,
    )?;
    write_rollup_tables(&rollup, &output_dir)?;

    let metadata = ReportMetadata {
        input: input.display().to_string(),
        generated_at: Utc::now(),
        keywords_version: classifier.lexicon().version(),
        group_by: config.aggregation.group_by.clone(),
        missing_days: policy,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let analysis_report = AnalysisReport::build(&classified, rollup, &config, metadata);

    let report_path = output_dir.join(args.format.report_file());
    let output = match args.format {
        cli::OutputFormat::Json => report::generate_json_report(&analysis_report)?,
        cli::OutputFormat::Markdown => report::generate_markdown_report(&analysis_report),
    };
    write_file(&report_path, &output)?;

    print_summary(&analysis_report, start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Analysis complete! Outputs saved to: {}",
        output_dir.display()
    );

    Ok(())
}

/// Classify every record, with a progress bar unless quiet.
fn classify_all(
    classifier: &Classifier,
    records: &[WorkRecord],
    show_progress: bool,
) -> Vec<ClassifiedRecord> {
    let progress_bar = if show_progress {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let classified = records
        .iter()
        .map(|record| {
            let result = classifier.classify_record(record);
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
            result
        })
        .collect();

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Classification complete");
    }

    classified
}

/// Write the full and sparse rollup tables.
fn write_rollup_tables(rollup: &Rollup, output_dir: &Path) -> Result<()> {
    let rows = flatten(rollup);
    let dimensions = &rollup.dimensions;

    let full = render_full(dimensions, &rows);
    let sparse = render_sparse(dimensions, &rows, dimensions.len().saturating_sub(1));
    if forward_fill(&sparse) != full {
        warn!("Sparse rollup table does not expand back to the full table");
    }

    write_csv(&full, &output_dir.join("rollup_full.csv"))?;
    write_csv(&sparse, &output_dir.join("rollup_sparse.csv"))?;

    debug!("Wrote {} rollup rows", rows.len());
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Print the console summary.
fn print_summary(summary: &AnalysisReport, duration: f64) {
    let headline = &summary.headline;

    println!("\n📊 Analysis Summary:");
    println!(
        "   Entries: {} | People: {} | Projects: {} | Departments: {}",
        headline.record_count,
        headline.people_count,
        headline.project_count,
        headline.department_count
    );
    println!(
        "   Days: {} total | {} core | {} tuning",
        format_days(headline.totals.all),
        format_days(headline.totals.core),
        format_days(headline.totals.excluded)
    );
    if headline.totals.dayless_count > 0 {
        println!(
            "   Entries without days: {}",
            headline.totals.dayless_count
        );
    }
    for entry in &summary.type_summary {
        println!(
            "   - {}: {} entries, {} days",
            entry.work_type,
            entry.count,
            format_days(entry.total_days)
        );
    }
    println!("   Duration: {:.1}s", duration);
}

/// Handle --dry-run: summarize the loaded input and exit.
fn handle_dry_run(records: &[WorkRecord], config: &Config) -> Result<()> {
    println!("\n🔍 Dry run: input loaded, nothing classified or written.\n");

    let with_days = records.iter().filter(|r| r.days().is_some()).count();
    let without_quarter = records.iter().filter(|r| r.quarter().is_none()).count();

    println!("   Entries: {}", records.len());
    println!("   With day counts: {}", with_days);
    println!("   Without a valid quarter: {}", without_quarter);
    println!(
        "   Would group by: {}",
        config
            .aggregation
            .group_by
            .iter()
            .map(|d| d.label())
            .collect::<Vec<_>>()
            .join(" > ")
    );
    println!("   Would write to: {}", config.general.output_dir);

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
