//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::Dimension;
use clap::Parser;
use std::path::PathBuf;

/// worklens - weekly work-log classification and effort rollups
///
/// Classifies each work-log entry by the nature of the work, separates
/// equipment tuning from software effort, and writes nested rollup
/// tables with Markdown/JSON reports.
///
/// Examples:
///   worklens --input weekly_reports.csv
///   worklens --input exports/ --output-dir out --format json
///   worklens --input weekly_reports.csv --group-by department,person --top 5
///   worklens --input weekly_reports.csv --dry-run
///   worklens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Work-log CSV file, or a directory of CSV files
    #[arg(short, long, value_name = "PATH", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Directory the output files are written to
    ///
    /// Defaults to the config value, or "worklens_report".
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .worklens.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "WORKLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Rollup dimensions, outermost first (comma-separated)
    ///
    /// Values: department, project, quarter, person, week, work_type, technical_area
    #[arg(long, value_name = "DIMS", value_delimiter = ',')]
    pub group_by: Option<Vec<Dimension>>,

    /// Number of entries in top-N rankings
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Keep entries without a day count in counts instead of dropping them
    #[arg(long)]
    pub keep_dayless: bool,

    /// Dry run: load and summarize the input without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .worklens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File name of the report in this format.
    pub fn report_file(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "report.md",
            OutputFormat::Json => "report.json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref input) = self.input else {
            return Err("An --input file or directory is required".to_string());
        };

        if !input.exists() {
            return Err(format!("Input does not exist: {}", input.display()));
        }

        if let Some(ref group_by) = self.group_by {
            if group_by.is_empty() {
                return Err("--group-by needs at least one dimension".to_string());
            }
            for (i, dimension) in group_by.iter().enumerate() {
                if group_by[..i].contains(dimension) {
                    return Err(format!("Dimension listed twice in --group-by: {:?}", dimension));
                }
            }
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref output_dir) = self.output_dir {
            if output_dir.is_file() {
                return Err(format!(
                    "Output path is a file, not a directory: {}",
                    output_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_args(input: PathBuf) -> Args {
        Args {
            input: Some(input),
            output_dir: None,
            config: None,
            verbose: false,
            quiet: false,
            format: OutputFormat::Markdown,
            group_by: None,
            top: None,
            keep_dayless: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "worklens",
            "--input",
            "log.csv",
            "--group-by",
            "department,work_type,technical_area",
            "--top",
            "3",
            "--format",
            "json",
            "--keep-dayless",
        ])
        .unwrap();

        assert_eq!(args.input, Some(PathBuf::from("log.csv")));
        assert_eq!(
            args.group_by,
            Some(vec![
                Dimension::Department,
                Dimension::WorkType,
                Dimension::TechnicalArea
            ])
        );
        assert_eq!(args.top, Some(3));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.keep_dayless);
    }

    #[test]
    fn test_input_required_unless_init_config() {
        assert!(Args::try_parse_from(["worklens"]).is_err());
        assert!(Args::try_parse_from(["worklens", "--init-config"]).is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let args = make_args(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_group_by() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        assert!(args.validate().is_ok());

        args.group_by = Some(vec![Dimension::Person, Dimension::Person]);
        assert!(args.validate().is_err());

        args.group_by = Some(vec![]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        args.quiet = false;
        args.top = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(PathBuf::from("log.csv"));
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_report_file_names() {
        assert_eq!(OutputFormat::Markdown.report_file(), "report.md");
        assert_eq!(OutputFormat::Json.report_file(), "report.json");
    }
}
