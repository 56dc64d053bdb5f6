//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.worklens.toml` files.

use crate::analysis::{Dimension, LevelOrder, MissingDaysPolicy};
use crate::classifier::items::DEFAULT_MIN_ITEM_CHARS;
use crate::classifier::keywords::{default_sets, KEYWORDS_VERSION};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".worklens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input column names.
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Department normalization.
    #[serde(default)]
    pub departments: DepartmentConfig,

    /// Rollup settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Work item extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Classification keyword sets.
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory all output files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Entries shown in top-N rankings.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            top_n: default_top_n(),
        }
    }
}

fn default_output_dir() -> String {
    "worklens_report".to_string()
}

fn default_top_n() -> usize {
    10
}

/// Names of the input CSV columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_person_column")]
    pub person: String,

    #[serde(default = "default_project_column")]
    pub project: String,

    #[serde(default = "default_department_column")]
    pub department: String,

    #[serde(default = "default_week_column")]
    pub week: String,

    #[serde(default = "default_day_count_column")]
    pub day_count: String,

    #[serde(default = "default_content_column")]
    pub content: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            person: default_person_column(),
            project: default_project_column(),
            department: default_department_column(),
            week: default_week_column(),
            day_count: default_day_count_column(),
            content: default_content_column(),
        }
    }
}

fn default_person_column() -> String {
    "周报人".to_string()
}

fn default_project_column() -> String {
    "订单项目.立项项目".to_string()
}

fn default_department_column() -> String {
    "订单项目.归属中心".to_string()
}

fn default_week_column() -> String {
    "周次".to_string()
}

fn default_day_count_column() -> String {
    "订单项目.本周投入天数（最低半天）".to_string()
}

fn default_content_column() -> String {
    "订单项目.本周进度及问题反馈".to_string()
}

/// Department label normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentConfig {
    /// Label -> canonical label. Applied before any grouping.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,
}

impl Default for DepartmentConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
        }
    }
}

fn default_aliases() -> BTreeMap<String, String> {
    [("T1电子元件".to_string(), "T1".to_string())]
        .into_iter()
        .collect()
}

/// Rollup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Nesting order of the main rollup.
    #[serde(default = "default_group_by")]
    pub group_by: Vec<Dimension>,

    /// What to do with records that carry no day count.
    #[serde(default)]
    pub missing_days: MissingDaysPolicy,

    /// Ordering per rollup level; unlisted levels keep first-seen order.
    #[serde(default)]
    pub order: Vec<LevelOrder>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            group_by: default_group_by(),
            missing_days: MissingDaysPolicy::default(),
            order: Vec::new(),
        }
    }
}

fn default_group_by() -> Vec<Dimension> {
    vec![
        Dimension::Department,
        Dimension::Project,
        Dimension::Quarter,
        Dimension::Person,
    ]
}

/// Work item extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Fragments shorter than this many characters are discarded.
    #[serde(default = "default_min_item_chars")]
    pub min_item_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_item_chars: default_min_item_chars(),
        }
    }
}

fn default_min_item_chars() -> usize {
    DEFAULT_MIN_ITEM_CHARS
}

/// Versioned, named keyword sets.
///
/// Sets listed here replace the built-in set of the same name; sets that
/// are not listed keep their built-in terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_keywords_version")]
    pub version: u32,

    #[serde(default = "default_sets")]
    pub sets: BTreeMap<String, Vec<String>>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            version: default_keywords_version(),
            sets: default_sets(),
        }
    }
}

fn default_keywords_version() -> u32 {
    KEYWORDS_VERSION
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Maximum requirement/bug items listed per department.
    #[serde(default = "default_max_items_listed")]
    pub max_items_listed: usize,

    /// Include the week-by-week trend table.
    #[serde(default = "default_true")]
    pub include_weekly_trend: bool,

    /// Include the requirement and bug catalogs.
    #[serde(default = "default_true")]
    pub include_item_catalog: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_items_listed: default_max_items_listed(),
            include_weekly_trend: true,
            include_item_catalog: true,
        }
    }
}

fn default_max_items_listed() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.display().to_string();
        }

        if let Some(top) = args.top {
            self.general.top_n = top;
        }

        if let Some(ref group_by) = args.group_by {
            self.aggregation.group_by = group_by.clone();
        }

        if args.keep_dayless {
            self.aggregation.missing_days = MissingDaysPolicy::CountOnly;
        }
    }

    /// Check settings that deserialize fine but cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        let group_by = &self.aggregation.group_by;
        if group_by.is_empty() {
            bail!("aggregation.group_by needs at least one dimension");
        }
        for (i, dimension) in group_by.iter().enumerate() {
            if group_by[..i].contains(dimension) {
                bail!(
                    "Dimension listed twice in aggregation.group_by: {}",
                    dimension.label()
                );
            }
        }

        if self.general.top_n == 0 {
            bail!("general.top_n must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
