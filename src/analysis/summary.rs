//! Derived summaries over classified records.

use super::aggregator::{aggregate, Dimension, LevelOrder, MissingDaysPolicy, Totals};
use crate::models::{ClassifiedRecord, ItemTag, TypeSummary, WorkRecord, WorkType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Map department labels through the alias table.
///
/// Returns new records; the input is left untouched.
pub fn normalize_departments(
    records: &[WorkRecord],
    aliases: &BTreeMap<String, String>,
) -> Vec<WorkRecord> {
    let mut renamed = 0;
    let normalized = records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if let Some(canonical) = aliases.get(record.department.trim()) {
                record.department = canonical.clone();
                renamed += 1;
            }
            record
        })
        .collect();

    debug!("Normalized {} department labels", renamed);
    normalized
}

/// Count and day totals per work type, in [`WorkType::ALL`] order.
///
/// Types with no records are omitted.
pub fn type_summary(records: &[ClassifiedRecord]) -> Vec<TypeSummary> {
    let mut stats: HashMap<WorkType, (usize, usize, f64)> = HashMap::new();

    for item in records {
        let entry = stats.entry(item.classification.work_type).or_default();
        entry.0 += 1;
        if let Some(days) = item.record.days() {
            entry.1 += 1;
            entry.2 += days;
        }
    }

    WorkType::ALL
        .iter()
        .filter_map(|work_type| {
            let (count, with_days, total_days) = stats.get(work_type).copied()?;
            Some(TypeSummary {
                work_type: *work_type,
                count,
                total_days,
                average_days: total_days / with_days.max(1) as f64,
            })
        })
        .collect()
}

/// Deduplicated requirement and bug items, in first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemCatalog {
    pub requirements: Vec<String>,
    pub bugs: Vec<String>,
    #[serde(skip)]
    seen: HashSet<(ItemTag, String)>,
}

impl ItemCatalog {
    /// Add every item of a record, skipping ones already listed.
    pub fn add(&mut self, record: &ClassifiedRecord) {
        for item in &record.items {
            if !self.seen.insert((item.tag, item.text.clone())) {
                continue;
            }
            match item.tag {
                ItemTag::Requirement => self.requirements.push(item.text.clone()),
                ItemTag::Bug => self.bugs.push(item.text.clone()),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.bugs.is_empty()
    }
}

/// Effort and item catalog for one (department, project) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub department: String,
    pub project: String,
    pub totals: Totals,
    pub people_count: usize,
    #[serde(flatten)]
    pub catalog: ItemCatalog,
}

/// Per-project summaries, departments and projects in first-seen order.
pub fn project_summaries(
    records: &[ClassifiedRecord],
    policy: MissingDaysPolicy,
) -> Vec<ProjectSummary> {
    let mut catalogs: HashMap<(String, String), ItemCatalog> = HashMap::new();
    for record in records {
        let key = (
            Dimension::Department.key_of(record).unwrap_or_default(),
            Dimension::Project.key_of(record).unwrap_or_default(),
        );
        catalogs.entry(key).or_default().add(record);
    }

    let rollup = aggregate(records, &[Dimension::Department, Dimension::Project], policy);

    let mut summaries = Vec::new();
    for department in &rollup.groups {
        for project in &department.children {
            let catalog = catalogs
                .remove(&(department.key.clone(), project.key.clone()))
                .unwrap_or_default();
            summaries.push(ProjectSummary {
                department: department.key.clone(),
                project: project.key.clone(),
                totals: project.totals,
                people_count: project.people_count,
                catalog,
            });
        }
    }

    summaries
}

/// Requirement and bug catalog for one department.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentCatalog {
    pub department: String,
    #[serde(flatten)]
    pub catalog: ItemCatalog,
}

/// Item catalogs per department, in first-seen order. Every record
/// contributes, whether or not it has a day count.
pub fn department_catalogs(records: &[ClassifiedRecord]) -> Vec<DepartmentCatalog> {
    let mut order: Vec<DepartmentCatalog> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let department = Dimension::Department.key_of(record).unwrap_or_default();
        let pos = *positions.entry(department.clone()).or_insert_with(|| {
            order.push(DepartmentCatalog {
                department,
                catalog: ItemCatalog::default(),
            });
            order.len() - 1
        });
        order[pos].catalog.add(record);
    }

    order
}

/// Effort in one week.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyTrend {
    pub week: String,
    pub totals: Totals,
    pub people_count: usize,
}

/// Week-by-week effort, ascending by week. Records without a week are left out.
pub fn weekly_trends(records: &[ClassifiedRecord], policy: MissingDaysPolicy) -> Vec<WeeklyTrend> {
    let mut rollup = aggregate(records, &[Dimension::Week], policy);
    rollup.sort(&[LevelOrder::KeyAscending]);

    rollup
        .groups
        .into_iter()
        .map(|node| WeeklyTrend {
            week: node.key,
            totals: node.totals,
            people_count: node.people_count,
        })
        .collect()
}

/// Top-line figures for the whole input.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlineMetrics {
    pub record_count: usize,
    pub people_count: usize,
    pub project_count: usize,
    pub department_count: usize,
    pub totals: Totals,
    /// Percentage of days spent on equipment tuning.
    pub tuning_share: Option<f64>,
    pub mean_days_per_record: Option<f64>,
    pub first_week: Option<u32>,
    pub last_week: Option<u32>,
}

impl HeadlineMetrics {
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let distinct = |dimension: Dimension| {
            records
                .iter()
                .filter_map(|r| dimension.key_of(r))
                .collect::<HashSet<_>>()
                .len()
        };

        let totals = Totals::from_records(records);
        let weeks = records.iter().filter_map(|r| r.record.week);

        Self {
            record_count: records.len(),
            people_count: distinct(Dimension::Person),
            project_count: distinct(Dimension::Project),
            department_count: distinct(Dimension::Department),
            totals,
            tuning_share: totals.excluded_share(),
            mean_days_per_record: totals.mean(),
            first_week: weeks.clone().min(),
            last_week: weeks.max(),
        }
    }
}
