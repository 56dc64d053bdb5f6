//! Rollup aggregation and statistics.
//!
//! This module groups classified records by an ordered list of
//! dimensions into a tree of [`RollupNode`]s. Every record is partitioned
//! exactly once into core or excluded effort, and parents are built by
//! summing their children, so totals reconcile at every level.

use crate::models::ClassifiedRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Bucket for records whose grouping key is blank.
pub const UNRECOGNIZED: &str = "(unrecognized)";

/// A grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Dimension {
    Department,
    Project,
    Quarter,
    Person,
    Week,
    WorkType,
    TechnicalArea,
}

impl Dimension {
    /// Column heading for this dimension.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Department => "Department",
            Dimension::Project => "Project",
            Dimension::Quarter => "Quarter",
            Dimension::Person => "Person",
            Dimension::Week => "Week",
            Dimension::WorkType => "Work Type",
            Dimension::TechnicalArea => "Technical Area",
        }
    }

    /// Grouping key of a record, or `None` when the record has no place
    /// in this dimension (e.g. a week outside 1-52 for quarters).
    pub fn key_of(&self, item: &ClassifiedRecord) -> Option<String> {
        let record = &item.record;
        match self {
            Dimension::Department => Some(text_key(&record.department)),
            Dimension::Project => Some(text_key(&record.project)),
            Dimension::Person => Some(text_key(&record.person)),
            Dimension::Quarter => record.quarter().map(|q| format!("Q{}", q)),
            Dimension::Week => record.week.map(|w| format!("W{:02}", w)),
            Dimension::WorkType => Some(item.classification.work_type.as_str().to_string()),
            Dimension::TechnicalArea => {
                Some(item.classification.technical_area.as_str().to_string())
            }
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn text_key(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        UNRECOGNIZED.to_string()
    } else {
        value.to_string()
    }
}

/// Treatment of records without a day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDaysPolicy {
    /// Drop the record before aggregation.
    #[default]
    Drop,
    /// Keep the record for counts; it contributes no days.
    CountOnly,
}

impl MissingDaysPolicy {
    /// Whether a record takes part in aggregation under this policy.
    pub fn admits(&self, item: &ClassifiedRecord) -> bool {
        match self {
            MissingDaysPolicy::Drop => item.record.days().is_some(),
            MissingDaysPolicy::CountOnly => true,
        }
    }
}

/// Day totals and counts for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    /// Days of every type except equipment tuning.
    pub core: f64,
    /// Days of equipment tuning.
    pub excluded: f64,
    /// Always `core + excluded`.
    pub all: f64,
    /// Records in the group, including dayless ones.
    pub record_count: usize,
    /// Records in the group without a day count.
    pub dayless_count: usize,
}

impl Totals {
    /// Account one record, partitioning its days exactly once.
    pub fn add_record(&mut self, item: &ClassifiedRecord) {
        self.record_count += 1;
        match item.record.days() {
            Some(days) if item.classification.work_type.is_excluded() => self.excluded += days,
            Some(days) => self.core += days,
            None => self.dayless_count += 1,
        }
        self.all = self.core + self.excluded;
    }

    /// Fold another group's totals into this one.
    pub fn merge(&mut self, other: &Totals) {
        self.core += other.core;
        self.excluded += other.excluded;
        self.record_count += other.record_count;
        self.dayless_count += other.dayless_count;
        self.all = self.core + self.excluded;
    }

    /// Totals over a set of records.
    pub fn from_records<'a>(items: impl IntoIterator<Item = &'a ClassifiedRecord>) -> Self {
        let mut totals = Self::default();
        for item in items {
            totals.add_record(item);
        }
        totals
    }

    /// Records that carried a day count.
    pub fn days_record_count(&self) -> usize {
        self.record_count - self.dayless_count
    }

    /// Mean days per record with data; `None` when no record had days.
    pub fn mean(&self) -> Option<f64> {
        match self.days_record_count() {
            0 => None,
            n => Some(self.all / n as f64),
        }
    }

    /// Share of days spent on excluded work, as a percentage.
    pub fn excluded_share(&self) -> Option<f64> {
        if self.all > 0.0 {
            Some(self.excluded / self.all * 100.0)
        } else {
            None
        }
    }
}

/// One group in a rollup tree.
#[derive(Debug, Clone, Serialize)]
pub struct RollupNode {
    pub dimension: Dimension,
    pub key: String,
    pub totals: Totals,
    /// Distinct people contributing to this group.
    pub people_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RollupNode>,
}

impl RollupNode {
    /// Child with the given key.
    pub fn child(&self, key: &str) -> Option<&RollupNode> {
        self.children.iter().find(|c| c.key == key)
    }

    fn is_reconciled(&self, tolerance: f64) -> bool {
        if self.totals.core + self.totals.excluded != self.totals.all {
            return false;
        }
        if self.children.is_empty() {
            return true;
        }
        let child_sum: f64 = self.children.iter().map(|c| c.totals.all).sum();
        let child_records: usize = self.children.iter().map(|c| c.totals.record_count).sum();
        (child_sum - self.totals.all).abs() <= tolerance
            && child_records == self.totals.record_count
            && self.children.iter().all(|c| c.is_reconciled(tolerance))
    }

    fn sort_level(nodes: &mut [RollupNode], orders: &[LevelOrder]) {
        let Some((order, rest)) = orders.split_first() else {
            return;
        };
        order.apply(nodes);
        for node in nodes.iter_mut() {
            Self::sort_level(&mut node.children, rest);
        }
    }
}

/// Ordering applied to the nodes of one rollup level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOrder {
    /// Keep the order groups were first seen in.
    #[default]
    FirstSeen,
    /// Ascending by key.
    KeyAscending,
    /// Descending by total days; ties keep their current order.
    TotalDescending,
}

impl LevelOrder {
    fn apply(&self, nodes: &mut [RollupNode]) {
        match self {
            LevelOrder::FirstSeen => {}
            LevelOrder::KeyAscending => nodes.sort_by(|a, b| a.key.cmp(&b.key)),
            LevelOrder::TotalDescending => nodes.sort_by(|a, b| {
                b.totals
                    .all
                    .partial_cmp(&a.totals.all)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
    }
}

/// A complete multi-level rollup.
#[derive(Debug, Clone, Serialize)]
pub struct Rollup {
    pub dimensions: Vec<Dimension>,
    pub totals: Totals,
    pub people_count: usize,
    pub groups: Vec<RollupNode>,
    /// Records left out by the missing-days policy or an unplaceable key.
    pub skipped: usize,
}

impl Rollup {
    /// Reorder each level; levels without an entry keep first-seen order.
    pub fn sort(&mut self, orders: &[LevelOrder]) {
        RollupNode::sort_level(&mut self.groups, orders);
    }

    /// Node at the given key path.
    #[allow(dead_code)] // Lookup helper for tests and tooling
    pub fn find(&self, path: &[&str]) -> Option<&RollupNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.groups.iter().find(|g| g.key == *first)?;
        for key in rest {
            node = node.child(key)?;
        }
        Some(node)
    }

    /// Whether totals reconcile at every level within `tolerance`.
    pub fn is_reconciled(&self, tolerance: f64) -> bool {
        let sum: f64 = self.groups.iter().map(|g| g.totals.all).sum();
        self.totals.core + self.totals.excluded == self.totals.all
            && (sum - self.totals.all).abs() <= tolerance
            && self.groups.iter().all(|g| g.is_reconciled(tolerance))
    }
}

/// Group records into a rollup tree, one nesting level per dimension.
pub fn aggregate(
    records: &[ClassifiedRecord],
    dimensions: &[Dimension],
    policy: MissingDaysPolicy,
) -> Rollup {
    let admitted: Vec<&ClassifiedRecord> = records
        .iter()
        .filter(|r| policy.admits(r))
        .filter(|r| dimensions.iter().all(|d| d.key_of(r).is_some()))
        .collect();

    let skipped = records.len() - admitted.len();
    if skipped > 0 {
        debug!(
            "Rollup by {:?}: {} of {} records left out",
            dimensions,
            skipped,
            records.len()
        );
    }

    let groups = build_level(&admitted, dimensions);
    let mut totals = Totals::default();
    for group in &groups {
        totals.merge(&group.totals);
    }

    Rollup {
        dimensions: dimensions.to_vec(),
        totals,
        people_count: distinct_people(&admitted),
        groups,
        skipped,
    }
}

fn build_level(records: &[&ClassifiedRecord], dimensions: &[Dimension]) -> Vec<RollupNode> {
    let Some((&dimension, rest)) = dimensions.split_first() else {
        return Vec::new();
    };

    let mut order: Vec<(String, Vec<&ClassifiedRecord>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(key) = dimension.key_of(record) else {
            continue;
        };
        match positions.get(&key) {
            Some(&pos) => order[pos].1.push(record),
            None => {
                positions.insert(key.clone(), order.len());
                order.push((key, vec![record]));
            }
        }
    }

    order
        .into_iter()
        .map(|(key, members)| {
            let children = build_level(&members, rest);
            let totals = if children.is_empty() {
                Totals::from_records(members.iter().copied())
            } else {
                let mut totals = Totals::default();
                for child in &children {
                    totals.merge(&child.totals);
                }
                totals
            };

            RollupNode {
                dimension,
                key,
                totals,
                people_count: distinct_people(&members),
                children,
            }
        })
        .collect()
}

fn distinct_people(records: &[&ClassifiedRecord]) -> usize {
    records
        .iter()
        .map(|r| text_key(&r.record.person))
        .collect::<HashSet<_>>()
        .len()
}

/// The `n` nodes with the largest totals; ties keep their input order.
pub fn top_n(nodes: &[RollupNode], n: usize) -> Vec<&RollupNode> {
    let mut ranked: Vec<&RollupNode> = nodes.iter().collect();
    ranked.sort_by(|a, b| {
        b.totals
            .all
            .partial_cmp(&a.totals.all)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Classification, TechnicalArea, WorkRecord, WorkType};

    pub(crate) fn classified(
        department: &str,
        project: &str,
        person: &str,
        week: u32,
        days: Option<f64>,
        work_type: WorkType,
    ) -> ClassifiedRecord {
        ClassifiedRecord {
            record: WorkRecord {
                index: 0,
                person: person.to_string(),
                project: project.to_string(),
                department: department.to_string(),
                week: Some(week),
                day_count: days,
                content: Some("content".to_string()),
            },
            classification: Classification {
                work_type,
                subtype: "test".to_string(),
                technical_area: TechnicalArea::General,
                work_nature: work_type.work_nature().to_string(),
                analysis_reason: "test".to_string(),
                confidence: 0.5,
            },
            items: Vec::new(),
        }
    }

    fn sample() -> Vec<ClassifiedRecord> {
        vec![
            classified("T1", "MES", "Lin", 2, Some(4.0), WorkType::SoftwareDevelopment),
            classified("T1", "MES", "Wang", 3, Some(3.0), WorkType::EquipmentTuning),
            classified("T1", "WMS", "Lin", 15, Some(3.0), WorkType::SoftwareMaintenance),
            classified("T2", "MES", "Zhao", 30, Some(1.5), WorkType::OtherWork),
            classified("T2", "AGV", "Zhao", 53, Some(2.0), WorkType::OtherWork),
            classified("T2", "AGV", "Qian", 40, None, WorkType::SoftwareDevelopment),
        ]
    }

    #[test]
    fn test_core_excluded_scenario() {
        let records = vec![
            classified("T1", "MES", "Lin", 1, Some(7.0), WorkType::SoftwareDevelopment),
            classified("T1", "MES", "Wang", 1, Some(3.0), WorkType::EquipmentTuning),
        ];
        let rollup = aggregate(&records, &[Dimension::Department], MissingDaysPolicy::Drop);
        let dept = rollup.find(&["T1"]).unwrap();
        assert_eq!(dept.totals.core, 7.0);
        assert_eq!(dept.totals.excluded, 3.0);
        assert_eq!(dept.totals.all, 10.0);
    }

    #[test]
    fn test_reconciliation_per_department_project() {
        let rollup = aggregate(
            &sample(),
            &[Dimension::Department, Dimension::Project],
            MissingDaysPolicy::Drop,
        );
        assert!(rollup.is_reconciled(1e-9));
        for dept in &rollup.groups {
            for project in &dept.children {
                let t = project.totals;
                assert!((t.core + t.excluded - t.all).abs() <= 1e-9);
            }
        }
        assert_eq!(rollup.totals.all, 13.5);
        assert_eq!(rollup.find(&["T1", "MES"]).unwrap().totals.excluded, 3.0);
    }

    #[test]
    fn test_first_seen_order() {
        let rollup = aggregate(&sample(), &[Dimension::Project], MissingDaysPolicy::Drop);
        let keys: Vec<&str> = rollup.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["MES", "WMS", "AGV"]);
    }

    #[test]
    fn test_quarter_excludes_out_of_range_weeks() {
        let rollup = aggregate(
            &sample(),
            &[Dimension::Department, Dimension::Quarter],
            MissingDaysPolicy::Drop,
        );
        // week 53 dropped, dayless record dropped
        assert_eq!(rollup.skipped, 2);
        let t2 = rollup.find(&["T2"]).unwrap();
        assert_eq!(t2.totals.all, 1.5);
        assert!(rollup.find(&["T1", "Q2"]).is_some());
        assert!(rollup.is_reconciled(1e-9));
    }

    #[test]
    fn test_missing_days_policy() {
        let drop = aggregate(&sample(), &[Dimension::Department], MissingDaysPolicy::Drop);
        let keep = aggregate(
            &sample(),
            &[Dimension::Department],
            MissingDaysPolicy::CountOnly,
        );

        let t2_drop = drop.find(&["T2"]).unwrap();
        let t2_keep = keep.find(&["T2"]).unwrap();
        assert_eq!(t2_drop.totals.record_count, 2);
        assert_eq!(t2_keep.totals.record_count, 3);
        assert_eq!(t2_keep.totals.dayless_count, 1);
        assert_eq!(t2_drop.totals.all, t2_keep.totals.all);
        assert_eq!(t2_drop.people_count, 1);
        assert_eq!(t2_keep.people_count, 2);
        assert_eq!(t2_keep.totals.mean(), Some(3.5 / 2.0));
    }

    #[test]
    fn test_blank_keys_go_to_unrecognized_bucket() {
        let records = vec![
            classified("", "MES", "Lin", 1, Some(1.0), WorkType::OtherWork),
            classified("  ", "MES", "Lin", 1, Some(2.0), WorkType::OtherWork),
        ];
        let rollup = aggregate(&records, &[Dimension::Department], MissingDaysPolicy::Drop);
        assert_eq!(rollup.groups.len(), 1);
        assert_eq!(rollup.groups[0].key, UNRECOGNIZED);
        assert_eq!(rollup.groups[0].totals.all, 3.0);
    }

    #[test]
    fn test_top_n_stable_ties() {
        let records = vec![
            classified("T1", "A", "Lin", 1, Some(2.0), WorkType::OtherWork),
            classified("T1", "B", "Lin", 1, Some(5.0), WorkType::OtherWork),
            classified("T1", "C", "Lin", 1, Some(2.0), WorkType::OtherWork),
            classified("T1", "D", "Lin", 1, Some(2.0), WorkType::OtherWork),
        ];
        let rollup = aggregate(&records, &[Dimension::Project], MissingDaysPolicy::Drop);
        let top: Vec<&str> = top_n(&rollup.groups, 3).iter().map(|n| n.key.as_str()).collect();
        assert_eq!(top, vec!["B", "A", "C"]);
        assert!(top_n(&rollup.groups, 0).is_empty());
        assert_eq!(top_n(&rollup.groups, 10).len(), 4);
    }

    #[test]
    fn test_sort_levels() {
        let mut rollup = aggregate(
            &sample(),
            &[Dimension::Department, Dimension::Project],
            MissingDaysPolicy::Drop,
        );
        rollup.sort(&[LevelOrder::KeyAscending, LevelOrder::TotalDescending]);
        let t1 = &rollup.groups[0];
        assert_eq!(t1.key, "T1");
        let projects: Vec<&str> = t1.children.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(projects, vec!["MES", "WMS"]);
        let t2: Vec<&str> = rollup.groups[1].children.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(t2, vec!["AGV", "MES"]);
    }

    #[test]
    fn test_mean_and_share_guard_empty_groups() {
        let totals = Totals::default();
        assert_eq!(totals.mean(), None);
        assert_eq!(totals.excluded_share(), None);
    }
}
