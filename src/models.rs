//! Data models for the work-log analyzer.
//!
//! This module contains the core data structures shared by the loader,
//! the classifier, the aggregation engine and the report writers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Weeks per quarter bucket (weeks 1-13 are Q1, 14-26 Q2, ...).
pub const WEEKS_PER_QUARTER: u32 = 13;

/// Last week number that maps to a quarter.
pub const LAST_WEEK: u32 = 52;

/// Nature of the work described by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    /// On-site equipment tuning, calibration and debugging
    EquipmentTuning,
    /// New features, modules and interfaces
    SoftwareDevelopment,
    /// Bug fixes, optimization, refactoring and upgrades
    SoftwareMaintenance,
    /// Integration, protocols, deployment and testing
    SystemIntegration,
    /// Learning and technical research
    LearningResearch,
    /// Anything the rule cascade could not place
    OtherWork,
    /// Empty or absent content
    Unknown,
}

impl WorkType {
    /// Every work type, in report order.
    pub const ALL: [WorkType; 7] = [
        WorkType::EquipmentTuning,
        WorkType::SoftwareDevelopment,
        WorkType::SoftwareMaintenance,
        WorkType::SystemIntegration,
        WorkType::LearningResearch,
        WorkType::OtherWork,
        WorkType::Unknown,
    ];

    /// Machine-readable name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::EquipmentTuning => "equipment_tuning",
            WorkType::SoftwareDevelopment => "software_development",
            WorkType::SoftwareMaintenance => "software_maintenance",
            WorkType::SystemIntegration => "system_integration",
            WorkType::LearningResearch => "learning_research",
            WorkType::OtherWork => "other_work",
            WorkType::Unknown => "unknown",
        }
    }

    /// High-level work-nature label shown in reports.
    pub fn work_nature(&self) -> &'static str {
        match self {
            WorkType::EquipmentTuning => "Equipment Tuning",
            WorkType::SoftwareDevelopment => "Software Development",
            WorkType::SoftwareMaintenance => "Software Maintenance",
            WorkType::SystemIntegration => "System Integration",
            WorkType::LearningResearch => "Learning & Research",
            WorkType::OtherWork => "Other Work",
            WorkType::Unknown => "Unknown",
        }
    }

    /// Whether effort of this type is excluded from the core total.
    pub fn is_excluded(&self) -> bool {
        matches!(self, WorkType::EquipmentTuning)
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.work_nature())
    }
}

/// Technical area a piece of work touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalArea {
    Frontend,
    Backend,
    AlgorithmAi,
    DeviceControl,
    SystemArchitecture,
    DataProcessing,
    Testing,
    HardwareEquipment,
    Integration,
    General,
    Unknown,
}

impl TechnicalArea {
    /// Machine-readable name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TechnicalArea::Frontend => "frontend",
            TechnicalArea::Backend => "backend",
            TechnicalArea::AlgorithmAi => "algorithm_ai",
            TechnicalArea::DeviceControl => "device_control",
            TechnicalArea::SystemArchitecture => "system_architecture",
            TechnicalArea::DataProcessing => "data_processing",
            TechnicalArea::Testing => "testing",
            TechnicalArea::HardwareEquipment => "hardware_equipment",
            TechnicalArea::Integration => "integration",
            TechnicalArea::General => "general",
            TechnicalArea::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TechnicalArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of running the rule cascade over one record's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Top-level work type.
    #[serde(rename = "type")]
    pub work_type: WorkType,
    /// Finer tag, meaningful only together with `work_type`.
    pub subtype: String,
    /// Technical area of the work.
    pub technical_area: TechnicalArea,
    /// High-level label mirroring `work_type`.
    pub work_nature: String,
    /// Human-readable justification.
    #[serde(rename = "reason")]
    pub analysis_reason: String,
    /// Fixed trust level of the rule tier that matched.
    pub confidence: f64,
}

impl Classification {
    /// Classification for empty or absent content.
    pub fn empty() -> Self {
        Self {
            work_type: WorkType::Unknown,
            subtype: "empty_content".to_string(),
            technical_area: TechnicalArea::Unknown,
            work_nature: WorkType::Unknown.work_nature().to_string(),
            analysis_reason: "No work content recorded".to_string(),
            confidence: 0.0,
        }
    }
}

/// Item-level tag, computed independently of the record classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemTag {
    Requirement,
    Bug,
}

impl fmt::Display for ItemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemTag::Requirement => write!(f, "requirement"),
            ItemTag::Bug => write!(f, "bug"),
        }
    }
}

/// How an item tag was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagBasis {
    /// A keyword from the bug or requirement set matched.
    Keyword,
    /// Nothing matched; the item defaulted to a requirement.
    Fallback,
}

/// An atomic fragment of a record's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub text: String,
    pub tag: ItemTag,
    pub basis: TagBasis,
}

/// One person-project-week entry as produced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    /// 1-based position in the input.
    pub index: usize,
    pub person: String,
    pub project: String,
    pub department: String,
    /// Week number; `None` when the cell was empty or not a number.
    pub week: Option<u32>,
    /// Days invested; `None` when absent (distinct from zero effort).
    pub day_count: Option<f64>,
    /// Narrative text; `None` when absent.
    pub content: Option<String>,
}

impl WorkRecord {
    /// Quarter (1-4) of this record's week, if the week is in range.
    pub fn quarter(&self) -> Option<u32> {
        self.week.and_then(quarter_of_week)
    }

    /// Day count usable in sums: present, finite and non-negative.
    pub fn days(&self) -> Option<f64> {
        self.day_count.filter(|d| d.is_finite() && *d >= 0.0)
    }
}

/// Map a week number to its quarter using fixed 13-week buckets.
pub fn quarter_of_week(week: u32) -> Option<u32> {
    if (1..=LAST_WEEK).contains(&week) {
        Some((week - 1) / WEEKS_PER_QUARTER + 1)
    } else {
        None
    }
}

/// A record together with everything derived from its content.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: WorkRecord,
    pub classification: Classification,
    pub items: Vec<WorkItem>,
}

impl ClassifiedRecord {
    /// Items carrying the given tag.
    pub fn items_tagged(&self, tag: ItemTag) -> impl Iterator<Item = &WorkItem> {
        self.items.iter().filter(move |item| item.tag == tag)
    }
}

/// Count and effort for one work type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSummary {
    #[serde(rename = "type")]
    pub work_type: WorkType,
    pub count: usize,
    pub total_days: f64,
    pub average_days: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(week: Option<u32>, day_count: Option<f64>) -> WorkRecord {
        WorkRecord {
            index: 1,
            person: "Lin".to_string(),
            project: "MES".to_string(),
            department: "T1".to_string(),
            week,
            day_count,
            content: None,
        }
    }

    #[test]
    fn test_quarter_buckets() {
        assert_eq!(quarter_of_week(1), Some(1));
        assert_eq!(quarter_of_week(13), Some(1));
        assert_eq!(quarter_of_week(14), Some(2));
        assert_eq!(quarter_of_week(15), Some(2));
        assert_eq!(quarter_of_week(27), Some(3));
        assert_eq!(quarter_of_week(40), Some(4));
        assert_eq!(quarter_of_week(52), Some(4));
    }

    #[test]
    fn test_quarter_out_of_range() {
        assert_eq!(quarter_of_week(0), None);
        assert_eq!(quarter_of_week(53), None);
        assert_eq!(record(Some(53), None).quarter(), None);
        assert_eq!(record(None, None).quarter(), None);
    }

    #[test]
    fn test_days_filters_unusable_values() {
        assert_eq!(record(None, Some(1.5)).days(), Some(1.5));
        assert_eq!(record(None, Some(0.0)).days(), Some(0.0));
        assert_eq!(record(None, Some(f64::NAN)).days(), None);
        assert_eq!(record(None, Some(-1.0)).days(), None);
        assert_eq!(record(None, None).days(), None);
    }

    #[test]
    fn test_empty_classification() {
        let c = Classification::empty();
        assert_eq!(c.work_type, WorkType::Unknown);
        assert_eq!(c.subtype, "empty_content");
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_only_tuning_is_excluded() {
        for work_type in WorkType::ALL {
            assert_eq!(
                work_type.is_excluded(),
                work_type == WorkType::EquipmentTuning
            );
        }
    }

    #[test]
    fn test_classification_serializes_with_report_names() {
        let json = serde_json::to_string(&Classification::empty()).unwrap();
        assert!(json.contains("\"type\":\"unknown\""));
        assert!(json.contains("\"reason\""));
        assert!(json.contains("\"technical_area\":\"unknown\""));
    }
}
