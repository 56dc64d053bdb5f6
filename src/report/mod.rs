//! Report assembly and output writers.

mod generator;
pub mod table;

pub use generator::{generate_json_report, generate_markdown_report, generate_records_json};

use crate::analysis::{
    aggregate, department_catalogs, project_summaries, top_n, type_summary, weekly_trends,
    DepartmentCatalog, Dimension, HeadlineMetrics, MissingDaysPolicy, ProjectSummary, Rollup,
    RollupNode, WeeklyTrend,
};
use crate::config::Config;
use crate::models::{ClassifiedRecord, TypeSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Run metadata shown at the top of every report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub input: String,
    pub generated_at: DateTime<Utc>,
    pub keywords_version: u32,
    pub group_by: Vec<Dimension>,
    pub missing_days: MissingDaysPolicy,
    pub duration_seconds: f64,
}

/// Everything a report renders.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub headline: HeadlineMetrics,
    pub type_summary: Vec<TypeSummary>,
    pub projects: Vec<ProjectSummary>,
    pub top_projects: Vec<RollupNode>,
    pub busiest_people: Vec<RollupNode>,
    pub weekly_trend: Vec<WeeklyTrend>,
    pub rollup: Rollup,
    pub catalogs: Vec<DepartmentCatalog>,
}

impl AnalysisReport {
    /// Derive every report section from the classified records.
    pub fn build(
        records: &[ClassifiedRecord],
        rollup: Rollup,
        config: &Config,
        metadata: ReportMetadata,
    ) -> Self {
        let policy = config.aggregation.missing_days;
        let top = config.general.top_n;

        let by_project = aggregate(records, &[Dimension::Project], policy);
        let by_person = aggregate(records, &[Dimension::Person], policy);

        let weekly_trend = if config.report.include_weekly_trend {
            weekly_trends(records, policy)
        } else {
            Vec::new()
        };

        let catalogs = if config.report.include_item_catalog {
            let limit = config.report.max_items_listed;
            department_catalogs(records)
                .into_iter()
                .map(|mut entry| {
                    entry.catalog.requirements.truncate(limit);
                    entry.catalog.bugs.truncate(limit);
                    entry
                })
                .filter(|entry| !entry.catalog.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            metadata,
            headline: HeadlineMetrics::from_records(records),
            type_summary: type_summary(records),
            projects: project_summaries(records, policy),
            top_projects: top_n(&by_project.groups, top).into_iter().cloned().collect(),
            busiest_people: top_n(&by_person.groups, top).into_iter().cloned().collect(),
            weekly_trend,
            rollup,
            catalogs,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::aggregator::tests::classified;
    use crate::analysis::normalize_departments;
    use crate::classifier::Classifier;
    use crate::loader::load_records;
    use crate::models::{ItemTag, TagBasis, WorkItem, WorkType};

    pub(crate) fn sample_report(config: &Config) -> AnalysisReport {
        let mut records = vec![
            classified("T1", "MES", "Lin", 2, Some(7.0), WorkType::SoftwareDevelopment),
            classified("T1", "MES", "Wang", 3, Some(3.0), WorkType::EquipmentTuning),
            classified("T2", "AGV", "Zhao", 15, Some(2.5), WorkType::SoftwareMaintenance),
            classified("T2", "AGV", "Zhao", 16, None, WorkType::Unknown),
        ];
        records[0].items = vec![
            WorkItem {
                text: "开发登录模块".to_string(),
                tag: ItemTag::Requirement,
                basis: TagBasis::Keyword,
            },
            WorkItem {
                text: "修复空指针异常".to_string(),
                tag: ItemTag::Bug,
                basis: TagBasis::Keyword,
            },
        ];

        let rollup = aggregate(
            &records,
            &config.aggregation.group_by,
            config.aggregation.missing_days,
        );
        let metadata = ReportMetadata {
            input: "fixtures/sample_worklog.csv".to_string(),
            generated_at: Utc::now(),
            keywords_version: 1,
            group_by: config.aggregation.group_by.clone(),
            missing_days: config.aggregation.missing_days,
            duration_seconds: 0.2,
        };
        AnalysisReport::build(&records, rollup, config, metadata)
    }

    #[test]
    fn test_build_report() {
        let report = sample_report(&Config::default());

        assert_eq!(report.headline.record_count, 4);
        assert_eq!(report.type_summary.len(), 4);
        assert_eq!(report.projects.len(), 2);
        assert_eq!(report.projects[0].totals.core, 7.0);
        assert_eq!(report.projects[0].totals.excluded, 3.0);
        assert_eq!(report.top_projects[0].key, "MES");
        assert_eq!(report.busiest_people[0].key, "Lin");
        assert_eq!(report.weekly_trend.len(), 3);
        assert_eq!(report.catalogs.len(), 1);
        assert!(report.rollup.is_reconciled(1e-9));
    }

    #[test]
    fn test_fixture_pipeline() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join("sample_worklog.csv");
        let config = Config::default();

        let loaded = load_records(&path, &config.columns).unwrap();
        assert_eq!(loaded.len(), 9);

        let records = normalize_departments(&loaded, &config.departments.aliases);
        let classifier = Classifier::from_config(&config);
        let classified: Vec<ClassifiedRecord> =
            records.iter().map(|r| classifier.classify_record(r)).collect();

        assert_eq!(
            classified[1].classification.work_type,
            WorkType::EquipmentTuning
        );
        assert_eq!(classified[0].items.len(), 2);
        assert_eq!(classified[8].classification.work_type, WorkType::Unknown);

        let rollup = aggregate(
            &classified,
            &config.aggregation.group_by,
            config.aggregation.missing_days,
        );
        let departments: Vec<&str> = rollup.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(departments, vec!["T1", "T2", "T3"]);
        // one entry without days, one in week 53
        assert_eq!(rollup.skipped, 2);
        assert_eq!(rollup.totals.all, 19.5);
        assert!(rollup.is_reconciled(1e-9));

        let report = AnalysisReport::build(
            &classified,
            rollup,
            &config,
            sample_report(&config).metadata,
        );
        assert_eq!(report.headline.department_count, 3);
        assert_eq!(report.headline.totals.dayless_count, 1);
    }

    #[test]
    fn test_build_respects_report_settings() {
        let mut config = Config::default();
        config.general.top_n = 1;
        config.report.include_weekly_trend = false;
        config.report.max_items_listed = 0;

        let report = sample_report(&config);
        assert_eq!(report.top_projects.len(), 1);
        assert_eq!(report.busiest_people.len(), 1);
        assert!(report.weekly_trend.is_empty());
        assert!(report.catalogs.is_empty());
    }
}
