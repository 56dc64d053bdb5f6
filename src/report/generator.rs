//! Markdown and JSON report generation.
//!
//! This module renders an [`AnalysisReport`] as a Markdown document or
//! as pretty-printed JSON, and serializes the per-record listing.

use super::table::{escape_cell, flatten, format_days, render_sparse, to_markdown};
use super::{AnalysisReport, ReportMetadata};
use crate::analysis::{DepartmentCatalog, HeadlineMetrics, ProjectSummary, RollupNode, WeeklyTrend};
use crate::models::{ClassifiedRecord, TypeSummary};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str("# Work Log Analysis Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.headline));
    output.push_str(&generate_type_section(&report.type_summary));
    output.push_str(&generate_projects_section(&report.projects));
    output.push_str(&generate_ranking_section(
        "Top Projects",
        "Project",
        &report.top_projects,
    ));
    output.push_str(&generate_ranking_section(
        "Busiest People",
        "Person",
        &report.busiest_people,
    ));
    output.push_str(&generate_trend_section(&report.weekly_trend));
    output.push_str(&generate_rollup_section(report));
    output.push_str(&generate_catalog_section(&report.catalogs));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Keyword Sets:** version {}\n",
        metadata.keywords_version
    ));
    section.push_str(&format!(
        "- **Grouped By:** {}\n",
        metadata
            .group_by
            .iter()
            .map(|d| d.label())
            .collect::<Vec<_>>()
            .join(" > ")
    ));
    section.push_str(&format!(
        "- **Records Without Days:** {:?}\n",
        metadata.missing_days
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &AnalysisReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Work Types](#work-types)\n");
    toc.push_str("- [Effort by Project](#effort-by-project)\n");
    toc.push_str("- [Top Projects](#top-projects)\n");
    toc.push_str("- [Busiest People](#busiest-people)\n");

    if !report.weekly_trend.is_empty() {
        toc.push_str("- [Weekly Trend](#weekly-trend)\n");
    }

    toc.push_str("- [Rollup](#rollup)\n");

    if !report.catalogs.is_empty() {
        toc.push_str("- [Requirements and Bugs](#requirements-and-bugs)\n");
    }

    toc.push('\n');

    toc
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Generate the headline summary.
fn generate_summary_section(headline: &HeadlineMetrics) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Records | People | Projects | Departments | **Total Days** | Core Days | Tuning Days | Tuning Share |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** | {} | {} | {} |\n\n",
        headline.record_count,
        headline.people_count,
        headline.project_count,
        headline.department_count,
        format_days(headline.totals.all),
        format_days(headline.totals.core),
        format_days(headline.totals.excluded),
        percent(headline.tuning_share),
    ));

    if let (Some(first), Some(last)) = (headline.first_week, headline.last_week) {
        section.push_str(&format!("Weeks covered: {} to {}.\n\n", first, last));
    }

    if let Some(mean) = headline.mean_days_per_record {
        section.push_str(&format!("Average days per entry: {:.2}.\n\n", mean));
    }

    if headline.totals.dayless_count > 0 {
        section.push_str(&format!(
            "{} entries carry no day count and are not included in day totals.\n\n",
            headline.totals.dayless_count
        ));
    }

    section
}

/// Generate the work type breakdown.
fn generate_type_section(summary: &[TypeSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Work Types\n\n");

    if summary.is_empty() {
        section.push_str("No records.\n\n");
        return section;
    }

    section.push_str("| Work Type | Entries | Total Days | Average Days |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for entry in summary {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} |\n",
            escape_cell(&entry.work_type.to_string()),
            entry.count,
            format_days(entry.total_days),
            entry.average_days
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-project core versus tuning table.
fn generate_projects_section(projects: &[ProjectSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Effort by Project\n\n");

    if projects.is_empty() {
        section.push_str("No effort recorded.\n\n");
        return section;
    }

    section.push_str(
        "| Department | Project | People | Core Days | Tuning Days | Total Days | Tuning Share |\n",
    );
    section.push_str("|:---|:---|:---:|:---:|:---:|:---:|:---:|\n");
    for project in projects {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            escape_cell(&project.department),
            escape_cell(&project.project),
            project.people_count,
            format_days(project.totals.core),
            format_days(project.totals.excluded),
            format_days(project.totals.all),
            percent(project.totals.excluded_share()),
        ));
    }
    section.push('\n');

    section
}

/// Generate a top-N ranking table.
fn generate_ranking_section(title: &str, label: &str, nodes: &[RollupNode]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if nodes.is_empty() {
        section.push_str("Nothing to rank.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| # | {} | Total Days | Core Days | Entries |\n",
        label
    ));
    section.push_str("|:---:|:---|:---:|:---:|:---:|\n");
    for (rank, node) in nodes.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            rank + 1,
            escape_cell(&node.key),
            format_days(node.totals.all),
            format_days(node.totals.core),
            node.totals.record_count
        ));
    }
    section.push('\n');

    section
}

/// Generate the weekly trend table.
fn generate_trend_section(trend: &[WeeklyTrend]) -> String {
    if trend.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Weekly Trend\n\n");
    section.push_str("| Week | People | Core Days | Tuning Days | Total Days |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
    for week in trend {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            week.week,
            week.people_count,
            format_days(week.totals.core),
            format_days(week.totals.excluded),
            format_days(week.totals.all)
        ));
    }
    section.push('\n');

    section
}

/// Generate the sparse rollup table.
fn generate_rollup_section(report: &AnalysisReport) -> String {
    let mut section = String::new();
    let rollup = &report.rollup;

    section.push_str("## Rollup\n\n");

    if rollup.groups.is_empty() {
        section.push_str("No records to roll up.\n\n");
        return section;
    }

    let dimensions = &rollup.dimensions;
    let grid = render_sparse(
        dimensions,
        &flatten(rollup),
        dimensions.len().saturating_sub(1),
    );
    section.push_str(&to_markdown(&grid));
    section.push('\n');

    if rollup.skipped > 0 {
        section.push_str(&format!(
            "*{} entries without days or without a place in this grouping are not shown.*\n\n",
            rollup.skipped
        ));
    }

    section
}

/// Generate the requirement and bug catalogs.
fn generate_catalog_section(catalogs: &[DepartmentCatalog]) -> String {
    if catalogs.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Requirements and Bugs\n\n");

    for entry in catalogs {
        section.push_str(&format!("### {}\n\n", entry.department));

        if !entry.catalog.requirements.is_empty() {
            section.push_str("**Requirements**\n\n");
            for (i, item) in entry.catalog.requirements.iter().enumerate() {
                section.push_str(&format!("{}. {}\n", i + 1, item));
            }
            section.push('\n');
        }

        if !entry.catalog.bugs.is_empty() {
            section.push_str("**Bugs**\n\n");
            for (i, item) in entry.catalog.bugs.iter().enumerate() {
                section.push_str(&format!("{}. {}\n", i + 1, item));
            }
            section.push('\n');
        }
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by worklens v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Serialize the per-record classification listing.
pub fn generate_records_json(records: &[ClassifiedRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::tests::classified;
    use crate::config::Config;
    use crate::models::WorkType;
    use crate::report::tests::sample_report;

    #[test]
    fn test_generate_markdown_report() {
        let report = sample_report(&Config::default());
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Work Log Analysis Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Effort by Project"));
        assert!(markdown.contains("## Weekly Trend"));
        assert!(markdown.contains("## Rollup"));
        assert!(markdown.contains("Equipment Tuning"));
        assert!(markdown.contains("修复空指针异常"));
    }

    #[test]
    fn test_summary_section() {
        let report = sample_report(&Config::default());
        let section = generate_summary_section(&report.headline);

        assert!(section.contains("**12.5**"));
        assert!(section.contains("24.0%"));
        assert!(section.contains("1 entries carry no day count"));
    }

    #[test]
    fn test_projects_section() {
        let report = sample_report(&Config::default());
        let section = generate_projects_section(&report.projects);

        assert!(section.contains("| T1 | MES | 2 | 7 | 3 | 10 | 30.0% |"));
        assert!(section.contains("| T2 | AGV | 1 | 2.5 | 0 | 2.5 | 0.0% |"));
    }

    #[test]
    fn test_table_cells_are_escaped() {
        let records = vec![classified(
            "R&D|East",
            "MES|v2",
            "Lin|Wang",
            2,
            Some(4.0),
            WorkType::SoftwareDevelopment,
        )];
        let projects = crate::analysis::project_summaries(&records, Default::default());
        let section = generate_projects_section(&projects);
        assert!(section.contains("| R&D\\|East | MES\\|v2 | 1 | 4 | 0 | 4 | 0.0% |"));

        let by_person = crate::analysis::aggregate(
            &records,
            &[crate::analysis::Dimension::Person],
            Default::default(),
        );
        let section = generate_ranking_section("Busiest People", "Person", &by_person.groups);
        assert!(section.contains("| 1 | Lin\\|Wang | 4 | 4 | 1 |"));
        // Every row keeps the header's column count.
        for line in section.lines().filter(|l| l.starts_with('|')) {
            assert_eq!(line.replace("\\|", "").matches('|').count(), 6);
        }
    }

    #[test]
    fn test_optional_sections_omitted() {
        let mut config = Config::default();
        config.report.include_weekly_trend = false;
        config.report.include_item_catalog = false;
        let markdown = generate_markdown_report(&sample_report(&config));

        assert!(!markdown.contains("## Weekly Trend"));
        assert!(!markdown.contains("## Requirements and Bugs"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = sample_report(&Config::default());
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"rollup\""));
        assert!(json.contains("\"group_by\""));
        assert!(json.contains("\"department\""));
    }

    #[test]
    fn test_generate_records_json() {
        let record = classified("T1", "MES", "Lin", 2, Some(1.5), WorkType::SystemIntegration);
        let json = generate_records_json(&[record]).unwrap();

        assert!(json.contains("\"person\": \"Lin\""));
        assert!(json.contains("\"day_count\": 1.5"));
        assert!(json.contains("\"type\": \"system_integration\""));
        assert!(json.contains("\"items\": []"));

        assert_eq!(generate_records_json(&[]).unwrap(), "[]");
    }
}
