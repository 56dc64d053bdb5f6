//! Tabular rendering of rollups.
//!
//! A rollup is flattened to one row per leaf. The full grid populates
//! every cell; the sparse grid blanks a leading level's key and total
//! when that level's key path repeats the previous row's, the way merged
//! cells read in a spreadsheet.

use crate::analysis::{Dimension, Rollup, RollupNode, Totals};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One leaf of a rollup with the keys and totals of every level above it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub keys: Vec<String>,
    pub totals: Vec<Totals>,
}

/// A rendered table. Blank cells are empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Flatten a rollup into leaf rows, depth first.
pub fn flatten(rollup: &Rollup) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    let mut keys = Vec::new();
    let mut totals = Vec::new();
    for node in &rollup.groups {
        walk(node, &mut keys, &mut totals, &mut rows);
    }
    rows
}

fn walk(
    node: &RollupNode,
    keys: &mut Vec<String>,
    totals: &mut Vec<Totals>,
    rows: &mut Vec<FlatRow>,
) {
    keys.push(node.key.clone());
    totals.push(node.totals);

    if node.children.is_empty() {
        rows.push(FlatRow {
            keys: keys.clone(),
            totals: totals.clone(),
        });
    } else {
        for child in &node.children {
            walk(child, keys, totals, rows);
        }
    }

    keys.pop();
    totals.pop();
}

/// Column headers for a rollup over `dimensions`.
///
/// Each non-leaf level has a key column and a total column; the leaf
/// level has a key column followed by the leaf figures.
pub fn headers(dimensions: &[Dimension]) -> Vec<String> {
    let mut headers = Vec::new();
    let last = dimensions.len().saturating_sub(1);
    for (level, dimension) in dimensions.iter().enumerate() {
        headers.push(dimension.label().to_string());
        if level < last {
            headers.push(format!("{} Total", dimension.label()));
        }
    }
    headers.extend(
        ["Core Days", "Tuning Days", "Total Days", "Records"]
            .iter()
            .map(|h| h.to_string()),
    );
    headers
}

fn key_column(level: usize) -> usize {
    level * 2
}

fn total_column(level: usize) -> usize {
    level * 2 + 1
}

fn cells(row: &FlatRow) -> Vec<String> {
    let depth = row.keys.len();
    let mut cells = Vec::with_capacity(depth * 2 + 3);
    for level in 0..depth {
        cells.push(row.keys[level].clone());
        if level + 1 < depth {
            cells.push(format_days(row.totals[level].all));
        }
    }
    if let Some(leaf) = row.totals.last() {
        cells.push(format_days(leaf.core));
        cells.push(format_days(leaf.excluded));
        cells.push(format_days(leaf.all));
        cells.push(leaf.record_count.to_string());
    }
    cells
}

/// Every cell populated.
pub fn render_full(dimensions: &[Dimension], rows: &[FlatRow]) -> Grid {
    Grid {
        headers: headers(dimensions),
        rows: rows.iter().map(cells).collect(),
    }
}

/// Blank repeated leading keys and their totals.
///
/// Only levels below `leading_levels` are blanked, and never the leaf.
pub fn render_sparse(dimensions: &[Dimension], rows: &[FlatRow], leading_levels: usize) -> Grid {
    let leading = leading_levels.min(dimensions.len().saturating_sub(1));
    let mut previous: Option<&FlatRow> = None;
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let mut line = cells(row);
        if let Some(prev) = previous {
            let shared = row
                .keys
                .iter()
                .zip(&prev.keys)
                .take_while(|(a, b)| a == b)
                .count();
            for level in 0..shared.min(leading) {
                line[key_column(level)].clear();
                line[total_column(level)].clear();
            }
        }
        out.push(line);
        previous = Some(row);
    }

    Grid {
        headers: headers(dimensions),
        rows: out,
    }
}

/// Refill blank cells from the row above.
pub fn forward_fill(grid: &Grid) -> Grid {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(grid.rows.len());
    for row in &grid.rows {
        let mut filled = row.clone();
        if let Some(prev) = rows.last() {
            for (cell, above) in filled.iter_mut().zip(prev) {
                if cell.is_empty() {
                    cell.clone_from(above);
                }
            }
        }
        rows.push(filled);
    }
    Grid {
        headers: grid.headers.clone(),
        rows,
    }
}

/// Format a day figure without trailing noise (`7`, `3.5`).
pub fn format_days(days: f64) -> String {
    let rounded = (days * 10_000.0).round() / 10_000.0;
    format!("{}", rounded)
}

/// Write a grid as CSV, with a UTF-8 BOM so spreadsheets pick the encoding.
pub fn write_csv(grid: &Grid, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&grid.headers)?;
    for row in &grid.rows {
        writer.write_record(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Make a value safe inside a Markdown table cell.
pub fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(&['\r', '\n'][..], " ")
}

/// Render a grid as a Markdown table.
pub fn to_markdown(grid: &Grid) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "| {} |\n",
        grid.headers
            .iter()
            .map(|h| escape_cell(h))
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    out.push_str(&format!("|{}\n", ":---|".repeat(grid.headers.len())));

    for row in &grid.rows {
        out.push_str(&format!(
            "| {} |\n",
            row.iter().map(|c| escape_cell(c)).collect::<Vec<_>>().join(" | ")
        ));
    }

    out
}
