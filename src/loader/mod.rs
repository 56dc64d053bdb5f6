//! Work-log loader.
//!
//! Reads one CSV export, or every `*.csv` under a directory, into
//! [`WorkRecord`]s. Text is decoded by trying a fixed sequence of
//! encodings; the first that decodes cleanly wins.

pub mod error;

pub use error::LoadError;

use crate::config::ColumnConfig;
use crate::models::WorkRecord;
use csv::ReaderBuilder;
use encoding_rs::GB18030;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodings tried in order, as reported in errors and logs.
pub const ENCODING_SEQUENCE: [&str; 3] = ["utf-8-sig", "utf-8", "gb18030"];

/// Load every record from a file or directory, in input order.
pub fn load_records(input: &Path, columns: &ColumnConfig) -> Result<Vec<WorkRecord>, LoadError> {
    let files = discover_inputs(input)?;
    let mut records = Vec::new();

    for file in &files {
        let bytes = std::fs::read(file).map_err(|source| LoadError::Io {
            path: file.clone(),
            source,
        })?;
        let (text, encoding) = decode(&bytes, file)?;
        debug!("Decoded {} as {}", file.display(), encoding);

        let parsed = parse_csv(&text, columns, file, records.len())?;
        info!("Loaded {} records from {}", parsed.len(), file.display());
        records.extend(parsed);
    }

    Ok(records)
}

/// Resolve the input path to a sorted list of CSV files.
pub fn discover_inputs(input: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !input.exists() {
        return Err(LoadError::NotFound(input.to_path_buf()));
    }

    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();

    if files.is_empty() {
        return Err(LoadError::NoInputFiles(input.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Decode raw bytes with the fallback sequence.
pub fn decode(bytes: &[u8], path: &Path) -> Result<(String, &'static str), LoadError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return Ok((text.to_string(), ENCODING_SEQUENCE[0]));
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok((text.to_string(), ENCODING_SEQUENCE[1]));
    }

    if let Some(text) = GB18030.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok((text.into_owned(), ENCODING_SEQUENCE[2]));
    }

    Err(LoadError::Encoding {
        path: path.to_path_buf(),
        tried: ENCODING_SEQUENCE.join(", "),
    })
}

/// Parse decoded CSV text. Indices continue from `offset`.
pub fn parse_csv(
    text: &str,
    columns: &ColumnConfig,
    path: &Path,
    offset: usize,
) -> Result<Vec<WorkRecord>, LoadError> {
    let csv_error = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: HashMap<String, usize> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.trim().to_string(), idx))
        .collect();

    let column = |field: &'static str, name: &str| -> Result<usize, LoadError> {
        headers
            .get(name.trim())
            .copied()
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                field,
                column: name.to_string(),
            })
    };

    let person = column("person", &columns.person)?;
    let project = column("project", &columns.project)?;
    let department = column("department", &columns.department)?;
    let week = column("week", &columns.week)?;
    let day_count = column("day_count", &columns.day_count)?;
    let content = column("content", &columns.content)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
        let index = offset + records.len() + 1;

        records.push(WorkRecord {
            index,
            person: cell(person).to_string(),
            project: cell(project).to_string(),
            department: cell(department).to_string(),
            week: parse_week(cell(week), index),
            day_count: parse_days(cell(day_count), index),
            content: Some(cell(content).to_string()).filter(|c| !c.is_empty()),
        });
    }

    Ok(records)
}

/// Parse a week cell; accepts `15` and spreadsheet-style `15.0`.
fn parse_week(raw: &str, index: usize) -> Option<u32> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(week) = raw.parse::<u32>() {
        return Some(week);
    }

    match raw.parse::<f64>() {
        Ok(week) if week.is_finite() && week >= 0.0 && week.fract() == 0.0 => Some(week as u32),
        _ => {
            warn!("Record {}: unreadable week '{}'", index, raw);
            None
        }
    }
}

/// Parse a day-count cell; blank means no data, not zero.
fn parse_days(raw: &str, index: usize) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<f64>() {
        Ok(days) if days.is_finite() && days >= 0.0 => Some(days),
        Ok(days) => {
            warn!("Record {}: ignoring day count {}", index, days);
            None
        }
        Err(_) => {
            warn!("Record {}: unreadable day count '{}'", index, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "周报人,订单项目.立项项目,订单项目.归属中心,周次,订单项目.本周投入天数（最低半天）,订单项目.本周进度及问题反馈";

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_csv_fields() {
        let text = format!(
            "{}\n林一,MES,T1,15,2.5,\"1.开发登录模块;2.修复导出问题\"\n王二,WMS,T2,53,,\n,,,,,\n",
            HEADER
        );
        let records =
            parse_csv(&text, &ColumnConfig::default(), Path::new("a.csv"), 0).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 1);
        assert_eq!(records[0].person, "林一");
        assert_eq!(records[0].week, Some(15));
        assert_eq!(records[0].day_count, Some(2.5));
        assert!(records[0].content.as_deref().unwrap().contains("登录模块"));

        assert_eq!(records[1].index, 2);
        assert_eq!(records[1].week, Some(53));
        assert_eq!(records[1].day_count, None);
        assert_eq!(records[1].content, None);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let text = "周报人,周次\n林一,3\n";
        let err = parse_csv(text, &ColumnConfig::default(), Path::new("a.csv"), 0).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { field: "project", .. }));
    }

    #[test]
    fn test_parse_week_and_days() {
        assert_eq!(parse_week("15.0", 1), Some(15));
        assert_eq!(parse_week("x", 1), None);
        assert_eq!(parse_week("", 1), None);
        assert_eq!(parse_days("0.5", 1), Some(0.5));
        assert_eq!(parse_days("0", 1), Some(0.0));
        assert_eq!(parse_days("-1", 1), None);
        assert_eq!(parse_days("NaN", 1), None);
    }

    #[test]
    fn test_decode_fallback_sequence() {
        let path = Path::new("x.csv");

        let (text, enc) = decode("\u{FEFF}周次".as_bytes(), path).unwrap();
        assert_eq!((text.as_str(), enc), ("周次", "utf-8-sig"));

        let (_, enc) = decode("周次".as_bytes(), path).unwrap();
        assert_eq!(enc, "utf-8");

        // "周次" in GBK
        let (text, enc) = decode(&[0xD6, 0xDC, 0xB4, 0xCE], path).unwrap();
        assert_eq!((text.as_str(), enc), ("周次", "gb18030"));
    }

    #[test]
    fn test_load_directory_in_path_order() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "b.csv",
            format!("{}\n王二,WMS,T2,2,1,b\n", HEADER).as_bytes(),
        );
        write_file(
            dir.path(),
            "a.csv",
            format!("{}\n林一,MES,T1,1,1,a\n", HEADER).as_bytes(),
        );
        write_file(dir.path(), "notes.txt", b"ignored");

        let records = load_records(dir.path(), &ColumnConfig::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].person, "林一");
        assert_eq!(records[1].person, "王二");
        assert_eq!(records[1].index, 2);
    }

    #[test]
    fn test_missing_input() {
        let err = load_records(Path::new("/definitely/not/here.csv"), &ColumnConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));

        let dir = TempDir::new().unwrap();
        let err = discover_inputs(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::NoInputFiles(_)));
    }
}
