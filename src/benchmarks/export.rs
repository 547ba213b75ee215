//! CSV export of a finalized report, and parsing of exported files.
//!
//! Column order: `i,label`, then `loadTime<B>`, `inferTime<B>`, `prediction<B>` and
//! `correct<B>`, each group covering every backend in configuration order. Backend
//! names are restricted to column-safe characters so no field ever needs quoting.

use super::report::{Report, ResultRow, TimedResult};
use crate::errors::{BenchmarkError, BenchmarkResult};
use csv::StringRecord;
use log::info;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Default export file name.
pub const DEFAULT_RESULTS_FILE: &str = "results.csv";

const COLUMN_GROUPS: [&str; 4] = ["loadTime", "inferTime", "prediction", "correct"];

/// Whether `name` can be used as a column suffix without quoting.
pub fn is_column_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Header line for the given backends.
pub fn csv_header(backend_names: &[String]) -> String {
    let mut columns = vec!["i".to_string(), "label".to_string()];
    for group in COLUMN_GROUPS {
        columns.extend(backend_names.iter().map(|name| format!("{}{}", group, name)));
    }
    columns.join(",")
}

/// Renders the report, one header line then one line per row.
/// Times are written with `precision` decimals.
pub fn render_csv(report: &Report, precision: usize) -> String {
    let mut out = csv_header(report.backend_names());
    out.push('\n');

    for row in report.rows() {
        let mut fields = vec![row.sample_index.to_string(), row.label.to_string()];
        fields.extend(
            row.results
                .iter()
                .map(|r| format!("{:.*}", precision, r.load_time_ms)),
        );
        fields.extend(
            row.results
                .iter()
                .map(|r| format!("{:.*}", precision, r.infer_time_ms)),
        );
        fields.extend(row.results.iter().map(|r| r.prediction.to_string()));
        fields.extend(row.results.iter().map(|r| r.correct.to_string()));
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Parses a file produced by [`render_csv`].
pub fn parse_csv(text: &str) -> BenchmarkResult<Report> {
    parse_records(csv_reader(text.as_bytes()))
}

/// Reads and parses an exported results file.
pub fn read_results(path: &Path) -> BenchmarkResult<Report> {
    parse_records(csv_reader(File::open(path)?))
}

fn csv_reader<R: io::Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

fn parse_records<R: io::Read>(mut reader: csv::Reader<R>) -> BenchmarkResult<Report> {
    let header = reader
        .headers()
        .map_err(|e| parse_error(1, format!("failed to read header: {}", e)))?
        .clone();
    let backend_names = parse_header(&header)?;
    let count = backend_names.len();
    let width = 2 + COLUMN_GROUPS.len() * count;

    let mut rows = Vec::new();
    let mut row_lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map_or(row_lines.len() + 2, |p| p.line() as usize);
            parse_error(line, format!("failed to read row: {}", e))
        })?;
        let line_number = record
            .position()
            .map_or(row_lines.len() + 2, |p| p.line() as usize);
        if record.len() != width {
            return Err(parse_error(
                line_number,
                format!("expected {} fields, found {}", width, record.len()),
            ));
        }

        let mut results = Vec::with_capacity(count);
        for (b, name) in backend_names.iter().enumerate() {
            results.push(TimedResult {
                backend_name: name.clone(),
                load_time_ms: parse_field(line_number, "loadTime", &record[2 + b])?,
                infer_time_ms: parse_field(line_number, "inferTime", &record[2 + count + b])?,
                prediction: parse_field(line_number, "prediction", &record[2 + 2 * count + b])?,
                correct: parse_field(line_number, "correct", &record[2 + 3 * count + b])?,
            });
        }

        rows.push(ResultRow {
            sample_index: parse_field(line_number, "i", &record[0])?,
            label: parse_field(line_number, "label", &record[1])?,
            results,
        });
        row_lines.push(line_number);
    }

    Report::new(backend_names, rows).map_err(|e| match e {
        BenchmarkError::InvalidReport { row, message } => {
            parse_error(row_lines.get(row).copied().unwrap_or(row + 2), message)
        }
        other => other,
    })
}

fn parse_header(header: &StringRecord) -> BenchmarkResult<Vec<String>> {
    let columns: Vec<&str> = header.iter().collect();
    if columns.len() < 2 || columns[0] != "i" || columns[1] != "label" {
        return Err(parse_error(1, "header must start with 'i,label'"));
    }
    let rest = &columns[2..];
    if rest.is_empty() || rest.len() % COLUMN_GROUPS.len() != 0 {
        return Err(parse_error(1, "header does not hold four columns per backend"));
    }

    let count = rest.len() / COLUMN_GROUPS.len();
    let names: Vec<String> = rest[..count]
        .iter()
        .map(|column| {
            column
                .strip_prefix("loadTime")
                .filter(|name| is_column_safe(name))
                .map(str::to_string)
                .ok_or_else(|| parse_error(1, format!("unexpected column '{}'", column)))
        })
        .collect::<BenchmarkResult<_>>()?;

    if csv_header(&names) != columns.join(",") {
        return Err(parse_error(1, "columns are not in the expected order"));
    }
    Ok(names)
}

fn parse_field<T: FromStr>(line: usize, column: &str, value: &str) -> BenchmarkResult<T> {
    value
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {} value '{}'", column, value)))
}

fn parse_error(line: usize, message: impl Into<String>) -> BenchmarkError {
    BenchmarkError::ResultsParse {
        line,
        message: message.into(),
    }
}

/// Destination of a finalized report.
pub trait ReportExporter: Send + Sync {
    fn export(&self, report: &Report) -> BenchmarkResult<()>;
}

/// Writes the CSV rendering of the report to a file.
#[derive(Debug, Clone)]
pub struct CsvFileExporter {
    path: PathBuf,
    precision: usize,
}

impl CsvFileExporter {
    pub fn new(path: impl Into<PathBuf>, precision: usize) -> Self {
        Self {
            path: path.into(),
            precision,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportExporter for CsvFileExporter {
    /// Writes a sibling `.partial` file and renames it over the target, so the
    /// target never holds a truncated report.
    fn export(&self, report: &Report) -> BenchmarkResult<()> {
        let staging = staging_path(&self.path);
        let written = fs::write(&staging, render_csv(report, self.precision))
            .and_then(|()| fs::rename(&staging, &self.path));
        if let Err(source) = written {
            let _ = fs::remove_file(&staging);
            return Err(BenchmarkError::Export {
                path: self.path.display().to_string(),
                source,
            });
        }
        info!("Wrote {} rows to {}", report.len(), self.path.display());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Keeps exported reports in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryExporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every report exported so far.
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ReportExporter for MemoryExporter {
    fn export(&self, report: &Report) -> BenchmarkResult<()> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        let names = vec!["A".to_string(), "B".to_string()];
        let rows = [(0usize, 1u8), (1, 4), (2, 7)]
            .iter()
            .map(|&(index, label)| ResultRow {
                sample_index: index,
                label,
                results: vec![
                    TimedResult {
                        backend_name: "A".to_string(),
                        load_time_ms: 12.346 + index as f64,
                        infer_time_ms: 0.5,
                        prediction: label,
                        correct: true,
                    },
                    TimedResult {
                        backend_name: "B".to_string(),
                        load_time_ms: 3.0,
                        infer_time_ms: 1.004,
                        prediction: (label + 1) % 10,
                        correct: false,
                    },
                ],
            })
            .collect();
        Report::new(names, rows).unwrap()
    }

    #[test]
    fn test_header_order() {
        assert_eq!(
            csv_header(&["A".to_string(), "B".to_string()]),
            "i,label,loadTimeA,loadTimeB,inferTimeA,inferTimeB,predictionA,predictionB,correctA,correctB"
        );
    }

    #[test]
    fn test_render_fixed_decimals() {
        let csv = render_csv(&report(), 2);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "0,1,12.35,3.00,0.50,1.00,1,2,true,false");
    }

    #[test]
    fn test_parse_roundtrip_within_precision() {
        let original = report();
        let parsed = parse_csv(&render_csv(&original, 2)).unwrap();

        assert_eq!(parsed.backend_names(), original.backend_names());
        assert_eq!(parsed.len(), original.len());
        for (p, o) in parsed.rows().iter().zip(original.rows()) {
            assert_eq!(p.sample_index, o.sample_index);
            assert_eq!(p.label, o.label);
            for (pr, or) in p.results.iter().zip(&o.results) {
                assert_eq!(pr.backend_name, or.backend_name);
                assert_eq!(pr.prediction, or.prediction);
                assert_eq!(pr.correct, or.correct);
                assert!((pr.load_time_ms - or.load_time_ms).abs() <= 0.005 + 1e-9);
                assert!((pr.infer_time_ms - or.infer_time_ms).abs() <= 0.005 + 1e-9);
            }
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_csv("").is_err());
        assert!(parse_csv("i,label,loadTimeA\n").is_err());
        assert!(parse_csv("i,label,loadTimeA,predictionA,inferTimeA,correctA\n").is_err());

        let header = "i,label,loadTimeA,inferTimeA,predictionA,correctA";
        assert!(matches!(
            parse_csv(&format!("{}\n0,1,1.00,2.00,1\n", header)),
            Err(BenchmarkError::ResultsParse { line: 2, .. })
        ));
        assert!(parse_csv(&format!("{}\n0,1,1.00,2.00,1,maybe\n", header)).is_err());
        assert_eq!(parse_csv(&format!("{}\n", header)).unwrap().len(), 0);
    }

    #[test]
    fn test_column_safe_names() {
        assert!(is_column_safe("Tf"));
        assert!(is_column_safe("packed_v2-cpu"));
        assert!(!is_column_safe(""));
        assert!(!is_column_safe("a,b"));
        assert!(!is_column_safe("a b"));
        assert!(!is_column_safe("é"));
    }

    #[test]
    fn test_csv_file_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvFileExporter::new(dir.path().join(DEFAULT_RESULTS_FILE), 2);
        exporter.export(&report()).unwrap();

        let parsed = read_results(exporter.path()).unwrap();
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_parse_reports_inconsistent_row_line() {
        let csv = "i,label,loadTimeA,inferTimeA,predictionA,correctA\n\
                   0,1,1.00,2.00,1,true\n\
                   1,4,1.00,2.00,3,true\n";
        assert!(matches!(
            parse_csv(csv),
            Err(BenchmarkError::ResultsParse { line: 3, .. })
        ));
    }

    #[test]
    fn test_export_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_RESULTS_FILE);
        fs::write(&path, "stale").unwrap();

        CsvFileExporter::new(&path, 2).export(&report()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), render_csv(&report(), 2));
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_failed_export_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_RESULTS_FILE);
        fs::create_dir(&path).unwrap();

        let result = CsvFileExporter::new(&path, 2).export(&report());

        assert!(matches!(result, Err(BenchmarkError::Export { .. })));
        assert!(path.is_dir());
        assert!(!staging_path(&path).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
