//! Delimited-text spreadsheets
//!
//! Uploads are read into a [`Table`]. A table with exactly two columns whose
//! second column is numeric is charted directly; anything else is handed to
//! the interpreter as text.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::chart::ChartType;
use crate::classify::chart_type::LINE_CHART_MIN_POINTS;
use crate::error::{ChartError, ChartResult};
use crate::patterns::{matches_any, CATEGORY_INDICATORS, TIME_INDICATORS};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Period shapes that only show up in tabular labels: 2024-01, jan-2024,
/// q1-2024, 2024 q1.
static PERIOD_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{4}-\d{2}",
        r"(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[-\s]?\d{2,4}",
        r"q[1-4][-\s]?\d{2,4}",
        r"\d{4}[-\s]?q[1-4]",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("period shape pattern"))
    .collect()
});

static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("four digit pattern"));

/// Reject uploads by extension and size before reading them.
pub fn check_upload(filename: &str, size: u64) -> ChartResult<()> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ChartError::UnsupportedFile(filename.to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ChartError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Chart data read straight off a two-column table.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedChart {
    pub x_labels: Vec<String>,
    pub y_values: Vec<f64>,
    pub x_label: String,
    pub y_label: String,
    pub chart_type: ChartType,
}

impl Table {
    /// Parse delimited text with a header row. The delimiter (tab, semicolon
    /// or comma) is sniffed from the header line.
    pub fn parse(bytes: &[u8]) -> ChartResult<Self> {
        let delimiter = sniff_delimiter(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!(
            "Parsed table with {} columns and {} rows (delimiter {:?})",
            headers.len(),
            rows.len(),
            delimiter as char
        );
        Ok(Self { headers, rows })
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or("")
    }

    /// First column as labels, second as values, when the table has exactly
    /// two columns and every non-empty value cell is a finite number. Rows with
    /// an empty value are skipped.
    pub fn auto_detect(&self, filename: &str) -> Option<DetectedChart> {
        if self.column_count() != 2 || self.rows.is_empty() {
            return None;
        }

        let mut x_labels = Vec::with_capacity(self.rows.len());
        let mut y_values = Vec::with_capacity(self.rows.len());
        for row in 0..self.rows.len() {
            let value = self.cell(row, 1);
            if value.is_empty() {
                continue;
            }
            let value = value.parse::<f64>().ok().filter(|v| v.is_finite())?;
            x_labels.push(self.cell(row, 0).to_string());
            y_values.push(value);
        }
        if x_labels.is_empty() {
            return None;
        }

        let chart_type = suggest_chart_type(&x_labels, filename, &self.headers[0]);
        Some(DetectedChart {
            x_labels,
            y_values,
            x_label: self.headers[0].clone(),
            y_label: self.headers[1].clone(),
            chart_type,
        })
    }

    /// Text form handed to the interpreter. Two-column tables become
    /// `label = value` lines so the data extractor can read them.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!(
                "Spreadsheet contains {} rows and {} columns.",
                self.row_count(),
                self.column_count()
            ),
            format!("Columns: {}", self.headers.join(", ")),
            String::new(),
            "Data:".to_string(),
        ];

        if self.column_count() == 2 {
            for row in 0..self.rows.len() {
                lines.push(format!("{} = {}", self.cell(row, 0), self.cell(row, 1)));
            }
        } else {
            lines.push(self.headers.join("\t"));
            for row in &self.rows {
                lines.push(row.join("\t"));
            }
        }

        lines.join("\n")
    }
}

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    if header.contains(&b'\t') {
        return b'\t';
    }
    let semicolons = header.iter().filter(|&&b| b == b';').count();
    let commas = header.iter().filter(|&&b| b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Line or bar for tabular data, judged from the filename, the label
/// column's header and the labels themselves.
pub fn suggest_chart_type(labels: &[String], filename: &str, x_column: &str) -> ChartType {
    let all_text = format!("{} {} {}", filename, x_column, labels.join(" ")).to_lowercase();

    if matches_any(&TIME_INDICATORS, &all_text) || matches_any(&PERIOD_SHAPES, &all_text) {
        return ChartType::Line;
    }

    if labels.len() >= 3 {
        let years: Vec<i64> = labels[..3]
            .iter()
            .filter_map(|label| FOUR_DIGITS.find(label))
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        if years.len() >= 2 && years.windows(2).all(|w| w[1] - w[0] == 1) {
            return ChartType::Line;
        }
    }

    if labels.len() >= LINE_CHART_MIN_POINTS {
        return ChartType::Line;
    }

    if matches_any(&CATEGORY_INDICATORS, &all_text) {
        return ChartType::Bar;
    }

    ChartType::Bar
}
