//! Report layouts and timestamp formatters for CLI output.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};

use crate::domain::models::DisplayTimezone;

/// Presentation format selected with `--fmt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// `%Tf`: one row per record under aligned column headers.
    #[default]
    Table,
    /// `%Mf`: one `header : value` line per field, records between borders.
    Multiline,
    /// `%Nf`: one line of `header : value` pairs per record.
    NameValue,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "%Tf" => Ok(Self::Table),
            "%Mf" => Ok(Self::Multiline),
            "%Nf" => Ok(Self::NameValue),
            other => Err(format!("unknown format {other}, expected %Tf, %Mf or %Nf")),
        }
    }
}

const BORDER_WIDTH: usize = 50;

/// Column-aligned report of string records.
///
/// The first column is right-aligned in table layout, the rest left-aligned,
/// columns separated by two spaces.
#[derive(Debug, Clone)]
pub struct Report {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    preamble: Vec<String>,
    show_headers: bool,
}

impl Report {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            preamble: Vec::new(),
            show_headers: true,
        }
    }

    /// Line printed before the records, such as `Instance: <id>`.
    pub fn preamble(mut self, line: impl Into<String>) -> Self {
        self.preamble.push(line.into());
        self
    }

    pub fn show_headers(mut self, show: bool) -> Self {
        self.show_headers = show;
        self
    }

    pub fn row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }

    fn table_line(cells: &[String], widths: &[usize]) -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i == 0 {
                    format!("{cell:>w$}")
                } else {
                    format!("{cell:<w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }

    pub fn render(&self, format: ReportFormat) -> String {
        let widths = self.widths();
        let mut lines: Vec<String> = Vec::new();

        match format {
            ReportFormat::Table => {
                lines.extend(self.preamble.iter().cloned());
                if self.show_headers {
                    lines.push(Self::table_line(&self.headers, &widths));
                }
                lines.extend(self.rows.iter().map(|row| Self::table_line(row, &widths)));
            }
            ReportFormat::Multiline => {
                let border = "=".repeat(BORDER_WIDTH);
                if !self.preamble.is_empty() {
                    lines.push(border.clone());
                    lines.extend(self.preamble.iter().cloned());
                }
                let w1 = self.headers.iter().map(|h| h.chars().count()).max().unwrap_or(0);
                let w2 = widths.iter().copied().max().unwrap_or(0);
                for row in &self.rows {
                    lines.push(border.clone());
                    lines.extend(
                        self.headers
                            .iter()
                            .zip(row)
                            .map(|(header, value)| format!("{header:w1$}  :  {value:<w2$}")),
                    );
                }
                lines.push(border);
            }
            ReportFormat::NameValue => {
                lines.extend(self.rows.iter().map(|row| {
                    self.headers
                        .iter()
                        .zip(row)
                        .map(|(header, value)| format!("{header}  :  {value} "))
                        .collect::<String>()
                }));
            }
        }

        lines.join("\n")
    }
}

/// Convert a UTC instant into the configured display timezone.
pub fn localize(instant: DateTime<Utc>, tz: DisplayTimezone) -> DateTime<FixedOffset> {
    match tz {
        DisplayTimezone::Local => instant.with_timezone(&Local).fixed_offset(),
        DisplayTimezone::Utc => instant.fixed_offset(),
        DisplayTimezone::Fixed(offset) => instant.with_timezone(&offset),
    }
}

/// ISO 8601 rendering of a millisecond epoch timestamp, at second precision.
pub fn iso_timestamp(epoch_ms: i64, tz: DisplayTimezone) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| localize(dt, tz).to_rfc3339_opts(SecondsFormat::Secs, false))
        .unwrap_or_default()
}

/// strftime rendering of a millisecond epoch timestamp.
pub fn format_timestamp(epoch_ms: i64, tz: DisplayTimezone, pattern: &str) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| localize(dt, tz).format(pattern).to_string())
        .unwrap_or_default()
}

/// Current time as shown by `--showtimestamp`.
pub fn now_timestamp(tz: DisplayTimezone) -> String {
    localize(Utc::now(), tz).to_rfc3339_opts(SecondsFormat::Secs, false)
}
