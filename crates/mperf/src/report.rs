// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Rendering observations as a verbose `name: value` report, or as CSV rows
//! for appending to a growing log.
//!
//! Tabular layout: `Perf Name`, `Report Name`, `Report Time`, then each
//! configured metric, each hardware counter total and each custom metric.
//! Every field is followed by the delimiter and every row ends with a line
//! break. The header row is written only when the destination file is empty.

use crate::config::DEFAULT_REPORT_NAME;
use crate::metrics::MetricKind;
use crate::session::{MetricValue, Observation};
use crate::source::get_time;
use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};

const SEPARATOR: &str = "----------------------------------------";

/// Where reports go. Files are opened in append mode for the duration of a
/// single report and closed before it returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportTarget {
    pub to_stdout: bool,
    pub file: Option<PathBuf>,
}

impl ReportTarget {
    pub fn stdout() -> Self {
        Self {
            to_stdout: true,
            file: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            to_stdout: false,
            file: Some(path.into()),
        }
    }

    pub fn stdout_and_file(path: impl Into<PathBuf>) -> Self {
        Self {
            to_stdout: true,
            file: Some(path.into()),
        }
    }
}

impl Default for ReportTarget {
    fn default() -> Self {
        Self::stdout()
    }
}

fn metric_unit(observation: &Observation, kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::TimeElapsed => observation.time_unit.suffix(),
        _ => kind.unit().unwrap_or(""),
    }
}

fn format_value(observation: &Observation, metric: &MetricValue) -> String {
    match metric.kind {
        MetricKind::TimeElapsed => observation.time_unit.count(observation.time).to_string(),
        _ => format!("{:.6}", metric.value),
    }
}

/// Write the verbose report: three header lines, then one line per metric,
/// hardware counter and custom metric.
pub fn write_verbose(
    out: &mut impl Write,
    observation: &Observation,
    report_name: &str,
    report_time: &str,
) -> io::Result<()> {
    writeln!(out, "Perf Name: {}", observation.name)?;
    writeln!(out, "Report Name: {report_name}")?;
    writeln!(out, "Report Time: {report_time}")?;
    for metric in &observation.metrics {
        writeln!(
            out,
            "{}: {}{}",
            metric.kind.display_name(),
            format_value(observation, metric),
            metric_unit(observation, metric.kind)
        )?;
    }
    for counter in &observation.counters {
        writeln!(out, "{}: {}", counter.kind.display_name(), counter.total)?;
    }
    for (name, value) in &observation.custom {
        writeln!(out, "{name}: {value}")?;
    }
    Ok(())
}

fn header_fields(observation: &Observation) -> Vec<String> {
    let mut fields: Vec<String> = ["Perf Name", "Report Name", "Report Time"]
        .into_iter()
        .map(String::from)
        .collect();
    for metric in &observation.metrics {
        let name = metric.kind.display_name();
        fields.push(match metric_unit(observation, metric.kind) {
            "" => name.to_string(),
            unit => format!("{name}({unit})"),
        });
    }
    fields.extend(
        observation
            .counters
            .iter()
            .map(|c| c.kind.display_name().to_string()),
    );
    fields.extend(observation.custom.keys().cloned());
    fields
}

fn row_fields(observation: &Observation, report_name: &str, report_time: &str) -> Vec<String> {
    let mut fields = vec![
        observation.name.clone(),
        report_name.to_string(),
        report_time.to_string(),
    ];
    fields.extend(
        observation
            .metrics
            .iter()
            .map(|m| format_value(observation, m)),
    );
    fields.extend(observation.counters.iter().map(|c| c.total.to_string()));
    fields.extend(observation.custom.values().cloned());
    fields
}

/// Write one tabular row, preceded by the header row if `with_header`.
///
/// Fields containing the delimiter, quotes or line breaks are quoted. A
/// trailing empty field keeps the delimiter after the last column.
pub fn write_tabular(
    out: impl Write,
    observation: &Observation,
    report_name: &str,
    report_time: &str,
    delimiter: u8,
    with_header: bool,
) -> io::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    if with_header {
        let mut header = header_fields(observation);
        header.push(String::new());
        writer.write_record(&header)?;
    }
    let mut row = row_fields(observation, report_name, report_time);
    row.push(String::new());
    writer.write_record(&row)?;
    writer.flush()
}

fn append_to(path: &Path, text: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text)
}

/// Writes observations to a [`ReportTarget`] under a fixed report name.
#[derive(Clone, Debug)]
pub struct Reporter {
    report_name: String,
    target: ReportTarget,
    delimiter: u8,
    /// Set once a tabular header has gone to stdout without a file target.
    stdout_header_written: Cell<bool>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_NAME)
    }
}

impl Reporter {
    pub fn new(report_name: impl Into<String>) -> Self {
        Self {
            report_name: report_name.into(),
            target: ReportTarget::default(),
            delimiter: b',',
            stdout_header_written: Cell::new(false),
        }
    }

    pub fn with_target(self, target: ReportTarget) -> Self {
        Self { target, ..self }
    }

    pub fn with_delimiter(self, delimiter: u8) -> Self {
        Self { delimiter, ..self }
    }

    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    pub fn set_report_name(&mut self, report_name: &str) {
        self.report_name = report_name.to_string();
    }

    pub fn verbose(&self, observation: &Observation) -> io::Result<()> {
        self.verbose_at(observation, &get_time())
    }

    pub fn verbose_at(&self, observation: &Observation, report_time: &str) -> io::Result<()> {
        let mut text = Vec::new();
        write_verbose(&mut text, observation, &self.report_name, report_time)?;
        self.emit(&text)
    }

    /// The verbose report between separator lines, preceded by the source
    /// location it was requested from.
    #[track_caller]
    pub fn framed_verbose(&self, observation: &Observation) -> io::Result<()> {
        let mut text = frame_opening(Location::caller()).into_bytes();
        write_verbose(&mut text, observation, &self.report_name, &get_time())?;
        writeln!(text, "{SEPARATOR}")?;
        self.emit(&text)
    }

    pub fn tabular(&self, observation: &Observation) -> io::Result<()> {
        self.tabular_at(observation, &get_time())
    }

    /// Append one row. A header row precedes it if the destination file is
    /// currently empty. Without a file, stdout gets the header once per
    /// reporter.
    pub fn tabular_at(&self, observation: &Observation, report_time: &str) -> io::Result<()> {
        let mut text = Vec::new();
        match &self.target.file {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                let with_header = file.metadata()?.len() == 0;
                write_tabular(
                    &mut text,
                    observation,
                    &self.report_name,
                    report_time,
                    self.delimiter,
                    with_header,
                )?;
                file.write_all(&text)?;
            }
            None if self.target.to_stdout => {
                let with_header = !self.stdout_header_written.replace(true);
                write_tabular(
                    &mut text,
                    observation,
                    &self.report_name,
                    report_time,
                    self.delimiter,
                    with_header,
                )?;
            }
            None => return Ok(()),
        }
        if self.target.to_stdout {
            print_stdout(&text)?;
        }
        Ok(())
    }

    /// Like [`Reporter::tabular`], with the separator and caller location
    /// printed around the stdout copy only, so the file stays a clean table.
    #[track_caller]
    pub fn framed_tabular(&self, observation: &Observation) -> io::Result<()> {
        let opening = frame_opening(Location::caller());
        if self.target.to_stdout {
            print_stdout(opening.as_bytes())?;
        }
        self.tabular(observation)?;
        if self.target.to_stdout {
            print_stdout(format!("{SEPARATOR}\n").as_bytes())?;
        }
        Ok(())
    }

    fn emit(&self, text: &[u8]) -> io::Result<()> {
        if self.target.to_stdout {
            print_stdout(text)?;
        }
        if let Some(path) = &self.target.file {
            append_to(path, text)?;
        }
        Ok(())
    }
}

fn frame_opening(caller: &Location<'_>) -> String {
    format!(
        "{SEPARATOR}\nReport at {}: Line {}\n",
        caller.file(),
        caller.line()
    )
}

fn print_stdout(text: &[u8]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text)?;
    stdout.flush()
}
