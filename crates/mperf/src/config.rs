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

//! Session and benchmark-loop configuration. Both are plain serde structs so
//! they can be loaded from a config file and overridden from the command line.

use crate::error::ConfigError;
use crate::metrics::{HardwareCounterKind, MetricKind, TimeUnit};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SESSION_NAME: &str = "Mini Perf";
pub const DEFAULT_REPORT_NAME: &str = "Mini-Perf Report";
pub const DEFAULT_DELIMITER: &str = ",";

/// What a session measures. Fixed for the lifetime of the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub name: String,
    pub metrics: Vec<MetricKind>,
    /// Hardware counters, in the order they are reported.
    pub counters: Vec<HardwareCounterKind>,
    pub time_unit: TimeUnit,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_NAME.to_string(),
            metrics: vec![MetricKind::TimeElapsed],
            counters: vec![],
            time_unit: TimeUnit::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_metrics(self, metrics: impl Into<Vec<MetricKind>>) -> Self {
        Self {
            metrics: metrics.into(),
            ..self
        }
    }

    pub fn with_counters(self, counters: impl Into<Vec<HardwareCounterKind>>) -> Self {
        Self {
            counters: counters.into(),
            ..self
        }
    }

    pub fn with_time_unit(self, time_unit: TimeUnit) -> Self {
        Self { time_unit, ..self }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// One `name: value` line per metric.
    #[default]
    Verbose,
    /// One delimited row per report, with a header row for fresh files.
    Tabular,
}

/// Configuration of the benchmark loop that repeats a workload until a time
/// budget is spent, then reports the averaged result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Wall-clock budget per benchmark unit, in seconds.
    pub max_time_secs: f64,
    pub format: ReportFormat,
    pub report_path: Option<PathBuf>,
    pub to_stdout: bool,
    pub delimiter: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            max_time_secs: 1.0,
            format: ReportFormat::default(),
            report_path: None,
            to_stdout: true,
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl BenchConfig {
    /// The budget as a duration. Negative or non-finite budgets become zero,
    /// which still runs one iteration.
    pub fn budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_time_secs).unwrap_or(Duration::ZERO)
    }

    /// The tabular field delimiter as a byte.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::InvalidDelimiter(self.delimiter.clone())),
        }
    }
}
