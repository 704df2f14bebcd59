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

use crate::metrics::{HardwareCounterKind, MetricKind};
use thiserror::Error;

/// A session was configured with metrics it cannot compute.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
    #[error("{} requires hardware counters {:?}", .metric.display_name(), .required)]
    MissingDependency {
        metric: MetricKind,
        required: Vec<HardwareCounterKind>,
    },
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(String),
}

/// Failure reading from the OS: perf counters, `/proc` or the like.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse {path}: {reason}")]
    Parse { path: &'static str, reason: String },
    #[error("Hardware counters are not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session configuration")]
    Config(#[from] ConfigError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Could not open hardware counters")]
    CounterSource(#[source] SourceError),
    #[error("Could not write report")]
    Report(#[source] std::io::Error),
}
