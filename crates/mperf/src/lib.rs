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

//! Lightweight instrumentation for micro benchmarks
//!
//! Bracket a region of code with [`Session::start`] and [`Session::stop`] and
//! this crate accumulates:
//! - Elapsed time in a configurable unit
//! - Resident memory growth and the latest resident set size
//! - Hardware counters through perf events (Linux only), plus the cache miss
//!   rate, branch miss rate and IPC derived from them
//! - Process CPU utilization relative to the whole system
//!
//! Results are reported as `name: value` lines or as delimited rows appended
//! to a log file. [`BenchRunner`] repeats a workload for a time budget and
//! reports the per-iteration averages.

pub mod bench;
pub mod config;
pub mod derived;
pub mod error;
pub mod metrics;
pub mod report;
pub mod session;
pub mod source;
pub mod validate;

pub use bench::{BenchOutcome, BenchRunner};
pub use config::{BenchConfig, ReportFormat, SessionConfig};
pub use error::{ConfigError, SessionError, SourceError};
pub use metrics::{HardwareCounterKind, MetricKind, TimeUnit};
pub use report::{ReportTarget, Reporter};
pub use session::{CounterTotal, MetricValue, Observation, Session};
pub use source::get_time;
pub use validate::{parse_metric_ids, parse_metric_names, validate};

pub use std::hint::black_box;
