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

//! Repeat a workload under measurement until a time budget is spent.

use crate::config::{BenchConfig, ReportFormat};
use crate::error::{ConfigError, SessionError};
use crate::report::{ReportTarget, Reporter};
use crate::session::{Observation, Session};
use std::time::Duration;
use tracing::{debug, info};

impl Session {
    /// Measure a single run of `workload`. Results accumulate onto whatever the
    /// session already holds.
    pub fn run_cycle(&mut self, workload: impl FnOnce()) -> Observation {
        self.start();
        workload();
        self.stop();
        self.observe()
    }

    /// Run measured cycles until the time spent inside them exceeds `budget`,
    /// then average over the number of cycles run. At least one cycle always
    /// runs, so a zero budget measures exactly once.
    pub fn run_until(
        &mut self,
        budget: Duration,
        mut workload: impl FnMut(),
    ) -> Result<(usize, Observation), SessionError> {
        let mut iterations = 0;
        let mut spent = Duration::ZERO;
        loop {
            let began = self.clock_now();
            self.start();
            workload();
            self.stop();
            spent += self.clock_now().saturating_sub(began);
            iterations += 1;
            if spent > budget {
                break;
            }
        }
        debug!(name = %self.name(), iterations, ?spent, "benchmark loop finished");
        self.average(iterations)?;
        Ok((iterations, self.observe()))
    }
}

/// The result of one benchmark unit, captured before the session is reset.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchOutcome {
    pub iterations: usize,
    pub observation: Observation,
}

/// Runs named benchmark units against a session and reports each one.
///
/// All units share one reporter, so a stdout-only tabular log gets a single
/// header row.
pub struct BenchRunner {
    config: BenchConfig,
    reporter: Reporter,
}

impl BenchRunner {
    pub fn new(config: BenchConfig) -> Result<Self, ConfigError> {
        let target = ReportTarget {
            to_stdout: config.to_stdout,
            file: config.report_path.clone(),
        };
        let reporter = Reporter::default()
            .with_target(target)
            .with_delimiter(config.delimiter_byte()?);
        Ok(Self { config, reporter })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run `workload` until the configured budget is spent, report the
    /// per-iteration averages under `report_name`, then reset `session` for
    /// the next unit. Reports are framed with the caller's location.
    #[track_caller]
    pub fn run(
        &mut self,
        session: &mut Session,
        report_name: &str,
        workload: impl FnMut(),
    ) -> Result<BenchOutcome, SessionError> {
        let (iterations, observation) = session.run_until(self.config.budget(), workload)?;
        info!("Micro Benchmark Iterations: {iterations}");

        self.reporter.set_report_name(report_name);
        let reported = match self.config.format {
            ReportFormat::Verbose => self.reporter.framed_verbose(&observation),
            ReportFormat::Tabular => self.reporter.framed_tabular(&observation),
        };
        session.reset();
        reported.map_err(SessionError::Report)?;

        Ok(BenchOutcome {
            iterations,
            observation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::metrics::{HardwareCounterKind, MetricKind, TimeUnit};
    use crate::source::mock::{MockCounters, MockStats, StepClock};

    fn session(metrics: &[MetricKind], counters: &[HardwareCounterKind], readings: usize) -> Session {
        let config = SessionConfig::default()
            .with_name("Bench")
            .with_metrics(metrics)
            .with_counters(counters)
            .with_time_unit(TimeUnit::Microseconds);
        Session::with_sources(
            config,
            Box::new(MockCounters::new(vec![vec![1_000, 3_000]; readings])),
            Box::new(MockStats::new()),
            Box::new(StepClock::new(Duration::from_millis(1))),
        )
        .unwrap()
    }

    #[test]
    fn test_run_cycle_accumulates() {
        let mut s = session(&[MetricKind::TimeElapsed], &[], 0);
        let mut runs = 0;
        s.run_cycle(|| runs += 1);
        let observation = s.run_cycle(|| runs += 1);
        assert_eq!(runs, 2);
        assert_eq!(observation.time, Duration::from_millis(2));
    }

    #[test]
    fn test_zero_budget_runs_once() {
        let mut s = session(&[MetricKind::TimeElapsed], &[], 0);
        let mut runs = 0;
        let (iterations, observation) = s.run_until(Duration::ZERO, || runs += 1).unwrap();
        assert_eq!(iterations, 1);
        assert_eq!(runs, 1);
        assert_eq!(observation.time, Duration::from_millis(1));
    }

    #[test]
    fn test_run_until_averages_over_iterations() {
        // Each cycle reads the clock four times: around the cycle, and inside
        // start and stop. That is 3ms spent per cycle against a 10ms budget.
        let mut s = session(
            &[MetricKind::TimeElapsed, MetricKind::AverageIpc],
            &[HardwareCounterKind::CpuCycles, HardwareCounterKind::Instructions],
            8,
        );
        let (iterations, observation) = s.run_until(Duration::from_millis(10), || {}).unwrap();
        assert_eq!(iterations, 4);
        assert_eq!(observation.time, Duration::from_millis(1));
        assert_eq!(observation.counter(HardwareCounterKind::CpuCycles), Some(1_000));
        assert_eq!(observation.counter(HardwareCounterKind::Instructions), Some(3_000));
        assert_eq!(observation.metric(MetricKind::AverageIpc), Some(3.0));
    }

    #[test]
    fn test_runner_reports_then_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        let mut runner = BenchRunner::new(BenchConfig {
            max_time_secs: 0.0,
            format: ReportFormat::Tabular,
            report_path: Some(path.clone()),
            to_stdout: false,
            ..BenchConfig::default()
        })
        .unwrap();

        let mut s = session(&[MetricKind::TimeElapsed], &[], 0);
        s.add_custom_metric("size", "64");
        let outcome = runner.run(&mut s, "first", || {}).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.observation.custom.get("size").map(String::as_str), Some("64"));
        assert_eq!(s.time_count(), Duration::ZERO);
        assert!(s.custom_metrics().is_empty());

        runner.run(&mut s, "second", || {}).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Perf Name,Report Name,Report Time,Running Time(us),size,");
        assert!(lines[1].starts_with("Bench,first,"));
        // The second unit has no custom metric, so its row is one field shorter.
        assert!(lines[2].starts_with("Bench,second,"));
        assert!(lines[2].ends_with(",1000,"));
    }

    #[test]
    fn test_runner_frames_verbose_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.log");
        let mut runner = BenchRunner::new(BenchConfig {
            max_time_secs: 0.0,
            report_path: Some(path.clone()),
            to_stdout: false,
            ..BenchConfig::default()
        })
        .unwrap();

        let mut s = session(&[MetricKind::TimeElapsed], &[], 0);
        let line = line!() + 1;
        runner.run(&mut s, "framed", || {}).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "-".repeat(40));
        assert_eq!(lines[1], format!("Report at {}: Line {line}", file!()));
        assert_eq!(lines[2], "Perf Name: Bench");
        assert_eq!(lines[3], "Report Name: framed");
        assert_eq!(*lines.last().unwrap(), "-".repeat(40));
    }

    #[test]
    fn test_runner_rejects_multi_byte_delimiter() {
        let config = BenchConfig {
            delimiter: "::".to_string(),
            ..BenchConfig::default()
        };
        assert!(matches!(
            BenchRunner::new(config),
            Err(ConfigError::InvalidDelimiter(_))
        ));
    }
}
