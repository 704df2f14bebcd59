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

use crate::config::SessionConfig;
use crate::derived::{self, CpuTicks};
use crate::error::SessionError;
use crate::metrics::{HardwareCounterKind, MetricKind, TimeUnit};
use crate::source::{
    Clock, CounterSource, MonotonicClock, PerfCounterSource, ProcFsStats, ProcessStats,
};
use crate::validate::validate;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// A configured measurement session.
///
/// Each `start()` must be followed by exactly one `stop()` before the next
/// `start()`. Violations are logged and leave the accumulated values
/// unspecified.
///
/// Most values accumulate across cycles until `reset()`. Memory total is
/// overwritten with the latest resident set size at every `stop()`, and the two
/// miss rates, average IPC and CPU utilization hold only the latest cycle's
/// observation. `average()` divides everything except those rates.
///
/// A session owns its hardware counters outright and is neither `Clone` nor
/// `Send`; it is meant to be driven from the single thread running the
/// benchmarked code.
pub struct Session {
    config: SessionConfig,
    counters: Option<Box<dyn CounterSource>>,
    stats: Box<dyn ProcessStats>,
    clock: Box<dyn Clock>,
    running: bool,

    start_time: Duration,
    time_count: Duration,
    average_ipc: f64,
    cpu_baseline: CpuTicks,

    /// Per configured metric. Only memory metrics use a start snapshot.
    metric_start: Vec<Option<f64>>,
    metric_count: Vec<f64>,

    /// Raw counts of the most recent cycle, and their running totals.
    counter_cycle: Vec<u64>,
    counter_count: Vec<u64>,

    custom_metrics: BTreeMap<String, String>,
}

impl Session {
    /// Create a session reading from the real system: perf events for hardware
    /// counters, `/proc` for process statistics.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        validate(&config.metrics, &config.counters)?;
        let counters = if config.counters.is_empty() {
            None
        } else {
            let source =
                PerfCounterSource::open(&config.counters).map_err(SessionError::CounterSource)?;
            Some(Box::new(source) as Box<dyn CounterSource>)
        };
        Ok(Self::from_parts(
            config,
            counters,
            Box::new(ProcFsStats),
            Box::new(MonotonicClock::new()),
        ))
    }

    /// Create a session over caller-provided sources. `counters` must have
    /// been opened for exactly `config.counters`, in that order; it is never
    /// touched if no counters are configured.
    pub fn with_sources(
        config: SessionConfig,
        counters: Box<dyn CounterSource>,
        stats: Box<dyn ProcessStats>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, SessionError> {
        validate(&config.metrics, &config.counters)?;
        Ok(Self::from_parts(config, Some(counters), stats, clock))
    }

    fn from_parts(
        config: SessionConfig,
        counters: Option<Box<dyn CounterSource>>,
        stats: Box<dyn ProcessStats>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let num_metrics = config.metrics.len();
        let num_counters = config.counters.len();
        let counters = counters.filter(|_| num_counters > 0);
        debug!(
            name = %config.name,
            metrics = ?config.metrics,
            counters = ?config.counters,
            "created measurement session"
        );
        Self {
            config,
            counters,
            stats,
            clock,
            running: false,
            start_time: Duration::ZERO,
            time_count: Duration::ZERO,
            average_ipc: 0.0,
            cpu_baseline: CpuTicks::default(),
            metric_start: vec![None; num_metrics],
            metric_count: vec![0.0; num_metrics],
            counter_cycle: vec![0; num_counters],
            counter_count: vec![0; num_counters],
            custom_metrics: BTreeMap::new(),
        }
    }

    /// Begin a measurement cycle.
    pub fn start(&mut self) {
        if self.running {
            warn!(name = %self.config.name, "start() called while already running; restarting cycle");
        }
        self.running = true;

        if let Some(counters) = self.counters.as_mut()
            && let Err(e) = counters.start()
        {
            warn!(error = %e, "could not start hardware counters; this cycle will read as zero");
        }

        let mut time_configured = false;
        for i in 0..self.config.metrics.len() {
            match self.config.metrics[i] {
                MetricKind::TimeElapsed => time_configured = true,
                MetricKind::MemoryDelta | MetricKind::MemoryTotal => {
                    self.metric_start[i] = self.resident_kb();
                }
                MetricKind::CpuUtilization => {
                    self.sample_cpu_utilization();
                }
                MetricKind::CacheMissRate
                | MetricKind::BranchMissRate
                | MetricKind::AverageIpc => {}
            }
        }

        // Last, so the session's own bookkeeping stays outside the timed region.
        if time_configured {
            self.start_time = self.clock.now();
        }
    }

    /// End the current cycle and fold its results into the accumulators.
    pub fn stop(&mut self) {
        let stopped_at = self.clock.now();
        if !self.running {
            warn!(name = %self.config.name, "stop() called without a matching start(); ignoring");
            return;
        }
        self.running = false;

        if let Some(counters) = self.counters.as_mut() {
            if let Err(e) = counters.read(&mut self.counter_cycle) {
                warn!(error = %e, "could not read hardware counters; counting this cycle as zero");
                self.counter_cycle.fill(0);
            }
            for (total, cycle) in self.counter_count.iter_mut().zip(&self.counter_cycle) {
                *total += *cycle;
            }
        }

        for i in 0..self.config.metrics.len() {
            match self.config.metrics[i] {
                MetricKind::TimeElapsed => {
                    self.time_count += stopped_at.saturating_sub(self.start_time);
                }
                MetricKind::MemoryDelta => {
                    let current = self.resident_kb();
                    if let (Some(start), Some(current)) = (self.metric_start[i], current) {
                        self.metric_count[i] += current - start;
                    }
                }
                MetricKind::MemoryTotal => {
                    self.metric_count[i] = self.resident_kb().unwrap_or(0.0);
                }
                MetricKind::CacheMissRate => {
                    self.metric_count[i] = derived::cache_miss_rate(
                        self.cycle_count(HardwareCounterKind::CacheMisses),
                        self.cycle_count(HardwareCounterKind::CacheReferences),
                    );
                }
                MetricKind::BranchMissRate => {
                    self.metric_count[i] = derived::branch_miss_rate(
                        self.cycle_count(HardwareCounterKind::BranchMisses),
                        self.cycle_count(HardwareCounterKind::BranchInstructions),
                    );
                }
                MetricKind::AverageIpc => {
                    self.average_ipc = derived::average_ipc(
                        self.cycle_count(HardwareCounterKind::Instructions),
                        self.cycle_count(HardwareCounterKind::CpuCycles),
                    );
                }
                MetricKind::CpuUtilization => {
                    self.metric_count[i] = self.sample_cpu_utilization();
                }
            }
        }
    }

    /// Divide every accumulated value, memory total included, by
    /// `iterations`. The miss rates, IPC and CPU utilization are left alone.
    pub fn average(&mut self, iterations: usize) -> Result<(), SessionError> {
        if iterations == 0 {
            return Err(SessionError::InvalidArgument(
                "cannot average over zero iterations".to_string(),
            ));
        }
        let per_cycle = self.time_count.as_nanos() / iterations as u128;
        self.time_count = Duration::from_nanos(u64::try_from(per_cycle).unwrap_or(u64::MAX));

        for (metric, count) in self.config.metrics.iter().zip(&mut self.metric_count) {
            if *metric != MetricKind::TimeElapsed && !metric.is_latest_observation() {
                *count /= iterations as f64;
            }
        }
        for total in &mut self.counter_count {
            *total /= iterations as u64;
        }
        Ok(())
    }

    /// Zero every accumulator and forget custom metrics. The configuration is kept.
    pub fn reset(&mut self) {
        self.start_time = Duration::ZERO;
        self.time_count = Duration::ZERO;
        self.average_ipc = 0.0;
        self.cpu_baseline = CpuTicks::default();
        self.metric_start.fill(None);
        self.metric_count.fill(0.0);
        self.counter_cycle.fill(0);
        self.counter_count.fill(0);
        self.custom_metrics.clear();
    }

    /// Attach an arbitrary value to subsequent reports. Replaces any previous
    /// value under the same name.
    pub fn add_custom_metric(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.custom_metrics.insert(name.into(), value.into());
    }

    pub fn remove_custom_metric(&mut self, name: &str) -> Option<String> {
        self.custom_metrics.remove(name)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_count(&self) -> Duration {
        self.time_count
    }

    pub fn time_count_in_unit(&self) -> u128 {
        self.config.time_unit.count(self.time_count)
    }

    pub fn average_ipc(&self) -> f64 {
        self.average_ipc
    }

    /// Current value of the first configured metric of `kind`. Elapsed time is
    /// given in the configured unit.
    pub fn metric_value(&self, kind: MetricKind) -> Option<f64> {
        let index = self.config.metrics.iter().position(|m| *m == kind)?;
        Some(self.value_at(index))
    }

    /// Accumulated total of a hardware counter since the last reset.
    pub fn counter_total(&self, kind: HardwareCounterKind) -> Option<u64> {
        let index = self.config.counters.iter().position(|c| *c == kind)?;
        Some(self.counter_count[index])
    }

    pub fn custom_metrics(&self) -> &BTreeMap<String, String> {
        &self.custom_metrics
    }

    /// Snapshot everything a report needs.
    pub fn observe(&self) -> Observation {
        Observation {
            name: self.config.name.clone(),
            time_unit: self.config.time_unit,
            time: self.time_count,
            metrics: self
                .config
                .metrics
                .iter()
                .enumerate()
                .map(|(i, &kind)| MetricValue {
                    kind,
                    value: self.value_at(i),
                })
                .collect(),
            counters: self
                .config
                .counters
                .iter()
                .zip(&self.counter_count)
                .map(|(&kind, &total)| CounterTotal { kind, total })
                .collect(),
            custom: self.custom_metrics.clone(),
        }
    }

    pub(crate) fn clock_now(&self) -> Duration {
        self.clock.now()
    }

    fn value_at(&self, index: usize) -> f64 {
        match self.config.metrics[index] {
            MetricKind::TimeElapsed => self.time_count_in_unit() as f64,
            MetricKind::AverageIpc => self.average_ipc,
            _ => self.metric_count[index],
        }
    }

    /// Raw count of `kind` in the most recent cycle.
    fn cycle_count(&self, kind: HardwareCounterKind) -> u64 {
        self.config
            .counters
            .iter()
            .position(|c| *c == kind)
            .map_or(0, |i| self.counter_cycle[i])
    }

    fn resident_kb(&self) -> Option<f64> {
        match self.stats.memory_usage() {
            Ok(usage) => Some(usage.resident_kb),
            Err(e) => {
                warn!(error = %e, "could not read process memory usage");
                None
            }
        }
    }

    fn sample_cpu_utilization(&mut self) -> f64 {
        match self.stats.cpu_ticks() {
            Ok(current) => {
                let (usage, baseline) = derived::cpu_utilization(self.cpu_baseline, current);
                self.cpu_baseline = baseline;
                usage
            }
            Err(e) => {
                warn!(error = %e, "could not read cpu ticks; reporting zero utilization");
                0.0
            }
        }
    }
}

/// An immutable copy of a session's reportable state.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub name: String,
    pub time_unit: TimeUnit,
    /// Accumulated (or averaged) elapsed time.
    pub time: Duration,
    /// One entry per configured metric, in configuration order.
    pub metrics: Vec<MetricValue>,
    /// One entry per configured hardware counter, in configuration order.
    pub counters: Vec<CounterTotal>,
    pub custom: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricValue {
    pub kind: MetricKind,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterTotal {
    pub kind: HardwareCounterKind,
    pub total: u64,
}

impl Observation {
    pub fn metric(&self, kind: MetricKind) -> Option<f64> {
        self.metrics.iter().find(|m| m.kind == kind).map(|m| m.value)
    }

    pub fn counter(&self, kind: HardwareCounterKind) -> Option<u64> {
        self.counters.iter().find(|c| c.kind == kind).map(|c| c.total)
    }
}
