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

//! The catalogue of everything a session can measure: the simple metrics, the
//! hardware counters they may depend on, and the units elapsed time is
//! reported in.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// A metric a session computes itself, either from the clock and process
/// statistics or derived from hardware counters.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    FromRepr,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Wall-clock time spent between `start` and `stop`.
    TimeElapsed = 0,
    /// Resident memory allocated between `start` and `stop`.
    MemoryDelta = 1,
    /// Total resident memory of the process when stopped.
    MemoryTotal = 2,
    CacheMissRate = 3,
    BranchMissRate = 4,
    AverageIpc = 5,
    CpuUtilization = 6,
}

impl MetricKind {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MetricKind::TimeElapsed => "Running Time",
            MetricKind::MemoryDelta => "Memory Count",
            MetricKind::MemoryTotal => "Memory Total",
            MetricKind::CacheMissRate => "Cache Miss Rate",
            MetricKind::BranchMissRate => "Branch Miss Rate",
            MetricKind::AverageIpc => "Average IPC",
            MetricKind::CpuUtilization => "CPU Utilization",
        }
    }

    /// The fixed unit of this metric. Elapsed time has no fixed unit: it is
    /// reported in whatever [`TimeUnit`] the session was configured with.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            MetricKind::MemoryDelta | MetricKind::MemoryTotal => Some("KB"),
            MetricKind::CacheMissRate
            | MetricKind::BranchMissRate
            | MetricKind::CpuUtilization => Some("%"),
            MetricKind::TimeElapsed | MetricKind::AverageIpc => None,
        }
    }

    /// Hardware counters that must be requested alongside this metric.
    pub fn required_counters(self) -> &'static [HardwareCounterKind] {
        match self {
            MetricKind::CacheMissRate => &[
                HardwareCounterKind::CacheReferences,
                HardwareCounterKind::CacheMisses,
            ],
            MetricKind::BranchMissRate => &[
                HardwareCounterKind::BranchInstructions,
                HardwareCounterKind::BranchMisses,
            ],
            MetricKind::AverageIpc => &[
                HardwareCounterKind::CpuCycles,
                HardwareCounterKind::Instructions,
            ],
            _ => &[],
        }
    }

    /// Whether the stored value is a rate from the latest single cycle rather
    /// than an accumulated quantity. Averaging leaves these alone.
    pub fn is_latest_observation(self) -> bool {
        matches!(
            self,
            MetricKind::CacheMissRate
                | MetricKind::BranchMissRate
                | MetricKind::AverageIpc
                | MetricKind::CpuUtilization
        )
    }
}

/// Generalized hardware events, numbered as the kernel's `PERF_COUNT_HW_*`.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    FromRepr,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HardwareCounterKind {
    CpuCycles = 0,
    Instructions = 1,
    CacheReferences = 2,
    CacheMisses = 3,
    BranchInstructions = 4,
    BranchMisses = 5,
    BusCycles = 6,
    StalledCyclesFrontend = 7,
    StalledCyclesBackend = 8,
    RefCpuCycles = 9,
}

impl HardwareCounterKind {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HardwareCounterKind::CpuCycles => "CPU Cycles",
            HardwareCounterKind::Instructions => "Instructions",
            HardwareCounterKind::CacheReferences => "Cache References",
            HardwareCounterKind::CacheMisses => "Cache Misses",
            HardwareCounterKind::BranchInstructions => "Branch Instructions",
            HardwareCounterKind::BranchMisses => "Branch Misses",
            HardwareCounterKind::BusCycles => "Bus Cycles",
            HardwareCounterKind::StalledCyclesFrontend => "Stalled Cycles Frontend",
            HardwareCounterKind::StalledCyclesBackend => "Stalled Cycles Backend",
            HardwareCounterKind::RefCpuCycles => "Ref CPU Cycles",
        }
    }
}

/// Unit elapsed time is converted to for reporting.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Hours,
    Minutes,
    Seconds,
    #[default]
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Hours => "h",
            TimeUnit::Minutes => "min",
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
            TimeUnit::Nanoseconds => "ns",
        }
    }

    /// Number of whole units in `duration`, truncating any remainder.
    pub fn count(self, duration: Duration) -> u128 {
        let nanos = duration.as_nanos();
        match self {
            TimeUnit::Hours => nanos / 3_600_000_000_000,
            TimeUnit::Minutes => nanos / 60_000_000_000,
            TimeUnit::Seconds => nanos / 1_000_000_000,
            TimeUnit::Milliseconds => nanos / 1_000_000,
            TimeUnit::Microseconds => nanos / 1_000,
            TimeUnit::Nanoseconds => nanos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    #[test]
    fn test_ids_round_trip_through_repr() {
        for kind in MetricKind::iter() {
            assert_eq!(MetricKind::from_repr(kind.id()), Some(kind));
        }
        assert_eq!(MetricKind::from_repr(7), None);
        assert_eq!(
            HardwareCounterKind::from_repr(9),
            Some(HardwareCounterKind::RefCpuCycles)
        );
        assert_eq!(HardwareCounterKind::from_repr(10), None);
    }

    #[test]
    fn test_metric_names_parse() {
        assert_eq!(
            MetricKind::from_str("average_ipc").unwrap(),
            MetricKind::AverageIpc
        );
        assert_eq!(
            HardwareCounterKind::from_str("stalled_cycles_frontend").unwrap(),
            HardwareCounterKind::StalledCyclesFrontend
        );
        assert!(MetricKind::from_str("throughput").is_err());
    }

    #[test]
    fn test_only_derived_metrics_have_dependencies() {
        for kind in MetricKind::iter() {
            let derived = matches!(
                kind,
                MetricKind::CacheMissRate | MetricKind::BranchMissRate | MetricKind::AverageIpc
            );
            assert_eq!(!kind.required_counters().is_empty(), derived, "{kind:?}");
        }
    }

    #[test_case(TimeUnit::Hours, 7_200_000_000_001, 2 ; "hours")]
    #[test_case(TimeUnit::Minutes, 119_999_999_999, 1 ; "minutes truncate")]
    #[test_case(TimeUnit::Seconds, 2_500_000_000, 2 ; "seconds")]
    #[test_case(TimeUnit::Milliseconds, 1_999_999, 1 ; "milliseconds")]
    #[test_case(TimeUnit::Microseconds, 1_500, 1 ; "microseconds")]
    #[test_case(TimeUnit::Nanoseconds, 42, 42 ; "nanoseconds")]
    fn test_time_unit_count(unit: TimeUnit, nanos: u64, expected: u128) {
        assert_eq!(unit.count(Duration::from_nanos(nanos)), expected);
    }
}
