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

//! Configuration-time checks that every requested metric can be computed.

use crate::error::ConfigError;
use crate::metrics::{HardwareCounterKind, MetricKind};
use std::str::FromStr;

/// Check that every derived metric in `metrics` has its hardware counters
/// present in `counters`. Order of either list is irrelevant; the first
/// unmet dependency is reported.
pub fn validate(
    metrics: &[MetricKind],
    counters: &[HardwareCounterKind],
) -> Result<(), ConfigError> {
    for &metric in metrics {
        let required = metric.required_counters();
        if !required.iter().all(|c| counters.contains(c)) {
            return Err(ConfigError::MissingDependency {
                metric,
                required: required.to_vec(),
            });
        }
    }
    Ok(())
}

/// Convert raw numeric metric ids into kinds.
pub fn parse_metric_ids(ids: &[u32]) -> Result<Vec<MetricKind>, ConfigError> {
    ids.iter()
        .map(|&id| {
            u8::try_from(id)
                .ok()
                .and_then(MetricKind::from_repr)
                .ok_or_else(|| ConfigError::UnknownMetric(id.to_string()))
        })
        .collect()
}

/// Convert metric names (`time_elapsed`, `cache_miss_rate`, ...) into kinds.
pub fn parse_metric_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<MetricKind>, ConfigError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref().trim();
            MetricKind::from_str(name).map_err(|_| ConfigError::UnknownMetric(name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use HardwareCounterKind::*;
    use test_case::test_case;

    #[test_case(MetricKind::CacheMissRate, &[CacheReferences, CacheMisses] ; "cache miss rate")]
    #[test_case(MetricKind::BranchMissRate, &[BranchInstructions, BranchMisses] ; "branch miss rate")]
    #[test_case(MetricKind::AverageIpc, &[CpuCycles, Instructions] ; "average ipc")]
    fn test_derived_metric_dependencies(metric: MetricKind, deps: &[HardwareCounterKind]) {
        // Satisfied in either order, and with extra counters around.
        assert_eq!(validate(&[metric], deps), Ok(()));
        let mut reversed = deps.to_vec();
        reversed.reverse();
        reversed.push(BusCycles);
        assert_eq!(validate(&[metric], &reversed), Ok(()));

        // Missing either dependency fails.
        for missing in deps {
            let partial: Vec<_> = deps.iter().copied().filter(|c| c != missing).collect();
            assert_eq!(
                validate(&[MetricKind::TimeElapsed, metric], &partial),
                Err(ConfigError::MissingDependency {
                    metric,
                    required: deps.to_vec(),
                })
            );
        }
    }

    #[test]
    fn test_simple_metrics_need_nothing() {
        let metrics = [
            MetricKind::TimeElapsed,
            MetricKind::MemoryDelta,
            MetricKind::MemoryTotal,
            MetricKind::CpuUtilization,
        ];
        assert_eq!(validate(&metrics, &[]), Ok(()));
    }

    #[test]
    fn test_first_unmet_dependency_is_reported() {
        let err = validate(
            &[MetricKind::BranchMissRate, MetricKind::CacheMissRate],
            &[CacheReferences],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingDependency {
                metric: MetricKind::BranchMissRate,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_metric_ids() {
        assert_eq!(
            parse_metric_ids(&[0, 6]),
            Ok(vec![MetricKind::TimeElapsed, MetricKind::CpuUtilization])
        );
        assert_eq!(
            parse_metric_ids(&[0, 7]),
            Err(ConfigError::UnknownMetric("7".to_string()))
        );
        assert_eq!(
            parse_metric_ids(&[300]),
            Err(ConfigError::UnknownMetric("300".to_string()))
        );
    }

    #[test]
    fn test_unknown_metric_names() {
        assert_eq!(
            parse_metric_names(&["time_elapsed", " memory_total "]),
            Ok(vec![MetricKind::TimeElapsed, MetricKind::MemoryTotal])
        );
        assert_eq!(
            parse_metric_names(&["latency"]),
            Err(ConfigError::UnknownMetric("latency".to_string()))
        );
    }
}
