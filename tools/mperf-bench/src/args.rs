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

use crate::workload::Workload;
use clap_derive::{Parser, ValueEnum};
use eyre::eyre;
use figment::Figment;
use figment::providers::{Format as ProviderFormat, Serialized, Yaml};
use mperf::{
    BenchConfig, HardwareCounterKind, MetricKind, ReportFormat, SessionConfig, TimeUnit,
    parse_metric_ids,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Everything a run needs, as loaded from the optional YAML config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub bench: BenchConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Verbose,
    Tabular,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Verbose => ReportFormat::Verbose,
            FormatArg::Tabular => ReportFormat::Tabular,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    #[arg(
        long,
        value_name = "config",
        help = "Yaml config file to use. Command line values override values in the file"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(long, help = "Name of the measured session, printed as `Perf Name`")]
    pub name: Option<String>,

    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_metric,
        help = "Metrics to measure, by name (time_elapsed, memory_delta, ...) or numeric id"
    )]
    pub metrics: Option<Vec<MetricKind>>,

    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_counter,
        help = "Hardware counters to read (cpu_cycles, instructions, cache_misses, ...)"
    )]
    pub counters: Option<Vec<HardwareCounterKind>>,

    #[arg(
        long,
        value_parser = parse_time_unit,
        help = "Unit for elapsed time: hours, minutes, seconds, milliseconds, microseconds or nanoseconds"
    )]
    pub time_unit: Option<TimeUnit>,

    #[arg(long, help = "Time budget per workload, in seconds")]
    pub max_time: Option<f64>,

    #[arg(long, value_enum, help = "Report format")]
    pub format: Option<FormatArg>,

    #[arg(long, help = "Append reports to this file")]
    pub report_path: Option<PathBuf>,

    #[arg(long, help = "Field delimiter for tabular reports")]
    pub delimiter: Option<String>,

    #[arg(long, help = "Do not print reports to stdout")]
    pub quiet: bool,

    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Workload::Fill, Workload::Sin],
        help = "Workloads to benchmark, in order"
    )]
    pub workloads: Vec<Workload>,

    #[arg(
        long,
        default_value_t = 1_000_000,
        help = "Number of elements each workload touches"
    )]
    pub size: usize,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,
}

fn parse_metric(value: &str) -> Result<MetricKind, String> {
    let result = match value.trim().parse::<u32>() {
        Ok(id) => parse_metric_ids(&[id]).map(|kinds| kinds[0]),
        Err(_) => mperf::parse_metric_names(&[value]).map(|kinds| kinds[0]),
    };
    result.map_err(|e| e.to_string())
}

fn parse_counter(value: &str) -> Result<HardwareCounterKind, String> {
    HardwareCounterKind::from_str(value.trim())
        .map_err(|_| format!("Unknown hardware counter: {value}"))
}

fn parse_time_unit(value: &str) -> Result<TimeUnit, String> {
    TimeUnit::from_str(value.trim()).map_err(|_| format!("Unknown time unit: {value}"))
}

impl Args {
    fn merge_config(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.session.name = name.clone();
        }
        if let Some(metrics) = &self.metrics {
            config.session.metrics = metrics.clone();
        }
        if let Some(counters) = &self.counters {
            config.session.counters = counters.clone();
        }
        if let Some(time_unit) = self.time_unit {
            config.session.time_unit = time_unit;
        }
        if let Some(max_time) = self.max_time {
            config.bench.max_time_secs = max_time;
        }
        if let Some(format) = self.format {
            config.bench.format = format.into();
        }
        if let Some(report_path) = &self.report_path {
            config.bench.report_path = Some(report_path.clone());
        }
        if let Some(delimiter) = &self.delimiter {
            config.bench.delimiter = delimiter.clone();
        }
        if self.quiet {
            config.bench.to_stdout = false;
        }
    }

    /// Load the configuration file if we have it, then merge the arguments into it.
    pub fn load_config(&self) -> Result<Config, eyre::Report> {
        let mut config = match &self.config_file {
            Some(config_path) if !config_path.is_file() => {
                return Err(eyre!("Configuration file {:?} not found", config_path));
            }
            Some(config_path) => Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Yaml::file(config_path))
                .extract::<Config>()
                .map_err(|e| {
                    eyre!(
                        "Failed to parse configuration from {:?}: {}",
                        config_path,
                        e
                    )
                })?,
            None => Config::default(),
        };
        self.merge_config(&mut config);
        config.bench.delimiter_byte()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_without_arguments() {
        let args = Args::try_parse_from(["mperf-bench"]).unwrap();
        assert_eq!(args.workloads, vec![Workload::Fill, Workload::Sin]);
        assert_eq!(args.load_config().unwrap(), Config::default());
    }

    #[test]
    fn test_metric_names_and_ids() {
        let args = Args::try_parse_from([
            "mperf-bench",
            "--metrics",
            "time_elapsed,6",
            "--counters",
            "branch_misses",
        ])
        .unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(
            config.session.metrics,
            vec![MetricKind::TimeElapsed, MetricKind::CpuUtilization]
        );
        assert_eq!(config.session.counters, vec![HardwareCounterKind::BranchMisses]);
    }

    #[test]
    fn test_unknown_metric_is_rejected() {
        assert!(Args::try_parse_from(["mperf-bench", "--metrics", "7"]).is_err());
        assert!(Args::try_parse_from(["mperf-bench", "--metrics", "latency"]).is_err());
    }

    #[test]
    fn test_command_line_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "session:\n  name: From File\n  time_unit: microseconds\n  metrics: [time_elapsed, cpu_utilization]\n\
             bench:\n  max_time_secs: 0.5\n  format: tabular\n  delimiter: \";\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let args = Args::try_parse_from([
            "mperf-bench",
            "--config-file",
            path,
            "--name",
            "From Args",
            "--quiet",
        ])
        .unwrap();
        let config = args.load_config().unwrap();

        assert_eq!(config.session.name, "From Args");
        assert_eq!(config.session.time_unit, TimeUnit::Microseconds);
        assert_eq!(
            config.session.metrics,
            vec![MetricKind::TimeElapsed, MetricKind::CpuUtilization]
        );
        assert_eq!(config.bench.max_time_secs, 0.5);
        assert_eq!(config.bench.format, ReportFormat::Tabular);
        assert_eq!(config.bench.delimiter, ";");
        assert!(!config.bench.to_stdout);
    }

    #[test]
    fn test_delimiter_must_be_a_single_character() {
        let args = Args::try_parse_from(["mperf-bench", "--delimiter", "||"]).unwrap();
        assert!(args.load_config().is_err());
        let args = Args::try_parse_from(["mperf-bench", "--delimiter", "|"]).unwrap();
        assert_eq!(args.load_config().unwrap().bench.delimiter, "|");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args =
            Args::try_parse_from(["mperf-bench", "--config-file", "/nonexistent/mperf.yaml"])
                .unwrap();
        assert!(args.load_config().is_err());
    }
}
