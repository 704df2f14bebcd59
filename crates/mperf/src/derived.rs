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

//! Rates computed from raw counter values.
//!
//! A zero denominator always yields `0.0`. None of these functions can return
//! NaN or infinity.

/// Process and system CPU time, in clock ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTicks {
    /// User plus system time of this process.
    pub process: u64,
    /// Sum of all time the system CPUs spent, busy or idle.
    pub system: u64,
}

impl CpuTicks {
    pub fn is_zero(&self) -> bool {
        self.process == 0 && self.system == 0
    }
}

fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 * 100.0 / denominator as f64
}

pub fn cache_miss_rate(misses: u64, references: u64) -> f64 {
    percentage(misses, references)
}

pub fn branch_miss_rate(misses: u64, instructions: u64) -> f64 {
    percentage(misses, instructions)
}

pub fn average_ipc(instructions: u64, cycles: u64) -> f64 {
    if cycles == 0 {
        return 0.0;
    }
    instructions as f64 / cycles as f64
}

/// Share of system CPU time this process used since `baseline`.
///
/// Returns the utilization percentage and the baseline to use next time:
/// - zero baseline (first observation): `0.0`, and `current` becomes the
///   baseline.
/// - either delta zero: `0.0`, baseline unchanged.
/// - otherwise: `100 * process_delta / system_delta`, and `current` becomes the
///   baseline.
pub fn cpu_utilization(baseline: CpuTicks, current: CpuTicks) -> (f64, CpuTicks) {
    if baseline.is_zero() {
        return (0.0, current);
    }
    let process_delta = current.process.saturating_sub(baseline.process);
    let system_delta = current.system.saturating_sub(baseline.system);
    if process_delta == 0 || system_delta == 0 {
        return (0.0, baseline);
    }
    (percentage(process_delta, system_delta), current)
}
