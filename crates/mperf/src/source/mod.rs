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

//! Where a session's raw readings come from: hardware counters, process
//! statistics and a monotonic clock. Each is a trait so sessions can be driven
//! by scripted sources in tests.

pub mod mock;
mod perf;
mod procfs;

pub use perf::PerfCounterSource;
pub use procfs::ProcFsStats;

use crate::derived::CpuTicks;
use crate::error::SourceError;
use std::time::Duration;

/// A set of hardware counters, opened once for a fixed list of counter kinds.
pub trait CounterSource {
    /// Reset and begin counting.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Stop counting and write the counts accumulated since `start` into
    /// `out`, one slot per counter in the order the source was opened with.
    fn read(&mut self, out: &mut [u64]) -> Result<(), SourceError>;
}

/// Process memory, in kilobytes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemoryUsage {
    pub virtual_kb: f64,
    pub resident_kb: f64,
}

pub trait ProcessStats {
    fn memory_usage(&self) -> Result<MemoryUsage, SourceError>;
    fn cpu_ticks(&self) -> Result<CpuTicks, SourceError>;
}

/// Monotonic time since some fixed, arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// The steady TSC-backed clock from `minstant`.
pub struct MonotonicClock {
    origin: minstant::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: minstant::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Local wall-clock time for report headers, e.g. `2024/1/2 9:05:07`.
pub fn get_time() -> String {
    chrono::Local::now().format("%Y/%-m/%-d %-H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..1000 {
            let now = clock.now();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_get_time_shape() {
        let time = get_time();
        let (date, clock) = time.split_once(' ').unwrap();
        assert_eq!(date.split('/').count(), 3);
        let parts: Vec<_> = clock.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 2);
    }
}
