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

use crate::error::SourceError;
use crate::metrics::HardwareCounterKind;
use crate::source::CounterSource;

#[cfg(target_os = "linux")]
use perf_event::{Builder, Counter, Group, events::Hardware};

#[cfg(target_os = "linux")]
impl HardwareCounterKind {
    fn event(self) -> Hardware {
        match self {
            HardwareCounterKind::CpuCycles => Hardware::CPU_CYCLES,
            HardwareCounterKind::Instructions => Hardware::INSTRUCTIONS,
            HardwareCounterKind::CacheReferences => Hardware::CACHE_REFERENCES,
            HardwareCounterKind::CacheMisses => Hardware::CACHE_MISSES,
            HardwareCounterKind::BranchInstructions => Hardware::BRANCH_INSTRUCTIONS,
            HardwareCounterKind::BranchMisses => Hardware::BRANCH_MISSES,
            HardwareCounterKind::BusCycles => Hardware::BUS_CYCLES,
            HardwareCounterKind::StalledCyclesFrontend => Hardware::STALLED_CYCLES_FRONTEND,
            HardwareCounterKind::StalledCyclesBackend => Hardware::STALLED_CYCLES_BACKEND,
            HardwareCounterKind::RefCpuCycles => Hardware::REF_CPU_CYCLES,
        }
    }
}

/// Hardware counters for the calling process, opened as a single perf event
/// group so that every member counts over exactly the same interval.
///
/// The group owns open kernel file descriptors, closed on drop. Not `Clone`.
#[cfg(target_os = "linux")]
pub struct PerfCounterSource {
    group: Group,
    counters: Vec<Counter>,
}

#[cfg(target_os = "linux")]
impl PerfCounterSource {
    pub fn open(kinds: &[HardwareCounterKind]) -> Result<Self, SourceError> {
        let mut group = Group::new()?;
        let counters = kinds
            .iter()
            .map(|kind| group.add(&Builder::new(kind.event())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { group, counters })
    }
}

#[cfg(target_os = "linux")]
impl CounterSource for PerfCounterSource {
    fn start(&mut self) -> Result<(), SourceError> {
        self.group.reset()?;
        self.group.enable()?;
        Ok(())
    }

    fn read(&mut self, out: &mut [u64]) -> Result<(), SourceError> {
        self.group.disable()?;
        let counts = self.group.read()?;
        for (slot, counter) in out.iter_mut().zip(&self.counters) {
            *slot = counts[counter];
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
pub struct PerfCounterSource {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PerfCounterSource {
    pub fn open(_kinds: &[HardwareCounterKind]) -> Result<Self, SourceError> {
        Err(SourceError::Unsupported)
    }
}

#[cfg(not(target_os = "linux"))]
impl CounterSource for PerfCounterSource {
    fn start(&mut self) -> Result<(), SourceError> {
        Err(SourceError::Unsupported)
    }

    fn read(&mut self, _out: &mut [u64]) -> Result<(), SourceError> {
        Err(SourceError::Unsupported)
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use std::hint::black_box;

    #[test]
    fn test_instructions_are_counted() {
        // CI machines and containers frequently forbid perf_event_open.
        let Ok(mut source) = PerfCounterSource::open(&[
            HardwareCounterKind::Instructions,
            HardwareCounterKind::BranchInstructions,
        ]) else {
            eprintln!("perf events unavailable, skipping");
            return;
        };

        let mut counts = [0u64; 2];
        source.start().unwrap();
        let mut acc = 0u64;
        for i in 0..100_000u64 {
            acc = black_box(acc.wrapping_add(i));
        }
        source.read(&mut counts).unwrap();
        // Some virtualised hosts accept the open but never schedule the
        // counters, so only check for consistency.
        assert!(counts[0] >= counts[1], "{counts:?}");
    }
}
