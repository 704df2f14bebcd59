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

//! Scripted sources, for driving a session deterministically.
//!
//! Each source replays a fixed script and fails once the script runs out.

use crate::derived::CpuTicks;
use crate::error::SourceError;
use crate::source::{Clock, CounterSource, MemoryUsage, ProcessStats};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

fn exhausted(what: &str) -> SourceError {
    SourceError::Io(io::Error::other(format!("mock {what} script exhausted")))
}

/// Returns one scripted reading per `read`.
#[derive(Default)]
pub struct MockCounters {
    readings: VecDeque<Vec<u64>>,
}

impl MockCounters {
    pub fn new(readings: impl IntoIterator<Item = Vec<u64>>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }
}

impl CounterSource for MockCounters {
    fn start(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn read(&mut self, out: &mut [u64]) -> Result<(), SourceError> {
        let reading = self
            .readings
            .pop_front()
            .ok_or_else(|| exhausted("counter"))?;
        for (slot, value) in out.iter_mut().zip(reading) {
            *slot = value;
        }
        Ok(())
    }
}

/// Replays resident-set sizes and CPU tick samples, one per query.
#[derive(Default)]
pub struct MockStats {
    resident_kb: RefCell<VecDeque<f64>>,
    ticks: RefCell<VecDeque<CpuTicks>>,
}

impl MockStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resident_kb(self, samples: impl IntoIterator<Item = f64>) -> Self {
        self.resident_kb.borrow_mut().extend(samples);
        self
    }

    pub fn with_cpu_ticks(self, samples: impl IntoIterator<Item = (u64, u64)>) -> Self {
        self.ticks.borrow_mut().extend(
            samples
                .into_iter()
                .map(|(process, system)| CpuTicks { process, system }),
        );
        self
    }
}

impl ProcessStats for MockStats {
    fn memory_usage(&self) -> Result<MemoryUsage, SourceError> {
        let resident_kb = self
            .resident_kb
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| exhausted("memory"))?;
        Ok(MemoryUsage {
            virtual_kb: resident_kb * 2.0,
            resident_kb,
        })
    }

    fn cpu_ticks(&self) -> Result<CpuTicks, SourceError> {
        self.ticks
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| exhausted("cpu ticks"))
    }
}

/// A clock that moves forward by a fixed step every time it is read.
pub struct StepClock {
    now: Cell<Duration>,
    step: Duration,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
