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

//! Sample workloads: simple loops over a float buffer.

use clap_derive::ValueEnum;
use mperf::black_box;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Workload {
    /// Store each index into the buffer.
    Fill,
    /// Store the sine of each index into the buffer.
    Sin,
}

impl Workload {
    pub fn name(self) -> &'static str {
        match self {
            Workload::Fill => "fill",
            Workload::Sin => "sin",
        }
    }

    pub fn run(self, buffer: &mut [f32]) {
        match self {
            Workload::Fill => {
                for (i, slot) in buffer.iter_mut().enumerate() {
                    *slot = i as f32;
                }
            }
            Workload::Sin => {
                for (i, slot) in buffer.iter_mut().enumerate() {
                    *slot = (i as f32).sin();
                }
            }
        }
        black_box(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workloads_write_every_slot() {
        let mut buffer = vec![-1.0f32; 16];
        Workload::Fill.run(&mut buffer);
        assert_eq!(buffer[15], 15.0);

        Workload::Sin.run(&mut buffer);
        assert_eq!(buffer[0], 0.0);
        assert!((buffer[1] - 1f32.sin()).abs() < f32::EPSILON);
    }
}
