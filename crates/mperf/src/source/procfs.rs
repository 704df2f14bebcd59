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

use crate::derived::CpuTicks;
use crate::error::SourceError;
use crate::source::{MemoryUsage, ProcessStats};
use lazy_static::lazy_static;

const STATM: &str = "/proc/self/statm";
const PROCESS_STAT: &str = "/proc/self/stat";
const SYSTEM_STAT: &str = "/proc/stat";

lazy_static! {
    /// Page size in KB. Not hardcoded, in case x86-64 is configured with 2MB pages.
    static ref PAGE_SIZE_KB: f64 = {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page_size <= 0 { 4.0 } else { page_size as f64 / 1024.0 }
    };
}

/// Process statistics read from Linux `/proc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcFsStats;

impl ProcessStats for ProcFsStats {
    fn memory_usage(&self) -> Result<MemoryUsage, SourceError> {
        parse_statm(&std::fs::read_to_string(STATM)?, *PAGE_SIZE_KB)
    }

    fn cpu_ticks(&self) -> Result<CpuTicks, SourceError> {
        let process = parse_process_ticks(&std::fs::read_to_string(PROCESS_STAT)?)?;
        let system = parse_system_ticks(&std::fs::read_to_string(SYSTEM_STAT)?)?;
        Ok(CpuTicks { process, system })
    }
}

fn field<T: std::str::FromStr>(
    value: Option<&str>,
    path: &'static str,
    what: &str,
) -> Result<T, SourceError> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| SourceError::Parse {
            path,
            reason: format!("missing or malformed {what}"),
        })
}

/// `statm` is `size resident shared text lib data dt`, all in pages.
fn parse_statm(statm: &str, page_size_kb: f64) -> Result<MemoryUsage, SourceError> {
    let mut fields = statm.split_whitespace();
    let size: u64 = field(fields.next(), STATM, "size")?;
    let resident: u64 = field(fields.next(), STATM, "resident")?;
    Ok(MemoryUsage {
        virtual_kb: size as f64 * page_size_kb,
        resident_kb: resident as f64 * page_size_kb,
    })
}

/// User plus system ticks of this process: fields 14 and 15 of `stat`.
///
/// The command name (field 2) is parenthesised and may itself contain spaces
/// or parentheses, so fields are counted from the last `)`.
fn parse_process_ticks(stat: &str) -> Result<u64, SourceError> {
    let (_, rest) = stat.rsplit_once(')').ok_or_else(|| SourceError::Parse {
        path: PROCESS_STAT,
        reason: "no command name".to_string(),
    })?;
    // `rest` starts at field 3 (state), so utime is the 12th entry.
    let mut fields = rest.split_whitespace().skip(11);
    let utime: u64 = field(fields.next(), PROCESS_STAT, "utime")?;
    let stime: u64 = field(fields.next(), PROCESS_STAT, "stime")?;
    Ok(utime + stime)
}

/// Aggregate `cpu` line: user nice system idle iowait irq softirq.
fn parse_system_ticks(stat: &str) -> Result<u64, SourceError> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SourceError::Parse {
            path: SYSTEM_STAT,
            reason: "no aggregate cpu line".to_string(),
        })?;
    let mut fields = line.split_whitespace().skip(1);
    let mut total = 0u64;
    for name in ["user", "nice", "system", "idle", "iowait", "irq", "softirq"] {
        total += field::<u64>(fields.next(), SYSTEM_STAT, name)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statm() {
        let usage = parse_statm("2048 512 100 10 0 300 0\n", 4.0).unwrap();
        assert_eq!(usage.virtual_kb, 8192.0);
        assert_eq!(usage.resident_kb, 2048.0);

        assert!(matches!(
            parse_statm("2048", 4.0),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_process_ticks_with_awkward_command_name() {
        let stat = "4242 (my (odd) prog) R 1 4242 4242 0 -1 4194560 1200 0 0 0 \
                    37 5 0 0 20 0 1 0 100 123456 789 18446744073709551615";
        assert_eq!(parse_process_ticks(stat).unwrap(), 42);
    }

    #[test]
    fn test_parse_system_ticks() {
        let stat = "cpu  100 2 30 1000 4 5 6 0 0 0\n\
                    cpu0 50 1 15 500 2 2 3 0 0 0\n\
                    intr 12345\n";
        assert_eq!(parse_system_ticks(stat).unwrap(), 1147);
        assert!(parse_system_ticks("intr 1\n").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_live_proc_reads() {
        let stats = ProcFsStats;
        let memory = stats.memory_usage().unwrap();
        assert!(memory.resident_kb > 0.0);
        assert!(memory.virtual_kb >= memory.resident_kb);
        let ticks = stats.cpu_ticks().unwrap();
        assert!(ticks.system > 0);
    }
}
