use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::WorkloadConfig;
use crate::cpu_stress::stress_cpu;
use crate::disk_stress::stress_disk;
use crate::error::WorkerError;
use crate::memory_stress::stress_memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Cpu,
    Mem,
    Io,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 3] = [WorkerKind::Cpu, WorkerKind::Mem, WorkerKind::Io];

    pub fn name(self) -> &'static str {
        match self {
            WorkerKind::Cpu => "cpu",
            WorkerKind::Mem => "mem",
            WorkerKind::Io => "io",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown worker kind '{}', expected cpu, mem or io", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for WorkerKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// One invocation of a worker, owned by the unit that runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    pub id: usize,
    pub kind: WorkerKind,
}

/// The closure every execution unit calls exactly once.
pub type UnitBody = Arc<dyn Fn(WorkUnit) -> Result<(), WorkerError> + Send + Sync>;

pub fn run_unit(unit: WorkUnit, config: &WorkloadConfig) -> Result<(), WorkerError> {
    let start = Instant::now();

    match unit.kind {
        WorkerKind::Cpu => {
            stress_cpu(unit.id, &config.cpu);
        }
        WorkerKind::Mem => {
            stress_memory(unit.id, &config.memory)?;
        }
        WorkerKind::Io => {
            let report = stress_disk(unit.id, &config.disk)?;
            if report.aborted {
                warn!(unit = unit.id, cycles = report.cycles_completed, "disk worker stopped early");
            }
        }
    }

    info!(
        unit = unit.id,
        kind = %unit.kind,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "unit finished"
    );
    Ok(())
}

pub fn body_for(config: WorkloadConfig) -> UnitBody {
    let config = Arc::new(config);
    Arc::new(move |unit| run_unit(unit, &config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CpuConfig, DiskConfig, MemoryConfig};

    #[test]
    fn parses_known_kinds() {
        assert_eq!("cpu".parse::<WorkerKind>(), Ok(WorkerKind::Cpu));
        assert_eq!("mem".parse::<WorkerKind>(), Ok(WorkerKind::Mem));
        assert_eq!("io".parse::<WorkerKind>(), Ok(WorkerKind::Io));
    }

    #[test]
    fn rejects_unknown_kinds() {
        assert!("gpu".parse::<WorkerKind>().is_err());
        assert!("CPU".parse::<WorkerKind>().is_err());
        assert!("".parse::<WorkerKind>().is_err());
    }

    #[test]
    fn name_round_trips_for_every_kind() {
        for kind in WorkerKind::ALL {
            assert_eq!(kind.name().parse::<WorkerKind>(), Ok(kind));
        }
    }

    #[test]
    fn body_runs_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        let body = body_for(WorkloadConfig {
            cpu: CpuConfig {
                iterations: 1_000,
                ..CpuConfig::default()
            },
            memory: MemoryConfig {
                buffer_mb: 1,
                accesses: 1_000,
                ..MemoryConfig::default()
            },
            disk: DiskConfig {
                dir: dir.path().to_path_buf(),
                chunk_bytes: 4096,
                cycle_bytes: 8192,
                cycles: 1,
                read_back: true,
            },
        });

        for (id, kind) in WorkerKind::ALL.into_iter().enumerate() {
            body(WorkUnit { id, kind }).unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
