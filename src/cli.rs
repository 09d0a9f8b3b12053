use std::path::PathBuf;

use clap::Parser;

use crate::config::{AccessPattern, CpuConfig, DiskConfig, MemoryConfig, WorkloadConfig, MIB};
use crate::launcher::Strategy;

#[derive(Parser, Debug)]
#[command(name = "launcher", version, about = "Run N concurrent cpu, mem or io load units")]
pub struct Args {
    /// Number of units to start
    #[arg(allow_negative_numbers = true)]
    pub count: String,

    /// Worker kind: cpu, mem or io
    pub kind: String,

    #[arg(long, value_enum, env = "STRESS_STRATEGY", default_value_t = Strategy::Process)]
    pub strategy: Strategy,

    /// Floating-point recurrence steps per cpu unit
    #[arg(long, env = "STRESS_CPU_ITERATIONS", default_value_t = 120_000_000)]
    pub cpu_iterations: u64,

    /// Buffer size per mem unit, in MiB
    #[arg(long, env = "STRESS_MEM_MB", default_value_t = 150)]
    pub mem_mb: usize,

    /// Read-modify-write accesses per mem unit
    #[arg(long, env = "STRESS_MEM_ACCESSES", default_value_t = 30_000_000)]
    pub mem_accesses: u64,

    #[arg(long, value_enum, env = "STRESS_MEM_PATTERN", default_value_t = AccessPattern::Strided)]
    pub mem_pattern: AccessPattern,

    /// Directory for io temp files
    #[arg(long, env = "STRESS_IO_DIR", default_value = ".")]
    pub io_dir: PathBuf,

    /// Write chunk size, in KiB
    #[arg(long, env = "STRESS_IO_CHUNK_KB", default_value_t = 4096,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub io_chunk_kb: u32,

    /// Bytes written per cycle, in MiB
    #[arg(long, env = "STRESS_IO_CYCLE_MB", default_value_t = 100)]
    pub io_cycle_mb: usize,

    #[arg(long, env = "STRESS_IO_CYCLES", default_value_t = 4)]
    pub io_cycles: u32,

    /// Read the data back after every sync
    #[arg(long, env = "STRESS_IO_READ_BACK")]
    pub io_read_back: bool,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            cpu: CpuConfig {
                iterations: self.cpu_iterations,
                ..CpuConfig::default()
            },
            memory: MemoryConfig {
                buffer_mb: self.mem_mb,
                accesses: self.mem_accesses,
                pattern: self.mem_pattern,
                ..MemoryConfig::default()
            },
            disk: DiskConfig {
                dir: self.io_dir.clone(),
                chunk_bytes: self.io_chunk_kb as usize * 1024,
                cycle_bytes: self.io_cycle_mb.saturating_mul(MIB),
                cycles: self.io_cycles,
                read_back: self.io_read_back,
            },
        }
    }
}
