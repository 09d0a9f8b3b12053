//! Workload intensity knobs.
//!
//! Every worker runs a fixed amount of work. The defaults below size that
//! work so a handful of units is clearly visible in `top`, `free` or `iostat`
//! on a small VM.

use std::path::PathBuf;

use clap::ValueEnum;

pub const MIB: usize = 1024 * 1024;
pub const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct WorkloadConfig {
    pub cpu: CpuConfig,
    pub memory: MemoryConfig,
    pub disk: DiskConfig,
}

#[derive(Debug, Clone)]
pub struct CpuConfig {
    /// Number of recurrence steps.
    pub iterations: u64,
    /// The accumulator is reset to zero once it grows past this.
    pub reset_threshold: f64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            iterations: 120_000_000,
            reset_threshold: 1e9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessPattern {
    /// Page-sized stride, wrapping at the end of the buffer.
    Strided,
    /// Uniform offsets from a per-unit seeded generator.
    Random,
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub buffer_mb: usize,
    /// Read-modify-write operations after the buffer is resident.
    pub accesses: u64,
    pub pattern: AccessPattern,
    pub stride: usize,
}

impl MemoryConfig {
    pub fn buffer_bytes(&self) -> usize {
        self.buffer_mb.saturating_mul(MIB)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            buffer_mb: 150,
            accesses: 30_000_000,
            pattern: AccessPattern::Strided,
            stride: PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiskConfig {
    /// Directory the temporary files are created in.
    pub dir: PathBuf,
    pub chunk_bytes: usize,
    /// Bytes written per cycle, overwriting the previous cycle.
    pub cycle_bytes: usize,
    pub cycles: u32,
    pub read_back: bool,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            chunk_bytes: 4 * MIB,
            cycle_bytes: 100 * MIB,
            cycles: 4,
            read_back: false,
        }
    }
}
