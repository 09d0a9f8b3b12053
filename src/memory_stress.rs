use std::collections::TryReserveError;
use std::hint::black_box;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sysinfo::System;
use tracing::{debug, trace, warn};

use crate::config::{AccessPattern, MemoryConfig, MIB, PAGE_SIZE};
use crate::error::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub bytes: usize,
    pub pages_touched: usize,
    pub checksum: u64,
}

/// Reserve `bytes` of heap without aborting the process on failure.
pub fn system_buffer(bytes: usize) -> Result<Vec<u8>, TryReserveError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)?;
    Ok(buf)
}

pub fn stress_memory(id: usize, cfg: &MemoryConfig) -> Result<MemoryReport, WorkerError> {
    stress_memory_with(id, cfg, system_buffer)
}

/// Same as [`stress_memory`] but with the allocation step supplied by the caller.
///
/// `alloc` must hand back an empty vector with at least the requested capacity.
pub fn stress_memory_with<A>(
    id: usize,
    cfg: &MemoryConfig,
    alloc: A,
) -> Result<MemoryReport, WorkerError>
where
    A: FnOnce(usize) -> Result<Vec<u8>, TryReserveError>,
{
    let bytes = cfg.buffer_bytes();
    let mut buf = alloc(bytes).map_err(|source| WorkerError::Alloc { bytes, source })?;
    buf.resize(bytes, 0);

    // Fault in every page so the buffer counts towards RSS.
    let mut pages_touched = 0;
    for i in (0..bytes).step_by(PAGE_SIZE) {
        buf[i] = (i % 256) as u8;
        pages_touched += 1;
    }
    debug!(unit = id, mb = bytes / MIB, pages_touched, "buffer resident");

    let checksum = if bytes == 0 {
        0
    } else {
        match cfg.pattern {
            AccessPattern::Strided => strided_accesses(&mut buf, cfg.accesses, cfg.stride),
            AccessPattern::Random => random_accesses(&mut buf, cfg.accesses, id as u64),
        }
    };
    trace!(unit = id, checksum, "memory accesses done");

    drop(buf);
    Ok(MemoryReport {
        bytes,
        pages_touched,
        checksum,
    })
}

fn strided_accesses(buf: &mut [u8], accesses: u64, stride: usize) -> u64 {
    let len = buf.len();
    let mut sum = 0u64;
    for i in 0..accesses {
        let idx = (i as usize).wrapping_mul(stride) % len;
        sum = sum.wrapping_add(u64::from(buf[idx]));
        buf[idx] = (sum % 256) as u8;
    }
    black_box(sum)
}

fn random_accesses(buf: &mut [u8], accesses: u64, seed: u64) -> u64 {
    let len = buf.len();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut sum = 0u64;
    for _ in 0..accesses {
        let idx = rng.random_range(0..len);
        sum = sum.wrapping_add(u64::from(buf[idx]));
        buf[idx] = (sum % 256) as u8;
    }
    black_box(sum)
}

/// Log a snapshot of host memory.
pub fn check_memory_usage() {
    let mut sys = System::new();
    sys.refresh_memory();

    debug!(
        total_mb = sys.total_memory() / MIB as u64,
        used_mb = sys.used_memory() / MIB as u64,
        available_mb = sys.available_memory() / MIB as u64,
        "host memory"
    );
}

/// Warn when `units` buffers of `buffer_bytes` will not fit in available memory.
pub fn warn_if_oversubscribed(units: usize, buffer_bytes: usize) {
    let mut sys = System::new();
    sys.refresh_memory();

    let wanted = (units as u64).saturating_mul(buffer_bytes as u64);
    let available = sys.available_memory();
    if available > 0 && wanted > available {
        warn!(
            wanted_mb = wanted / MIB as u64,
            available_mb = available / MIB as u64,
            "mem units ask for more than the available memory, expect swapping or OOM kills"
        );
    }
}
