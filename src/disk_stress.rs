use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, error, warn};

use crate::config::DiskConfig;
use crate::error::WorkerError;
use crate::memory_stress::system_buffer;

/// Pushes written data past the page cache before returning.
pub trait DurableSync {
    fn sync_durable(&mut self) -> io::Result<()>;
}

impl DurableSync for File {
    fn sync_durable(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskReport {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub cycles_completed: u32,
    /// A write, sync, seek or read failed and the remaining cycles were skipped.
    pub aborted: bool,
}

pub fn temp_file_name(pid: u32, id: usize) -> String {
    format!("iofile_{}_{}.bin", pid, id)
}

pub fn temp_file_path(dir: &Path, pid: u32, id: usize) -> PathBuf {
    dir.join(temp_file_name(pid, id))
}

/// Unlinks the path when dropped, whatever happened in between.
struct TempFile {
    path: PathBuf,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove temp file"),
        }
    }
}

pub fn stress_disk(id: usize, cfg: &DiskConfig) -> Result<DiskReport, WorkerError> {
    stress_disk_with(id, cfg, |file| file)
}

/// Run the write/sync/read cycles against `wrap(file)` instead of the raw file.
///
/// The handle returned by `wrap` is dropped before the file is unlinked.
pub fn stress_disk_with<T, W>(id: usize, cfg: &DiskConfig, wrap: W) -> Result<DiskReport, WorkerError>
where
    T: Read + Write + Seek + DurableSync,
    W: FnOnce(File) -> T,
{
    let path = temp_file_path(&cfg.dir, process::id(), id);
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|source| WorkerError::Open {
            path: path.clone(),
            source,
        })?;

    // Declared before `target` so the handle closes first.
    let guard = TempFile { path };
    let mut target = wrap(file);

    let chunk = cfg.chunk_bytes.max(1);
    let mut buf = system_buffer(chunk).map_err(|source| WorkerError::Alloc {
        bytes: chunk,
        source,
    })?;
    buf.resize(chunk, b'A' + (id % 26) as u8);

    let mut report = DiskReport {
        path: guard.path.clone(),
        bytes_written: 0,
        bytes_read: 0,
        cycles_completed: 0,
        aborted: false,
    };

    for cycle in 0..cfg.cycles {
        if let Err(e) = run_cycle(&mut target, &mut buf, cfg, &mut report) {
            error!(unit = id, cycle, error = %e, "disk cycle failed, skipping remaining cycles");
            report.aborted = true;
            break;
        }
        report.cycles_completed += 1;
    }

    debug!(
        unit = id,
        written = report.bytes_written,
        read = report.bytes_read,
        cycles = report.cycles_completed,
        "disk cycles finished"
    );
    Ok(report)
}

fn run_cycle<T>(target: &mut T, buf: &mut [u8], cfg: &DiskConfig, report: &mut DiskReport) -> io::Result<()>
where
    T: Read + Write + Seek + DurableSync,
{
    let mut written = 0;
    while written < cfg.cycle_bytes {
        let n = buf.len().min(cfg.cycle_bytes - written);
        target.write_all(&buf[..n])?;
        written += n;
        report.bytes_written += n as u64;
    }

    target.sync_durable()?;
    target.seek(SeekFrom::Start(0))?;

    if cfg.read_back {
        let mut remaining = written;
        while remaining > 0 {
            let n = buf.len().min(remaining);
            target.read_exact(&mut buf[..n])?;
            remaining -= n;
            report.bytes_read += n as u64;
        }
        target.seek(SeekFrom::Start(0))?;
    }

    Ok(())
}
