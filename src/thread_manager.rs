use std::collections::TryReserveError;
use std::thread::{self, JoinHandle};

use tracing::{error, warn};

use crate::error::SpawnError;
use crate::launcher::{ConcurrencyStrategy, JoinSummary};
use crate::worker::{UnitBody, WorkUnit};

/// One named OS thread per unit.
#[derive(Debug, Default)]
pub struct ThreadStrategy {
    handles: Vec<(usize, JoinHandle<bool>)>,
}

impl ThreadStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConcurrencyStrategy for ThreadStrategy {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn reserve(&mut self, count: usize) -> Result<(), TryReserveError> {
        self.handles.try_reserve_exact(count)
    }

    fn spawn(&mut self, unit: WorkUnit, body: UnitBody) -> Result<(), SpawnError> {
        let handle = thread::Builder::new()
            .name(format!("unit-{}", unit.id))
            .spawn(move || match body(unit) {
                Ok(()) => true,
                Err(e) => {
                    error!(unit = unit.id, kind = %unit.kind, error = %e, "worker failed");
                    false
                }
            })?;

        self.handles.push((unit.id, handle));
        Ok(())
    }

    fn join_all(&mut self) -> JoinSummary {
        let mut summary = JoinSummary::default();

        for (id, handle) in self.handles.drain(..) {
            summary.joined += 1;
            match handle.join() {
                Ok(true) => {}
                Ok(false) => summary.failed += 1,
                Err(_) => {
                    warn!(unit = id, "unit thread panicked");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::worker::WorkerKind;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn join_waits_for_every_thread() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let body: UnitBody = Arc::new(move |_: WorkUnit| -> Result<(), WorkerError> {
            thread::sleep(std::time::Duration::from_millis(20));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut strategy = ThreadStrategy::new();
        for id in 0..4 {
            strategy
                .spawn(WorkUnit { id, kind: WorkerKind::Cpu }, Arc::clone(&body))
                .unwrap();
        }
        let summary = strategy.join_all();

        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(summary, JoinSummary { joined: 4, failed: 0 });
    }

    #[test]
    fn worker_errors_and_panics_count_as_failed() {
        let body: UnitBody = Arc::new(|unit: WorkUnit| match unit.id {
            0 => Ok(()),
            1 => Err(WorkerError::Io(io::Error::other("boom"))),
            _ => panic!("unit blew up"),
        });

        let mut strategy = ThreadStrategy::new();
        for id in 0..3 {
            strategy
                .spawn(WorkUnit { id, kind: WorkerKind::Io }, Arc::clone(&body))
                .unwrap();
        }

        assert_eq!(strategy.join_all(), JoinSummary { joined: 3, failed: 2 });
    }
}
