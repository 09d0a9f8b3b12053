use std::collections::TryReserveError;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use libc::{c_int, pid_t};
use tracing::{debug, error, warn};

use crate::error::SpawnError;
use crate::launcher::{ConcurrencyStrategy, JoinSummary};
use crate::worker::{UnitBody, WorkUnit};

/// One forked child per unit. Children share nothing with the parent after the fork.
#[derive(Debug, Default)]
pub struct ProcessStrategy {
    children: Vec<(usize, pid_t)>,
}

impl ProcessStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConcurrencyStrategy for ProcessStrategy {
    fn name(&self) -> &'static str {
        "process"
    }

    fn reserve(&mut self, count: usize) -> Result<(), TryReserveError> {
        self.children.try_reserve_exact(count)
    }

    fn spawn(&mut self, unit: WorkUnit, body: UnitBody) -> Result<(), SpawnError> {
        let pid = unsafe { libc::fork() };

        if pid == 0 {
            // Child process: run the unit and leave without returning into the parent's loop.
            let code = match panic::catch_unwind(AssertUnwindSafe(|| body(unit))) {
                Ok(Ok(())) => 0,
                Ok(Err(e)) => {
                    error!(unit = unit.id, kind = %unit.kind, error = %e, "worker failed");
                    1
                }
                Err(_) => 1,
            };
            unsafe { libc::_exit(code) }
        } else if pid > 0 {
            debug!(unit = unit.id, pid, "forked");
            self.children.push((unit.id, pid));
            Ok(())
        } else {
            Err(SpawnError(io::Error::last_os_error()))
        }
    }

    fn join_all(&mut self) -> JoinSummary {
        let mut summary = JoinSummary::default();

        for (id, pid) in self.children.drain(..) {
            match wait_for(pid) {
                Ok(status) => {
                    summary.joined += 1;
                    if !(libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 0) {
                        summary.failed += 1;
                        debug!(unit = id, pid, status, "child did not exit cleanly");
                    }
                }
                Err(e) => {
                    warn!(unit = id, pid, error = %e, "waitpid failed");
                }
            }
        }

        summary
    }
}

fn wait_for(pid: pid_t) -> io::Result<c_int> {
    loop {
        let mut status: c_int = 0;
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
