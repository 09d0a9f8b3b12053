//! Start N units of one worker kind and wait for every one of them.

use std::collections::TryReserveError;

use clap::ValueEnum;
use tracing::{debug, error, info};

use crate::error::{LaunchError, SpawnError};
use crate::fork_stress::ProcessStrategy;
use crate::thread_manager::ThreadStrategy;
use crate::worker::{UnitBody, WorkUnit, WorkerKind};

/// Outcome counts gathered while joining. Logged, never acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub joined: usize,
    pub failed: usize,
}

/// A way of running units concurrently.
pub trait ConcurrencyStrategy {
    fn name(&self) -> &'static str;

    /// Make room for `count` unit handles up front.
    fn reserve(&mut self, count: usize) -> Result<(), TryReserveError>;

    /// Start one unit running `body(unit)`. Must not block on the unit.
    fn spawn(&mut self, unit: WorkUnit, body: UnitBody) -> Result<(), SpawnError>;

    /// Block until every unit spawned so far has terminated.
    fn join_all(&mut self) -> JoinSummary;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// One forked child process per unit.
    #[default]
    Process,
    /// One OS thread per unit.
    Thread,
}

impl Strategy {
    pub fn build(self) -> Box<dyn ConcurrencyStrategy> {
        match self {
            Strategy::Process => Box::new(ProcessStrategy::new()),
            Strategy::Thread => Box::new(ThreadStrategy::new()),
        }
    }
}

/// Validate the raw `<count> <kind>` arguments.
pub fn parse_request(count: &str, kind: &str) -> Result<(usize, WorkerKind), LaunchError> {
    let count: i64 = count
        .trim()
        .parse()
        .map_err(|_| LaunchError::Usage(format!("count must be an integer, got '{count}'")))?;
    if count <= 0 {
        return Err(LaunchError::Usage(format!("count must be > 0, got {count}")));
    }
    let count = usize::try_from(count)
        .map_err(|_| LaunchError::Usage(format!("count {count} is too large")))?;

    let kind = kind
        .parse::<WorkerKind>()
        .map_err(|e| LaunchError::Usage(e.to_string()))?;

    Ok((count, kind))
}

pub struct Launcher {
    strategy: Box<dyn ConcurrencyStrategy>,
}

impl Launcher {
    pub fn new(strategy: Box<dyn ConcurrencyStrategy>) -> Self {
        Self { strategy }
    }

    pub fn launch(&mut self, count: usize, kind: WorkerKind, body: UnitBody) -> Result<JoinSummary, LaunchError> {
        if count == 0 {
            return Err(LaunchError::Usage("count must be > 0".to_string()));
        }

        self.strategy
            .reserve(count)
            .map_err(|source| LaunchError::Bookkeeping { count, source })?;

        info!(
            count,
            %kind,
            strategy = self.strategy.name(),
            cpus = num_cpus::get(),
            "launching units"
        );

        let mut spawn_failure = None;
        for id in 0..count {
            let unit = WorkUnit { id, kind };
            if let Err(source) = self.strategy.spawn(unit, body.clone()) {
                error!(unit = id, error = %source, "spawn failed, no further units will be started");
                spawn_failure = Some(LaunchError::Spawn { id, source });
                break;
            }
            debug!(unit = id, "spawned");
        }

        let summary = self.strategy.join_all();
        info!(joined = summary.joined, failed = summary.failed, "all units joined");

        match spawn_failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn parses_valid_request() {
        let (count, kind) = parse_request("4", "cpu").unwrap();
        assert_eq!(count, 4);
        assert_eq!(kind, WorkerKind::Cpu);
    }

    #[test]
    fn rejects_non_positive_counts() {
        for raw in ["0", "-1", "-25"] {
            assert!(matches!(parse_request(raw, "cpu"), Err(LaunchError::Usage(_))));
        }
    }

    #[test]
    fn rejects_garbage_count_and_kind() {
        assert!(matches!(parse_request("four", "cpu"), Err(LaunchError::Usage(_))));
        assert!(matches!(parse_request("4", "disk"), Err(LaunchError::Usage(_))));
    }

    /// Records spawns without running anything.
    #[derive(Default)]
    struct Recording {
        spawned: Vec<WorkUnit>,
        fail_at: Option<usize>,
    }

    impl ConcurrencyStrategy for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn reserve(&mut self, count: usize) -> Result<(), TryReserveError> {
            self.spawned.try_reserve_exact(count)
        }

        fn spawn(&mut self, unit: WorkUnit, _body: UnitBody) -> Result<(), SpawnError> {
            if Some(unit.id) == self.fail_at {
                return Err(SpawnError(io::Error::from(io::ErrorKind::WouldBlock)));
            }
            self.spawned.push(unit);
            Ok(())
        }

        fn join_all(&mut self) -> JoinSummary {
            JoinSummary {
                joined: self.spawned.len(),
                failed: 0,
            }
        }
    }

    fn noop() -> UnitBody {
        Arc::new(|_: WorkUnit| -> Result<(), WorkerError> { Ok(()) })
    }

    #[test]
    fn zero_count_spawns_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let body: UnitBody = Arc::new(move |_: WorkUnit| -> Result<(), WorkerError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut launcher = Launcher::new(Box::new(ThreadStrategy::new()));
        assert!(matches!(launcher.launch(0, WorkerKind::Cpu, body), Err(LaunchError::Usage(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn joins_every_spawned_unit() {
        let mut launcher = Launcher::new(Box::new(Recording::default()));
        let summary = launcher.launch(3, WorkerKind::Mem, noop()).unwrap();
        assert_eq!(summary.joined, 3);
    }

    #[test]
    fn spawn_failure_stops_and_joins_earlier_units() {
        let mut launcher = Launcher::new(Box::new(Recording {
            spawned: Vec::new(),
            fail_at: Some(2),
        }));

        match launcher.launch(5, WorkerKind::Io, noop()) {
            Err(LaunchError::Spawn { id, .. }) => assert_eq!(id, 2),
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[test]
    fn oversized_count_fails_bookkeeping() {
        let mut launcher = Launcher::new(Box::new(Recording::default()));
        assert!(matches!(
            launcher.launch(usize::MAX, WorkerKind::Cpu, noop()),
            Err(LaunchError::Bookkeeping { .. })
        ));
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::Process.build().name(), "process");
        assert_eq!(Strategy::Thread.build().name(), "thread");
    }
}
