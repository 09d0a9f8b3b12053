//! Synthetic CPU, memory and disk load generator.
//!
//! A [`launcher::Launcher`] starts `count` units of one [`worker::WorkerKind`]
//! as processes or threads and waits for all of them. The load is meant to be
//! watched with external tools.

pub mod cli;
pub mod config;
pub mod cpu_stress;
pub mod disk_stress;
pub mod error;
pub mod fork_stress;
pub mod launcher;
pub mod memory_stress;
pub mod thread_manager;
pub mod worker;

pub use config::WorkloadConfig;
pub use error::{LaunchError, SpawnError, WorkerError};
pub use launcher::{ConcurrencyStrategy, JoinSummary, Launcher, Strategy};
pub use worker::{UnitBody, WorkUnit, WorkerKind};
